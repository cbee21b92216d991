pub mod admin;
pub mod favicon;
pub mod health;
pub mod login;
pub mod proposals;
pub mod registrations;

use axum::{
    extract::Form,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;

use super::{
    error::AppError,
    forms::{FieldView, FormErrors, FormValues, Schema},
    session::Session,
    state::AppState,
};

/// Handlers hand the session back so queued changes reach the cookie.
pub type HandlerResult = Result<(Session, Response), AppError>;

pub(crate) fn redirect(to: &str) -> Response {
    Redirect::to(to).into_response()
}

/// Send an anonymous caller to the login page, coming back to `next` afterwards.
pub(crate) fn login_redirect(next: &'static str) -> Response {
    redirect(&format!("/login?next={next}"))
}

/// Only same-site absolute paths are accepted as post-login targets.
pub(crate) fn local_path(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// A body that is not a urlencoded form counts as an empty submission, so
/// it is answered like any other invalid form instead of with a bare 415.
pub(crate) fn submitted<T: Default>(form: Option<Form<T>>) -> T {
    form.map(|Form(values)| values).unwrap_or_default()
}

pub(crate) fn display_time(time: &chrono::DateTime<chrono::Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

#[derive(Debug, Serialize)]
struct FormView<'a> {
    action: &'a str,
    submit_text: &'a str,
    message: Option<&'a str>,
    delete_url: Option<&'a str>,
    delete_text: Option<&'a str>,
    fields: Vec<FieldView<'a>>,
}

/// Everything about a form page except its fields.
pub(crate) struct FormPage<'a> {
    pub title: &'a str,
    pub action: &'a str,
    pub submit_text: &'a str,
    pub message: Option<&'a str>,
    pub delete: Option<(&'a str, &'a str)>,
}

impl FormPage<'_> {
    pub(crate) fn render(
        &self,
        state: &AppState,
        session: &mut Session,
        schema: &Schema,
        values: &FormValues,
        errors: &FormErrors,
    ) -> Result<Response, AppError> {
        let view = FormView {
            action: self.action,
            submit_text: self.submit_text,
            message: self.message,
            delete_url: self.delete.map(|(url, _)| url),
            delete_text: self.delete.map(|(_, text)| text),
            fields: schema.view(values, errors),
        };
        state.render(session, "form", self.title, &view)
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ChoiceItem {
    pub url: String,
    pub label: String,
    pub created: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct EmptyView {
    pub message: &'static str,
    pub link: &'static str,
    pub link_text: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_path_rejects_offsite_targets() {
        assert_eq!(local_path(Some("/edit")), "/edit");
        assert_eq!(local_path(Some("//evil.example.org/")), "/");
        assert_eq!(local_path(Some("https://evil.example.org/")), "/");
        assert_eq!(local_path(Some("/\\evil.example.org")), "/");
        assert_eq!(local_path(None), "/");
    }

    #[test]
    fn missing_form_is_an_empty_submission() {
        let values: FormValues = submitted(None);
        assert_eq!(values, FormValues::default());

        let values = submitted(Some(Form([("name", "Ana")].into_iter().collect::<FormValues>())));
        assert_eq!(values.get("name"), "Ana");
    }

    #[test]
    fn login_redirect_carries_next() {
        let response = login_redirect("/new");
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get(axum::http::header::LOCATION)
                .and_then(|value| value.to_str().ok()),
            Some("/login?next=/new")
        );
    }
}
