//! Registration lifecycle: list, create, pick, edit, delete.

use axum::{
    extract::{Extension, Form, Path},
    response::Response,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use super::{
    display_time, login_redirect, redirect, submitted, ChoiceItem, EmptyView, FormPage,
    HandlerResult,
};
use crate::{
    api::{
        forms::{
            confirmation::{self, Confirmation},
            registration, FormErrors, FormModel, FormValues,
        },
        session::{Session, User},
        AppError, AppState,
    },
    store::{generate_id, Collection, Registration, RegistrationFields},
};

pub const REGISTRATION_CLOSED: &str = "The registration period has closed";
pub const REGISTRATION_UPDATED: &str = "Registration updated";
pub const REGISTRATION_DELETED: &str = "Registration deleted";
pub const REGISTRATION_NOT_DELETED: &str = "Registration not deleted";

const NEW_PAGE: FormPage<'static> = FormPage {
    title: "Register",
    action: "/new",
    submit_text: "Submit registration",
    message: None,
    delete: None,
};

#[derive(Debug, Serialize)]
struct RegistrationRow<'a> {
    name: String,
    username: &'a str,
    location: &'a str,
    created: String,
}

#[derive(Debug, Serialize)]
struct IndexView<'a> {
    registrations: Vec<RegistrationRow<'a>>,
}

pub async fn index(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
) -> HandlerResult {
    let registrations = state.store().list_registrations().await?;
    let view = IndexView {
        registrations: registrations
            .iter()
            .map(|registration| RegistrationRow {
                name: registration.display_name(),
                username: &registration.fields.username,
                location: &registration.fields.location,
                created: display_time(&registration.created),
            })
            .collect(),
    };
    let page = state.render_with_notice(
        &mut session,
        "index",
        "Registrations",
        state.config().notice(),
        &view,
    )?;
    Ok((session, page))
}

/// Deadline first, then authentication.
fn registration_gate(state: &AppState, session: &mut Session) -> Result<User, Response> {
    if !state.config().registration_open(Utc::now()) {
        session.flash(REGISTRATION_CLOSED);
        return Err(redirect("/"));
    }
    session
        .user(state.config())
        .ok_or_else(|| login_redirect("/new"))
}

pub async fn new_form(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
) -> HandlerResult {
    let user = match registration_gate(&state, &mut session) {
        Ok(user) => user,
        Err(response) => return Ok((session, response)),
    };

    let mut values = FormValues::default();
    if let Some(username) = &user.username {
        values.set("username", username.as_str());
    }

    let page = NEW_PAGE.render(
        &state,
        &mut session,
        &registration::SCHEMA,
        &values,
        &FormErrors::default(),
    )?;
    Ok((session, page))
}

pub async fn new_submit(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    form: Option<Form<FormValues>>,
) -> HandlerResult {
    let mut values = submitted(form);
    let user = match registration_gate(&state, &mut session) {
        Ok(user) => user,
        Err(response) => return Ok((session, response)),
    };

    let errors = registration::SCHEMA.validate(&mut values);
    if !errors.is_empty() {
        let page = NEW_PAGE.render(&state, &mut session, &registration::SCHEMA, &values, &errors)?;
        return Ok((session, page));
    }

    let fields = RegistrationFields::from_values(&values)?;
    let id = generate_id(state.store(), Collection::Registrations).await?;
    let registration = Registration::new(id, user.identity, fields, Utc::now());
    state.store().insert_registration(&registration).await?;

    info!(registration_id = %registration.id, "Registration created");

    Ok((session, redirect("/")))
}

pub async fn edit(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
) -> HandlerResult {
    let Some(user) = session.user(state.config()) else {
        return Ok((session, login_redirect("/edit")));
    };

    let registrations = state.store().registrations_by_owner(&user.identity).await?;
    let page = match registrations.as_slice() {
        [] => state.render(
            &mut session,
            "empty",
            "Edit registration",
            &EmptyView {
                message: "You have not registered yet.",
                link: "/new",
                link_text: "Register now",
            },
        )?,
        [only] => redirect(&format!("/edit/{}", only.id)),
        many => {
            let items: Vec<ChoiceItem> = many
                .iter()
                .map(|registration| ChoiceItem {
                    url: format!("/edit/{}", registration.id),
                    label: registration.display_name(),
                    created: display_time(&registration.created),
                })
                .collect();
            state.render(
                &mut session,
                "choose",
                "Edit registration",
                &serde_json::json!({ "items": items }),
            )?
        }
    };
    Ok((session, page))
}

/// The caller's identity and their registration `id`, if both exist.
async fn owned_registration(
    state: &AppState,
    session: &Session,
    id: &str,
) -> Result<Option<(User, Registration)>, AppError> {
    let Some(user) = session.user(state.config()) else {
        return Ok(None);
    };
    let registration = state.store().find_registration(id, &user.identity).await?;
    Ok(registration.map(|registration| (user, registration)))
}

fn render_edit(
    state: &AppState,
    session: &mut Session,
    id: &str,
    values: &FormValues,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let action = format!("/edit/{id}");
    let delete_url = format!("/delete/{id}");
    FormPage {
        title: "Edit registration",
        action: &action,
        submit_text: "Edit registration",
        message: None,
        delete: Some((&delete_url, "Delete registration")),
    }
    .render(state, session, &registration::SCHEMA, values, errors)
}

pub async fn edit_one_form(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    Path(id): Path<String>,
) -> HandlerResult {
    let Some((_, registration)) = owned_registration(&state, &session, &id).await? else {
        return Ok((session, redirect("/")));
    };

    let page = render_edit(
        &state,
        &mut session,
        &id,
        &registration.fields.to_values(),
        &FormErrors::default(),
    )?;
    Ok((session, page))
}

pub async fn edit_one_submit(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    Path(id): Path<String>,
    form: Option<Form<FormValues>>,
) -> HandlerResult {
    let mut values = submitted(form);
    let Some((_, mut registration)) = owned_registration(&state, &session, &id).await? else {
        return Ok((session, redirect("/")));
    };

    let errors = registration::SCHEMA.validate(&mut values);
    if !errors.is_empty() {
        let page = render_edit(&state, &mut session, &id, &values, &errors)?;
        return Ok((session, page));
    }

    registration.fields = RegistrationFields::from_values(&values)?;
    registration.modified = Utc::now();
    state.store().update_registration(&registration).await?;

    info!(registration_id = %registration.id, "Registration updated");
    session.flash(REGISTRATION_UPDATED);

    Ok((session, redirect("/")))
}

pub async fn delete_form(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    Path(id): Path<String>,
) -> HandlerResult {
    let Some((_, registration)) = owned_registration(&state, &session, &id).await? else {
        return Ok((session, redirect("/")));
    };

    let action = format!("/delete/{id}");
    let message = format!("Delete the registration for {}?", registration.display_name());
    let page = FormPage {
        title: "Delete registration",
        action: &action,
        submit_text: "Delete",
        message: Some(&message),
        delete: None,
    }
    .render(
        &state,
        &mut session,
        &confirmation::SCHEMA,
        &FormValues::default(),
        &FormErrors::default(),
    )?;
    Ok((session, page))
}

pub async fn delete_submit(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    Path(id): Path<String>,
    form: Option<Form<FormValues>>,
) -> HandlerResult {
    let values = submitted(form);
    let Some((user, _)) = owned_registration(&state, &session, &id).await? else {
        return Ok((session, redirect("/")));
    };

    let confirmation = Confirmation::from_values(&values)?;
    if confirmation.confirmbox && state.store().delete_registration(&id, &user.identity).await? {
        info!(registration_id = %id, "Registration deleted");
        session.flash(REGISTRATION_DELETED);
    } else {
        session.flash(REGISTRATION_NOT_DELETED);
    }

    Ok((session, redirect("/")))
}
