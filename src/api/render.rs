//! Embedded handlebars templates.

use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;

use super::session::User;

const PARTIALS: &[(&str, &str)] = &[
    ("header", include_str!("../../templates/partials/header.hbs")),
    ("footer", include_str!("../../templates/partials/footer.hbs")),
];

const TEMPLATES: &[(&str, &str)] = &[
    ("index", include_str!("../../templates/index.hbs")),
    ("proposals", include_str!("../../templates/proposals.hbs")),
    ("form", include_str!("../../templates/form.hbs")),
    ("choose", include_str!("../../templates/choose.hbs")),
    ("empty", include_str!("../../templates/empty.hbs")),
    ("login", include_str!("../../templates/login.hbs")),
];

/// Context shared by every page; `content` is flattened next to it.
#[derive(Debug, Serialize)]
pub struct Page<'a, T> {
    pub title: &'a str,
    pub user: Option<User>,
    pub admin: bool,
    pub notice: Option<&'a str>,
    pub flashes: Vec<String>,
    #[serde(flatten)]
    pub content: &'a T,
}

#[derive(Debug)]
pub struct Templates {
    registry: Handlebars<'static>,
}

impl Templates {
    /// # Errors
    /// Returns an error if any embedded template fails to parse.
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(false);

        for (name, source) in PARTIALS {
            registry.register_partial(name, *source)?;
        }
        for (name, source) in TEMPLATES {
            registry.register_template_string(name, *source)?;
        }

        Ok(Self { registry })
    }

    /// # Errors
    /// Returns an error if the template is unknown or rendering fails.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, RenderError> {
        self.registry.render(name, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn page<'a>(content: &'a serde_json::Value, flashes: Vec<String>) -> Page<'a, serde_json::Value> {
        Page {
            title: "Test",
            user: Some(User {
                identity: "https://alice.id.example.org/".to_string(),
                username: Some("alice".to_string()),
            }),
            admin: false,
            notice: None,
            flashes,
            content,
        }
    }

    #[test]
    fn all_templates_compile() {
        assert!(Templates::new().is_ok());
    }

    #[test]
    fn flashes_and_user_are_rendered_escaped() {
        let Ok(templates) = Templates::new() else {
            panic!("templates should compile");
        };
        let content = json!({ "registrations": [] });
        let html = templates.render(
            "index",
            &page(&content, vec!["<b>Saved</b>".to_string()]),
        );
        let Ok(html) = html else {
            panic!("index should render");
        };
        assert!(html.contains("&lt;b&gt;Saved&lt;/b&gt;"));
        assert!(html.contains(r#"<span class="user">alice</span>"#));
    }

    #[test]
    fn identity_shown_without_username() {
        let Ok(templates) = Templates::new() else {
            panic!("templates should compile");
        };
        let content = json!({ "registrations": [] });
        let mut context = page(&content, Vec::new());
        context.user = Some(User {
            identity: "https://bob.example.com/".to_string(),
            username: None,
        });
        let Ok(html) = templates.render("index", &context) else {
            panic!("index should render");
        };
        assert!(html.contains(r#"<span class="user">https://bob.example.com/</span>"#));
    }

    #[test]
    fn unknown_template_is_an_error() {
        let Ok(templates) = Templates::new() else {
            panic!("templates should compile");
        };
        let content = json!({});
        assert!(templates.render("missing", &page(&content, Vec::new())).is_err());
    }
}
