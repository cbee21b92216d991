//! Per-process application state shared by every handler.

use anyhow::{bail, Context, Result};
use axum::response::{Html, IntoResponse, Response};
use axum_extra::extract::cookie::Key;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::sync::Arc;
use url::Url;

use super::{
    error::AppError,
    render::{Page, Templates},
    session::Session,
};
use crate::{
    cli::commands::identity::{DEFAULT_IDENTITY_DOMAIN, DEFAULT_IDENTITY_PROVIDER_URL},
    identity::IdentityProvider,
    store::Store,
};

/// Minimum length of the session secret; the cookie key is derived from it.
pub const MIN_SESSION_SECRET_BYTES: usize = 32;

const CALLBACK_PATH: &str = "login/callback";

#[derive(Clone, Debug)]
pub struct AppConfig {
    public_url: Url,
    identity_provider_url: String,
    identity_domain: String,
    registration_deadline: DateTime<Utc>,
    submission_deadline: DateTime<Utc>,
    admins: Vec<String>,
    notice: Option<String>,
}

impl AppConfig {
    /// Deadlines default to "never"; the admin list starts empty.
    #[must_use]
    pub fn new(public_url: Url) -> Self {
        Self {
            public_url,
            identity_provider_url: DEFAULT_IDENTITY_PROVIDER_URL.to_string(),
            identity_domain: DEFAULT_IDENTITY_DOMAIN.to_string(),
            registration_deadline: DateTime::<Utc>::MAX_UTC,
            submission_deadline: DateTime::<Utc>::MAX_UTC,
            admins: Vec::new(),
            notice: None,
        }
    }

    #[must_use]
    pub fn with_identity_provider_url(mut self, url: String) -> Self {
        self.identity_provider_url = url;
        self
    }

    #[must_use]
    pub fn with_identity_domain(mut self, domain: String) -> Self {
        self.identity_domain = domain;
        self
    }

    #[must_use]
    pub fn with_registration_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.registration_deadline = deadline;
        self
    }

    #[must_use]
    pub fn with_submission_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.submission_deadline = deadline;
        self
    }

    #[must_use]
    pub fn with_admins(mut self, admins: Vec<String>) -> Self {
        self.admins = admins;
        self
    }

    #[must_use]
    pub fn with_notice(mut self, notice: Option<String>) -> Self {
        self.notice = notice;
        self
    }

    #[must_use]
    pub fn public_url(&self) -> &Url {
        &self.public_url
    }

    #[must_use]
    pub fn identity_provider_url(&self) -> &str {
        &self.identity_provider_url
    }

    #[must_use]
    pub fn identity_domain(&self) -> &str {
        &self.identity_domain
    }

    #[must_use]
    pub fn admins(&self) -> &[String] {
        &self.admins
    }

    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Registration stays open through the deadline instant itself.
    #[must_use]
    pub fn registration_open(&self, now: DateTime<Utc>) -> bool {
        now <= self.registration_deadline
    }

    /// Submission closes at the deadline instant.
    #[must_use]
    pub fn submission_open(&self, now: DateTime<Utc>) -> bool {
        now < self.submission_deadline
    }

    #[must_use]
    pub fn is_admin(&self, username: Option<&str>) -> bool {
        username.is_some_and(|name| self.admins.iter().any(|admin| admin == name))
    }

    /// OpenID realm: the public base URL.
    #[must_use]
    pub fn realm(&self) -> String {
        self.public_url.to_string()
    }

    /// Where the identity provider sends the user back to.
    #[must_use]
    pub fn return_to(&self) -> String {
        format!(
            "{}/{CALLBACK_PATH}",
            self.public_url.as_str().trim_end_matches('/')
        )
    }

    /// Cookies are marked secure when served over https.
    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.public_url.scheme() == "https"
    }
}

pub struct AppState {
    config: AppConfig,
    store: Arc<dyn Store>,
    identity: Arc<dyn IdentityProvider>,
    templates: Templates,
    key: Key,
}

impl AppState {
    /// # Errors
    /// Returns an error if the session secret is too short or templates fail to compile.
    pub fn new(
        config: AppConfig,
        store: Arc<dyn Store>,
        identity: Arc<dyn IdentityProvider>,
        session_secret: &SecretString,
    ) -> Result<Self> {
        let secret = session_secret.expose_secret();
        if secret.len() < MIN_SESSION_SECRET_BYTES {
            bail!("session secret must be at least {MIN_SESSION_SECRET_BYTES} bytes");
        }

        let templates = Templates::new().context("Failed to compile templates")?;

        Ok(Self {
            config,
            store,
            identity,
            templates,
            key: Key::derive_from(secret.as_bytes()),
        })
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn cookie_key(&self) -> &Key {
        &self.key
    }

    /// Render a full page, draining the session's queued flashes into it.
    ///
    /// # Errors
    /// Returns an error if the template fails to render.
    pub fn render<T: Serialize>(
        &self,
        session: &mut Session,
        template: &str,
        title: &str,
        content: &T,
    ) -> Result<Response, AppError> {
        self.render_with_notice(session, template, title, None, content)
    }

    /// Like [`AppState::render`], with an extra message shown above the flashes.
    ///
    /// # Errors
    /// Returns an error if the template fails to render.
    pub fn render_with_notice<T: Serialize>(
        &self,
        session: &mut Session,
        template: &str,
        title: &str,
        notice: Option<&str>,
        content: &T,
    ) -> Result<Response, AppError> {
        let user = session.user(&self.config);
        let admin = self
            .config
            .is_admin(user.as_ref().and_then(|user| user.username.as_deref()));
        let page = Page {
            title,
            user,
            admin,
            notice,
            flashes: session.take_flashes(),
            content,
        };
        let body = self.templates.render(template, &page)?;
        Ok(Html(body).into_response())
    }
}
