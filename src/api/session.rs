//! Cookie-backed session.
//!
//! The whole session is one JSON document in a private (encrypted and
//! authenticated) cookie. Handlers take a [`Session`] as an extractor and hand
//! it back as part of the response; the cookie is only rewritten when the
//! session was modified.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponseParts, ResponseParts},
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    PrivateCookieJar,
};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};
use tracing::{error, warn};

use super::state::{AppConfig, AppState};
use crate::identity::{short_username, PendingLogin};

pub const SESSION_COOKIE: &str = "regdesk_session";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
struct SessionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flashes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    login: Option<LoginInProgress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LoginInProgress {
    pending: PendingLogin,
    next: String,
}

/// The logged-in caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub identity: String,
    /// Short username, when the identity belongs to the configured domain.
    pub username: Option<String>,
}

pub struct Session {
    jar: PrivateCookieJar,
    data: SessionData,
    secure: bool,
    dirty: bool,
}

impl Session {
    fn load(jar: PrivateCookieJar, secure: bool) -> Self {
        let data = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| match serde_json::from_str(cookie.value()) {
                Ok(data) => Some(data),
                Err(err) => {
                    warn!("discarding unreadable session cookie: {err}");
                    None
                }
            })
            .unwrap_or_default();
        Self {
            jar,
            data,
            secure,
            dirty: false,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.data.identity.as_deref()
    }

    /// The caller, with the short username derived for `config`'s identity domain.
    #[must_use]
    pub fn user(&self, config: &AppConfig) -> Option<User> {
        self.data.identity.as_ref().map(|identity| User {
            identity: identity.clone(),
            username: short_username(identity, config.identity_domain()),
        })
    }

    pub fn set_identity(&mut self, identity: String) {
        self.data.identity = Some(identity);
        self.dirty = true;
    }

    /// Forget the identity; a no-op for anonymous sessions.
    pub fn clear_identity(&mut self) {
        if self.data.identity.take().is_some() {
            self.dirty = true;
        }
    }

    pub fn flash(&mut self, message: impl Into<String>) {
        self.data.flashes.push(message.into());
        self.dirty = true;
    }

    pub fn take_flashes(&mut self) -> Vec<String> {
        if self.data.flashes.is_empty() {
            return Vec::new();
        }
        self.dirty = true;
        std::mem::take(&mut self.data.flashes)
    }

    /// Remember where a login was sent until the provider calls back.
    pub fn begin_login(&mut self, pending: PendingLogin, next: String) {
        self.data.login = Some(LoginInProgress { pending, next });
        self.dirty = true;
    }

    /// Consume the pending login; a callback can only be completed once.
    pub fn take_pending_login(&mut self) -> Option<(PendingLogin, String)> {
        let login = self.data.login.take()?;
        self.dirty = true;
        Some((login.pending, login.next))
    }

    fn cookie(&self, value: String) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE, value))
            .path("/")
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Lax)
            .build()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = parts
            .extensions
            .get::<Arc<AppState>>()
            .cloned()
            .ok_or((StatusCode::INTERNAL_SERVER_ERROR, "application state missing"))?;
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key().clone());
        Ok(Self::load(jar, state.config().secure_cookies()))
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        if !self.dirty {
            return Ok(res);
        }

        let jar = if self.data == SessionData::default() {
            self.jar.clone().remove(self.cookie(String::new()))
        } else {
            match serde_json::to_string(&self.data) {
                Ok(value) => self.jar.clone().add(self.cookie(value)),
                Err(err) => {
                    error!("failed to serialize session: {err}");
                    return Ok(res);
                }
            }
        };

        jar.into_response_parts(res)
    }
}
