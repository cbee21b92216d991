//! Delegated login through the identity provider, and logout.

use axum::{
    extract::{Extension, Form, Query},
    http::{header::REFERER, HeaderMap},
    response::{IntoResponse, Redirect},
};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use tracing::{info, warn};

use super::{local_path, redirect, submitted, HandlerResult};
use crate::{
    api::{session::Session, AppState},
    identity::IdentityError,
};

pub const LOGIN_CANCELLED: &str = "Login cancelled";
pub const NO_LOGIN_IN_PROGRESS: &str = "No login in progress";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    next: String,
    shortcut: String,
    openid: String,
}

#[derive(Debug, Serialize)]
struct LoginView<'a> {
    next: &'a str,
    provider: &'a str,
}

fn render_login(state: &AppState, mut session: Session, next: &str) -> HandlerResult {
    let page = state.render(
        &mut session,
        "login",
        "Log in",
        &LoginView {
            next,
            provider: state.config().identity_provider_url(),
        },
    )?;
    Ok((session, page))
}

pub async fn login_page(
    Extension(state): Extension<Arc<AppState>>,
    session: Session,
    Query(query): Query<LoginQuery>,
) -> HandlerResult {
    let next = local_path(query.next.as_deref());
    if session.identity().is_some() {
        return Ok((session, redirect(&next)));
    }
    render_login(&state, session, &next)
}

pub async fn login_submit(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    form: Option<Form<LoginForm>>,
) -> HandlerResult {
    let form = submitted(form);
    let next = local_path(Some(form.next.as_str()));
    if session.identity().is_some() {
        return Ok((session, redirect(&next)));
    }

    let identifier = if !form.shortcut.is_empty() {
        state.config().identity_provider_url()
    } else if !form.openid.trim().is_empty() {
        form.openid.trim()
    } else {
        return render_login(&state, session, &next);
    };

    let config = state.config();
    match state
        .identity()
        .begin(identifier, &config.return_to(), &config.realm())
        .await
    {
        Ok(login) => {
            session.begin_login(login.pending, next);
            Ok((session, Redirect::to(&login.url).into_response()))
        }
        Err(err) => {
            warn!(identifier, "login could not start: {err}");
            session.flash(format!("Login failed: {err}"));
            Ok((session, redirect("/login")))
        }
    }
}

pub async fn callback(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    Query(response): Query<HashMap<String, String>>,
) -> HandlerResult {
    let Some((pending, next)) = session.take_pending_login() else {
        session.flash(NO_LOGIN_IN_PROGRESS);
        return Ok((session, redirect("/login")));
    };

    match state
        .identity()
        .complete(&pending, &response, &state.config().return_to())
        .await
    {
        Ok(identity) => {
            info!(%identity, "user logged in");
            session.flash(format!("Welcome, {identity}"));
            session.set_identity(identity);
            Ok((session, redirect(&next)))
        }
        Err(IdentityError::Cancelled) => {
            session.flash(LOGIN_CANCELLED);
            Ok((session, redirect("/login")))
        }
        Err(err) => {
            warn!("login failed: {err}");
            session.flash(format!("Login failed: {err}"));
            Ok((session, redirect("/login")))
        }
    }
}

/// Back to the referring page when it belongs to this site, else home.
pub async fn logout(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    headers: HeaderMap,
) -> HandlerResult {
    session.clear_identity();

    let public_url = state.config().public_url().as_str();
    let target = headers
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .filter(|referer| referer.starts_with(public_url))
        .unwrap_or("/")
        .to_string();

    Ok((session, redirect(&target)))
}
