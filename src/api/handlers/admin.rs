use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{info, warn};

use super::{redirect, HandlerResult};
use crate::api::{session::Session, AppState};

/// Accept or reject a proposal. Only configured admins get past the 401.
pub async fn moderate(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    Path((action, id)): Path<(String, String)>,
) -> HandlerResult {
    let user = session.user(state.config());
    let username = user.as_ref().and_then(|user| user.username.as_deref());
    if !state.config().is_admin(username) {
        warn!(?username, "unauthorized moderation attempt");
        return Ok((session, StatusCode::UNAUTHORIZED.into_response()));
    }

    let rejected = match action.as_str() {
        "accept" => false,
        "reject" => true,
        _ => return Ok((session, StatusCode::BAD_REQUEST.into_response())),
    };

    let Some(mut proposal) = state.store().find_proposal(&id).await? else {
        session.flash(format!("Cannot find proposal '{id}'"));
        return Ok((session, redirect("/proposals")));
    };

    proposal.rejected = Some(rejected);
    state.store().update_proposal(&proposal).await?;

    let message = format!("Proposal \"{}\" {action}ed", proposal.fields.title);
    info!(proposal_id = %proposal.id, "{message}");
    session.flash(message);

    Ok((session, redirect("/proposals")))
}
