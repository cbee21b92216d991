//! Talk proposal lifecycle, mirroring registrations under `/proposals`.

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
            proposal, FormErrors, FormModel, FormValues,
        },
        session::{Session, User},
        AppError, AppState,
    },
    store::{generate_id, Collection, Proposal, ProposalFields},
};

pub const SUBMISSION_CLOSED: &str = "The presentation submission period has closed";
pub const REGISTER_FIRST: &str = "You must register before you can submit a proposal";
pub const PROPOSAL_SUBMITTED: &str = "Proposal submitted";
pub const PROPOSAL_UPDATED: &str = "Proposal updated";
pub const PROPOSAL_DELETED: &str = "Proposal deleted";
pub const PROPOSAL_NOT_DELETED: &str = "Proposal not deleted";

const SUBMIT_PAGE: FormPage<'static> = FormPage {
    title: "Submit a proposal",
    action: "/submit_proposal",
    submit_text: "Submit proposal",
    message: None,
    delete: None,
};

#[derive(Debug, Serialize)]
struct ProposalsView<'a> {
    proposals: &'a [Proposal],
}

pub async fn list(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
) -> HandlerResult {
    let proposals = state.store().list_proposals().await?;
    let page = state.render(
        &mut session,
        "proposals",
        "Proposals",
        &ProposalsView {
            proposals: &proposals,
        },
    )?;
    Ok((session, page))
}

/// Deadline, then authentication, then an existing registration.
async fn submission_gate(
    state: &AppState,
    session: &mut Session,
) -> Result<Result<User, Response>, AppError> {
    if !state.config().submission_open(Utc::now()) {
        session.flash(SUBMISSION_CLOSED);
        return Ok(Err(redirect("/proposals")));
    }
    let Some(user) = session.user(state.config()) else {
        return Ok(Err(login_redirect("/submit_proposal")));
    };
    if state
        .store()
        .registrations_by_owner(&user.identity)
        .await?
        .is_empty()
    {
        session.flash(REGISTER_FIRST);
        return Ok(Err(redirect("/new")));
    }
    Ok(Ok(user))
}

pub async fn submit_form(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
) -> HandlerResult {
    let user = match submission_gate(&state, &mut session).await? {
        Ok(user) => user,
        Err(response) => return Ok((session, response)),
    };

    let mut values = FormValues::default();
    if let Some(username) = &user.username {
        values.set("username", username.as_str());
    }

    let page = SUBMIT_PAGE.render(
        &state,
        &mut session,
        &proposal::SCHEMA,
        &values,
        &FormErrors::default(),
    )?;
    Ok((session, page))
}

pub async fn submit(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    form: Option<Form<FormValues>>,
) -> HandlerResult {
    let mut values = submitted(form);
    let user = match submission_gate(&state, &mut session).await? {
        Ok(user) => user,
        Err(response) => return Ok((session, response)),
    };

    let errors = proposal::SCHEMA.validate(&mut values);
    if !errors.is_empty() {
        let page = SUBMIT_PAGE.render(&state, &mut session, &proposal::SCHEMA, &values, &errors)?;
        return Ok((session, page));
    }

    let fields = ProposalFields::from_values(&values)?;
    let id = generate_id(state.store(), Collection::Proposals).await?;
    let proposal = Proposal::new(id, user.identity, fields, Utc::now());
    state.store().insert_proposal(&proposal).await?;

    info!(proposal_id = %proposal.id, "Proposal submitted");
    session.flash(PROPOSAL_SUBMITTED);

    Ok((session, redirect("/proposals")))
}

pub async fn edit(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
) -> HandlerResult {
    let Some(user) = session.user(state.config()) else {
        return Ok((session, login_redirect("/edit_proposal")));
    };

    let proposals = state.store().proposals_by_owner(&user.identity).await?;
    let page = match proposals.as_slice() {
        [] => state.render(
            &mut session,
            "empty",
            "Edit proposal",
            &EmptyView {
                message: "You have not submitted any proposals.",
                link: "/submit_proposal",
                link_text: "Submit a proposal",
            },
        )?,
        [only] => redirect(&format!("/edit_proposal/{}", only.id)),
        many => {
            let items: Vec<ChoiceItem> = many
                .iter()
                .map(|proposal| ChoiceItem {
                    url: format!("/edit_proposal/{}", proposal.id),
                    label: proposal.fields.title.clone(),
                    created: display_time(&proposal.created),
                })
                .collect();
            state.render(
                &mut session,
                "choose",
                "Edit proposal",
                &serde_json::json!({ "items": items }),
            )?
        }
    };
    Ok((session, page))
}

async fn owned_proposal(
    state: &AppState,
    session: &Session,
    id: &str,
) -> Result<Option<(User, Proposal)>, AppError> {
    let Some(user) = session.user(state.config()) else {
        return Ok(None);
    };
    let proposal = state.store().find_owned_proposal(id, &user.identity).await?;
    Ok(proposal.map(|proposal| (user, proposal)))
}

fn render_edit(
    state: &AppState,
    session: &mut Session,
    id: &str,
    values: &FormValues,
    errors: &FormErrors,
) -> Result<Response, AppError> {
    let action = format!("/edit_proposal/{id}");
    let delete_url = format!("/delete_proposal/{id}");
    FormPage {
        title: "Edit proposal",
        action: &action,
        submit_text: "Edit proposal",
        message: None,
        delete: Some((&delete_url, "Delete proposal")),
    }
    .render(state, session, &proposal::SCHEMA, values, errors)
}

pub async fn edit_one_form(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    Path(id): Path<String>,
) -> HandlerResult {
    let Some((_, proposal)) = owned_proposal(&state, &session, &id).await? else {
        return Ok((session, redirect("/")));
    };

    let page = render_edit(
        &state,
        &mut session,
        &id,
        &proposal.fields.to_values(),
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
    let Some((_, mut proposal)) = owned_proposal(&state, &session, &id).await? else {
        return Ok((session, redirect("/")));
    };

    let errors = proposal::SCHEMA.validate(&mut values);
    if !errors.is_empty() {
        let page = render_edit(&state, &mut session, &id, &values, &errors)?;
        return Ok((session, page));
    }

    proposal.fields = ProposalFields::from_values(&values)?;
    proposal.modified = Utc::now();
    state.store().update_proposal(&proposal).await?;

    info!(proposal_id = %proposal.id, "Proposal updated");
    session.flash(PROPOSAL_UPDATED);

    Ok((session, redirect("/proposals")))
}

pub async fn delete_form(
    Extension(state): Extension<Arc<AppState>>,
    mut session: Session,
    Path(id): Path<String>,
) -> HandlerResult {
    let Some((_, proposal)) = owned_proposal(&state, &session, &id).await? else {
        return Ok((session, redirect("/")));
    };

    let action = format!("/delete_proposal/{id}");
    let message = format!("Delete the proposal \"{}\"?", proposal.fields.title);
    let page = FormPage {
        title: "Delete proposal",
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
    let Some((user, _)) = owned_proposal(&state, &session, &id).await? else {
        return Ok((session, redirect("/")));
    };

    let confirmation = Confirmation::from_values(&values)?;
    if confirmation.confirmbox && state.store().delete_proposal(&id, &user.identity).await? {
        info!(proposal_id = %id, "Proposal deleted");
        session.flash(PROPOSAL_DELETED);
    } else {
        session.flash(PROPOSAL_NOT_DELETED);
    }

    Ok((session, redirect("/proposals")))
}
