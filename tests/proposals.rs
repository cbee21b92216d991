mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{TestClient, ALICE, BOB};
use regdesk::store::Store;

const PROPOSAL: &[(&str, &str)] = &[
    ("title", "Packaging Rust"),
    ("category", "Community"),
    ("session_type", "Talk (45 min)"),
    ("abstract", "Vendoring, features and lockfiles."),
];

#[tokio::test]
async fn anonymous_submit_goes_to_login() -> Result<()> {
    let mut client = TestClient::with_defaults()?;

    let response = client.get("/submit_proposal").await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(
        response.location.as_deref(),
        Some("/login?next=/submit_proposal")
    );
    Ok(())
}

#[tokio::test]
async fn unregistered_users_are_sent_to_register() -> Result<()> {
    let mut client = TestClient::with_defaults()?;
    client.login_as(ALICE).await?;

    let response = client.post_form("/submit_proposal", PROPOSAL).await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/new"));
    assert_eq!(client.store.counts().await, (0, 0));

    let page = client.follow(&response).await?;
    assert!(page
        .body
        .contains("You must register before you can submit a proposal"));
    Ok(())
}

#[tokio::test]
async fn registered_users_can_submit() -> Result<()> {
    let mut client = TestClient::with_defaults()?;
    client.register_as(ALICE, "Ana").await?;

    let form = client.get("/submit_proposal").await?;
    assert_eq!(form.status, StatusCode::OK);
    assert!(form.body.contains("Presentation abstract"));

    let response = client.post_form("/submit_proposal", PROPOSAL).await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/proposals"));

    let stored = client.store.proposals_by_owner(ALICE).await?;
    let proposal = stored.first().context("stored")?;
    assert_eq!(proposal.fields.title, "Packaging Rust");
    assert_eq!(proposal.rejected, Some(false));

    let list = client.follow(&response).await?;
    assert!(list.body.contains("Proposal submitted"));
    assert!(list.body.contains("Packaging Rust"));
    assert!(!list.body.contains("/admin/accept/"), "no moderation links");
    Ok(())
}

#[tokio::test]
async fn proposal_requires_title_and_abstract() -> Result<()> {
    let mut client = TestClient::with_defaults()?;
    client.register_as(ALICE, "Ana").await?;

    let response = client
        .post_form("/submit_proposal", &[("category", "Kernel")])
        .await?;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body.matches("This field is required.").count(), 2);
    assert_eq!(client.store.counts().await, (1, 0));
    Ok(())
}

#[tokio::test]
async fn submission_closes_at_deadline() -> Result<()> {
    let config = common::config()?.with_submission_deadline(Utc::now() - Duration::minutes(1));
    let mut client = TestClient::new(config)?;
    client.register_as(ALICE, "Ana").await?;

    let response = client.post_form("/submit_proposal", PROPOSAL).await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/proposals"));
    assert_eq!(client.store.counts().await, (1, 0));

    let list = client.follow(&response).await?;
    assert!(list
        .body
        .contains("The presentation submission period has closed"));
    Ok(())
}

#[tokio::test]
async fn owner_edits_and_deletes() -> Result<()> {
    let mut client = TestClient::with_defaults()?;
    client.register_as(ALICE, "Ana").await?;
    client.post_form("/submit_proposal", PROPOSAL).await?;
    let id = client.store.proposals_by_owner(ALICE).await?[0].id.clone();

    let picker = client.get("/edit_proposal").await?;
    assert_eq!(picker.location, Some(format!("/edit_proposal/{id}")));

    let response = client
        .post_form(
            &format!("/edit_proposal/{id}"),
            &[("title", "Packaging Rust, again"), ("abstract", "More.")],
        )
        .await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let edited = client
        .store
        .find_owned_proposal(&id, ALICE)
        .await?
        .context("kept")?;
    assert_eq!(edited.fields.title, "Packaging Rust, again");
    assert_eq!(edited.fields.category, "Ambassadors", "empty select takes first");

    let unconfirmed = client
        .post_form(&format!("/delete_proposal/{id}"), &[])
        .await?;
    assert_eq!(unconfirmed.location.as_deref(), Some("/proposals"));
    assert_eq!(client.store.counts().await, (1, 1));

    client
        .post_form(&format!("/delete_proposal/{id}"), &[("confirmbox", "y")])
        .await?;
    assert_eq!(client.store.counts().await, (1, 0));
    Ok(())
}

#[tokio::test]
async fn others_cannot_touch_a_proposal() -> Result<()> {
    let mut alice = TestClient::with_defaults()?;
    alice.register_as(ALICE, "Ana").await?;
    alice.post_form("/submit_proposal", PROPOSAL).await?;
    let id = alice.store.proposals_by_owner(ALICE).await?[0].id.clone();

    let mut bob = alice.fork();
    bob.register_as(BOB, "Bruno").await?;

    let form = bob.get(&format!("/edit_proposal/{id}")).await?;
    assert_eq!(form.location.as_deref(), Some("/"));

    bob.post_form(
        &format!("/edit_proposal/{id}"),
        &[("title", "Hijacked"), ("abstract", "Mine now.")],
    )
    .await?;
    bob.post_form(&format!("/delete_proposal/{id}"), &[("confirmbox", "y")])
        .await?;

    let kept = alice.store.find_proposal(&id).await?.context("kept")?;
    assert_eq!(kept.fields.title, "Packaging Rust");
    Ok(())
}

#[tokio::test]
async fn edit_picker_without_proposals() -> Result<()> {
    let mut client = TestClient::with_defaults()?;
    client.login_as(ALICE).await?;

    let page = client.get("/edit_proposal").await?;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("You have not submitted any proposals."));
    Ok(())
}
