mod common;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use common::{TestClient, ALICE, BOB};
use regdesk::store::Store;

/// Alice is the only admin; Bob owns one proposal.
async fn setup() -> Result<(TestClient, String)> {
    let config = common::config()?.with_admins(vec!["alice".to_string()]);
    let mut bob = TestClient::new(config)?;
    bob.register_as(BOB, "Bruno").await?;
    bob.post_form(
        "/submit_proposal",
        &[("title", "Fonts at scale"), ("abstract", "Glyphs.")],
    )
    .await?;
    let id = bob.store.proposals_by_owner(BOB).await?[0].id.clone();

    let mut alice = bob.fork();
    alice.login_as(ALICE).await?;
    Ok((alice, id))
}

#[tokio::test]
async fn anonymous_and_non_admins_are_unauthorized() -> Result<()> {
    let (alice, id) = setup().await?;

    let mut anonymous = alice.fork();
    let response = anonymous.get(&format!("/admin/accept/{id}")).await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let mut bob = alice.fork();
    bob.login_as(BOB).await?;
    let response = bob.get(&format!("/admin/reject/{id}")).await?;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let proposal = bob.store.find_proposal(&id).await?.context("kept")?;
    assert_eq!(proposal.rejected, Some(false));
    Ok(())
}

#[tokio::test]
async fn unknown_action_is_bad_request() -> Result<()> {
    let (mut alice, id) = setup().await?;

    let response = alice.get(&format!("/admin/approve/{id}")).await?;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_proposal_flashes() -> Result<()> {
    let (mut alice, _) = setup().await?;

    let response = alice.get("/admin/accept/nope").await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location.as_deref(), Some("/proposals"));

    let list = alice.follow(&response).await?;
    assert!(list.body.contains("Cannot find proposal"));
    assert!(list.body.contains("nope"));
    Ok(())
}

#[tokio::test]
async fn admin_rejects_then_accepts() -> Result<()> {
    let (mut alice, id) = setup().await?;
    let before = alice.store.find_proposal(&id).await?.context("stored")?;

    let list = alice.get("/proposals").await?;
    assert!(list.body.contains(&format!("/admin/reject/{id}")));

    let response = alice.get(&format!("/admin/reject/{id}")).await?;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let rejected = alice.store.find_proposal(&id).await?.context("kept")?;
    assert_eq!(rejected.rejected, Some(true));
    assert_eq!(rejected.modified, before.modified);

    let list = alice.follow(&response).await?;
    assert!(list.body.contains("Fonts at scale&quot; rejected"));
    assert!(list.body.contains("Rejected"));

    alice.get(&format!("/admin/accept/{id}")).await?;
    let accepted = alice.store.find_proposal(&id).await?.context("kept")?;
    assert_eq!(accepted.rejected, Some(false));
    Ok(())
}
