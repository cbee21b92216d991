//! Federated identity: login delegation and short-username derivation.
//!
//! The handlers only see [`IdentityProvider`]. A login is two calls: `begin`
//! resolves the identifier the user typed and returns the provider URL to
//! redirect to, plus the [`PendingLogin`] that must survive (in the session)
//! until the provider sends the user back; `complete` checks the provider's
//! answer against that pending state and yields the verified identity string.

mod openid;

pub use openid::OpenIdProvider;

use axum::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    #[error("no OpenID endpoint found for {0}")]
    Discovery(String),
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("login was cancelled")]
    Cancelled,
    #[error("identity provider returned an error: {0}")]
    Provider(String),
    #[error("identity assertion rejected: {0}")]
    Rejected(String),
}

/// State carried from `begin` to `complete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingLogin {
    /// Provider endpoint the user was sent to; the assertion must come from it.
    pub endpoint: String,
    /// Claimed identifier, or the identifier-select marker when the provider chooses.
    pub claimed_id: String,
}

#[derive(Debug, Clone)]
pub struct LoginRedirect {
    pub url: String,
    pub pending: PendingLogin,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve `identifier` and build the provider redirect.
    async fn begin(
        &self,
        identifier: &str,
        return_to: &str,
        realm: &str,
    ) -> Result<LoginRedirect, IdentityError>;

    /// Verify the provider's callback parameters and return the identity.
    async fn complete(
        &self,
        pending: &PendingLogin,
        response: &HashMap<String, String>,
        return_to: &str,
    ) -> Result<String, IdentityError>;
}

/// Derive the local username from an identity hosted under `domain`.
///
/// `https://alice.id.example.org/` under `id.example.org` gives `alice`.
/// Anything that does not parse yields `None`.
#[must_use]
pub fn short_username(identity: &str, domain: &str) -> Option<String> {
    if domain.is_empty() || !identity.contains(domain) {
        return None;
    }
    let host = identity.split("//").nth(1)?;
    host.split('.')
        .next()
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOMAIN: &str = "id.fedoraproject.org";

    #[test]
    fn short_username_from_subdomain() {
        assert_eq!(
            short_username("https://alice.id.fedoraproject.org/", DOMAIN),
            Some("alice".to_string())
        );
        assert_eq!(
            short_username("http://bob.id.fedoraproject.org", DOMAIN),
            Some("bob".to_string())
        );
    }

    #[test]
    fn short_username_ignores_foreign_identities() {
        assert_eq!(short_username("https://alice.example.com/", DOMAIN), None);
        assert_eq!(short_username("https://alice.id.fedoraproject.org/", ""), None);
    }

    #[test]
    fn short_username_swallows_parse_failures() {
        assert_eq!(short_username("id.fedoraproject.org/alice", DOMAIN), None);
        assert_eq!(short_username("https://.id.fedoraproject.org/", DOMAIN), None);
    }

    #[test]
    fn short_username_of_bare_provider_is_first_label() {
        assert_eq!(
            short_username("https://id.fedoraproject.org/", DOMAIN),
            Some("id".to_string())
        );
    }
}
