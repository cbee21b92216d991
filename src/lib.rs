//! # regdesk
//!
//! Event registration and talk proposal service.
//!
//! Attendees log in through a federated OpenID provider, fill in a
//! registration form and, once registered, submit talk proposals. Records are
//! owned by the identity that created them; only the owner may edit or delete
//! them. Administrators (an allowlist of short usernames) accept or reject
//! proposals.
//!
//! The crate is split into:
//! - [`store`]: registrations and proposals behind the `Store` trait
//! - [`identity`]: OpenID 2.0 login delegation behind `IdentityProvider`
//! - [`api`]: axum router, session cookie, forms and handlers
//! - [`cli`]: command line, configuration and telemetry

pub mod api;
pub mod cli;
pub mod identity;
pub mod store;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
