//! Record storage for registrations and proposals.
//!
//! Handlers only talk to the [`Store`] trait. Two backends exist: PostgreSQL
//! (records kept as typed JSONB documents next to their ownership and
//! timestamp columns) and an in-memory backend used for development and tests.
//!
//! Ownership is part of every mutating query: edits and deletes are scoped to
//! `(id, owner)` so a caller can never touch another identity's record, even
//! if a handler forgets to check first.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use anyhow::{Context, Result as AnyResult};
use axum::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Upper bound on id candidates drawn before giving up on an insert.
const MAX_ID_ATTEMPTS: usize = 8;

const MEMORY_DSN_PREFIX: &str = "memory:";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed document: {0}")]
    Document(#[from] serde_json::Error),
    #[error("no unused id found after {0} attempts")]
    IdExhausted(usize),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// The two record collections kept by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Registrations,
    Proposals,
}

impl Collection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registrations => "registrations",
            Self::Proposals => "proposals",
        }
    }
}

/// Everything a registrant fills in on the registration form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationFields {
    pub firstname: String,
    pub middlename: String,
    pub lastname: String,
    pub email: String,
    pub username: String,
    pub location: String,
    pub invitation_letter: bool,
    pub hotel_funding: bool,
    pub flight_funding: bool,
    pub month_of_birth: String,
    pub day_of_birth: String,
    pub year_of_birth: String,
    pub mailing_address: String,
    pub phone_number: String,
    pub gender: String,
    pub passport_country: String,
    pub passport_number: String,
    pub departure_airport: String,
    pub return_airport: String,
    pub other_notes: String,
    pub family: String,
    pub volunteer: bool,
    pub diet: String,
    pub shirt_size: String,
    pub room_share: String,
    pub roommate: String,
    pub hotel_booked: String,
    pub blog: String,
    pub twitter: String,
    pub comments: String,
    pub badge_line: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub id: String,
    pub owner: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: RegistrationFields,
}

impl Registration {
    /// Build a fresh record; `created` and `modified` start out identical.
    #[must_use]
    pub fn new(id: String, owner: String, fields: RegistrationFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            created: now,
            modified: now,
            fields,
        }
    }

    /// Display name used by listings, falling back to the first name alone.
    #[must_use]
    pub fn display_name(&self) -> String {
        [
            self.fields.firstname.as_str(),
            self.fields.middlename.as_str(),
            self.fields.lastname.as_str(),
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalFields {
    pub username: String,
    pub title: String,
    pub category: String,
    pub session_type: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub id: String,
    pub owner: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    /// `None` and `Some(false)` both mean "not rejected"; the field does not
    /// distinguish pending from accepted.
    pub rejected: Option<bool>,
    #[serde(flatten)]
    pub fields: ProposalFields,
}

impl Proposal {
    /// New proposals start out explicitly not rejected.
    #[must_use]
    pub fn new(id: String, owner: String, fields: ProposalFields, now: DateTime<Utc>) -> Self {
        Self {
            id,
            owner,
            created: now,
            modified: now,
            rejected: Some(false),
            fields,
        }
    }

    #[must_use]
    pub fn is_rejected(&self) -> bool {
        self.rejected.unwrap_or(false)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness probe used by `/health`.
    async fn ping(&self) -> Result<()>;

    async fn id_exists(&self, collection: Collection, id: &str) -> Result<bool>;

    async fn insert_registration(&self, registration: &Registration) -> Result<()>;

    /// All registrations, oldest first.
    async fn list_registrations(&self) -> Result<Vec<Registration>>;

    /// Registrations owned by `owner`, oldest first.
    async fn registrations_by_owner(&self, owner: &str) -> Result<Vec<Registration>>;

    async fn find_registration(&self, id: &str, owner: &str) -> Result<Option<Registration>>;

    /// Replace fields and `modified` of an existing record owned by `registration.owner`.
    async fn update_registration(&self, registration: &Registration) -> Result<()>;

    /// Returns `true` when a record was removed.
    async fn delete_registration(&self, id: &str, owner: &str) -> Result<bool>;

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<()>;

    /// All proposals, oldest first.
    async fn list_proposals(&self) -> Result<Vec<Proposal>>;

    async fn proposals_by_owner(&self, owner: &str) -> Result<Vec<Proposal>>;

    /// Unscoped lookup, only for moderation.
    async fn find_proposal(&self, id: &str) -> Result<Option<Proposal>>;

    async fn find_owned_proposal(&self, id: &str, owner: &str) -> Result<Option<Proposal>>;

    /// Replace fields, `modified` and `rejected` of an existing proposal.
    async fn update_proposal(&self, proposal: &Proposal) -> Result<()>;

    async fn delete_proposal(&self, id: &str, owner: &str) -> Result<bool>;
}

/// Draw random ids until one is unused in `collection`.
///
/// The check and the later insert are not atomic; with UUIDv4 ids a race is
/// not a practical concern, and the primary key still rejects a duplicate.
///
/// # Errors
/// Returns an error if the store fails or every attempt collides.
pub async fn generate_id(store: &dyn Store, collection: Collection) -> Result<String> {
    for attempt in 1..=MAX_ID_ATTEMPTS {
        let candidate = Uuid::new_v4().to_string();
        if !store.id_exists(collection, &candidate).await? {
            return Ok(candidate);
        }
        debug!(
            collection = collection.as_str(),
            attempt, "generated id already in use"
        );
    }
    Err(StoreError::IdExhausted(MAX_ID_ATTEMPTS))
}

/// Open the backend named by `dsn`: `memory://` or a PostgreSQL URL.
///
/// # Errors
/// Returns an error if the database is unreachable or the schema cannot be applied.
pub async fn connect(dsn: &str) -> AnyResult<Arc<dyn Store>> {
    if dsn.starts_with(MEMORY_DSN_PREFIX) {
        info!("Using in-memory store; records are lost on restart");
        return Ok(Arc::new(MemoryStore::default()));
    }

    let store = PgStore::connect(dsn)
        .await
        .context("Failed to connect to database")?;
    store
        .ensure_schema()
        .await
        .context("Failed to apply database schema")?;
    Ok(Arc::new(store))
}
