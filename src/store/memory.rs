//! In-process store backend.

use axum::async_trait;
use tokio::sync::RwLock;

use super::{Collection, Proposal, Registration, Result, Store};

#[derive(Debug, Default)]
struct Tables {
    registrations: Vec<Registration>,
    proposals: Vec<Proposal>,
}

/// Keeps records in insertion order behind a `RwLock`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Number of stored registrations and proposals.
    pub async fn counts(&self) -> (usize, usize) {
        let tables = self.tables.read().await;
        (tables.registrations.len(), tables.proposals.len())
    }
}

fn oldest_first<T: Clone>(records: impl Iterator<Item = T>, created: fn(&T) -> i64) -> Vec<T> {
    let mut records: Vec<T> = records.collect();
    // stable: equal timestamps keep insertion order
    records.sort_by_key(created);
    records
}

fn registration_created(registration: &Registration) -> i64 {
    registration.created.timestamp_micros()
}

fn proposal_created(proposal: &Proposal) -> i64 {
    proposal.created.timestamp_micros()
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn id_exists(&self, collection: Collection, id: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(match collection {
            Collection::Registrations => tables.registrations.iter().any(|r| r.id == id),
            Collection::Proposals => tables.proposals.iter().any(|p| p.id == id),
        })
    }

    async fn insert_registration(&self, registration: &Registration) -> Result<()> {
        self.tables
            .write()
            .await
            .registrations
            .push(registration.clone());
        Ok(())
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>> {
        let tables = self.tables.read().await;
        Ok(oldest_first(
            tables.registrations.iter().cloned(),
            registration_created,
        ))
    }

    async fn registrations_by_owner(&self, owner: &str) -> Result<Vec<Registration>> {
        let tables = self.tables.read().await;
        Ok(oldest_first(
            tables
                .registrations
                .iter()
                .filter(|r| r.owner == owner)
                .cloned(),
            registration_created,
        ))
    }

    async fn find_registration(&self, id: &str, owner: &str) -> Result<Option<Registration>> {
        let tables = self.tables.read().await;
        Ok(tables
            .registrations
            .iter()
            .find(|r| r.id == id && r.owner == owner)
            .cloned())
    }

    async fn update_registration(&self, registration: &Registration) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .registrations
            .iter_mut()
            .find(|r| r.id == registration.id && r.owner == registration.owner)
        {
            existing.fields = registration.fields.clone();
            existing.modified = registration.modified;
        }
        Ok(())
    }

    async fn delete_registration(&self, id: &str, owner: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.registrations.len();
        tables
            .registrations
            .retain(|r| !(r.id == id && r.owner == owner));
        Ok(tables.registrations.len() != before)
    }

    async fn insert_proposal(&self, proposal: &Proposal) -> Result<()> {
        self.tables.write().await.proposals.push(proposal.clone());
        Ok(())
    }

    async fn list_proposals(&self) -> Result<Vec<Proposal>> {
        let tables = self.tables.read().await;
        Ok(oldest_first(tables.proposals.iter().cloned(), proposal_created))
    }

    async fn proposals_by_owner(&self, owner: &str) -> Result<Vec<Proposal>> {
        let tables = self.tables.read().await;
        Ok(oldest_first(
            tables.proposals.iter().filter(|p| p.owner == owner).cloned(),
            proposal_created,
        ))
    }

    async fn find_proposal(&self, id: &str) -> Result<Option<Proposal>> {
        let tables = self.tables.read().await;
        Ok(tables.proposals.iter().find(|p| p.id == id).cloned())
    }

    async fn find_owned_proposal(&self, id: &str, owner: &str) -> Result<Option<Proposal>> {
        let tables = self.tables.read().await;
        Ok(tables
            .proposals
            .iter()
            .find(|p| p.id == id && p.owner == owner)
            .cloned())
    }

    async fn update_proposal(&self, proposal: &Proposal) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .proposals
            .iter_mut()
            .find(|p| p.id == proposal.id && p.owner == proposal.owner)
        {
            existing.fields = proposal.fields.clone();
            existing.modified = proposal.modified;
            existing.rejected = proposal.rejected;
        }
        Ok(())
    }

    async fn delete_proposal(&self, id: &str, owner: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.proposals.len();
        tables.proposals.retain(|p| !(p.id == id && p.owner == owner));
        Ok(tables.proposals.len() != before)
    }
}
