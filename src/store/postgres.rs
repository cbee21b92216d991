//! PostgreSQL store backend.

use axum::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    types::Json,
    PgPool, Row,
};
use std::time::Duration;
use tracing::{debug, instrument};

use super::{
    Collection, Proposal, ProposalFields, Registration, RegistrationFields, Result, Store,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

const REGISTRATION_COLUMNS: &str = "id, owner, created, modified, document";
const PROPOSAL_COLUMNS: &str = "id, owner, created, modified, rejected, document";

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect a small pool; requests are short and mostly single-query.
    ///
    /// # Errors
    /// Returns an error if the database cannot be reached.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .max_lifetime(Duration::from_secs(60 * 2))
            .test_before_acquire(true)
            .connect(dsn)
            .await?;
        Ok(Self { pool })
    }

    /// Apply the embedded schema. Every statement is idempotent.
    ///
    /// # Errors
    /// Returns an error if any statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in split_sql_statements(SCHEMA_SQL) {
            sqlx::query(&statement).execute(&self.pool).await?;
        }
        debug!("database schema applied");
        Ok(())
    }
}

/// Splits a schema file on statement-terminating semicolons, dropping comments.
fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn registration_from_row(row: &PgRow) -> Result<Registration> {
    let Json(fields): Json<RegistrationFields> = row.try_get("document")?;
    Ok(Registration {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        created: row.try_get("created")?,
        modified: row.try_get("modified")?,
        fields,
    })
}

fn proposal_from_row(row: &PgRow) -> Result<Proposal> {
    let Json(fields): Json<ProposalFields> = row.try_get("document")?;
    Ok(Proposal {
        id: row.try_get("id")?,
        owner: row.try_get("owner")?,
        created: row.try_get("created")?,
        modified: row.try_get("modified")?,
        rejected: row.try_get("rejected")?,
        fields,
    })
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn id_exists(&self, collection: Collection, id: &str) -> Result<bool> {
        let query = match collection {
            Collection::Registrations => "SELECT EXISTS (SELECT 1 FROM registrations WHERE id = $1)",
            Collection::Proposals => "SELECT EXISTS (SELECT 1 FROM proposals WHERE id = $1)",
        };
        let exists: bool = sqlx::query_scalar(query)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    #[instrument(skip_all, fields(registration_id = %registration.id))]
    async fn insert_registration(&self, registration: &Registration) -> Result<()> {
        let query = r"
            INSERT INTO registrations (id, owner, created, modified, document)
            VALUES ($1, $2, $3, $4, $5)
        ";
        sqlx::query(query)
            .bind(&registration.id)
            .bind(&registration.owner)
            .bind(registration.created)
            .bind(registration.modified)
            .bind(Json(&registration.fields))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_registrations(&self) -> Result<Vec<Registration>> {
        let query =
            format!("SELECT {REGISTRATION_COLUMNS} FROM registrations ORDER BY created ASC");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(registration_from_row).collect()
    }

    async fn registrations_by_owner(&self, owner: &str) -> Result<Vec<Registration>> {
        let query = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE owner = $1 ORDER BY created ASC"
        );
        let rows = sqlx::query(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(registration_from_row).collect()
    }

    async fn find_registration(&self, id: &str, owner: &str) -> Result<Option<Registration>> {
        let query = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1 AND owner = $2"
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(registration_from_row).transpose()
    }

    #[instrument(skip_all, fields(registration_id = %registration.id))]
    async fn update_registration(&self, registration: &Registration) -> Result<()> {
        let query = r"
            UPDATE registrations
            SET document = $3, modified = $4
            WHERE id = $1 AND owner = $2
        ";
        sqlx::query(query)
            .bind(&registration.id)
            .bind(&registration.owner)
            .bind(Json(&registration.fields))
            .bind(registration.modified)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_registration(&self, id: &str, owner: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM registrations WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip_all, fields(proposal_id = %proposal.id))]
    async fn insert_proposal(&self, proposal: &Proposal) -> Result<()> {
        let query = r"
            INSERT INTO proposals (id, owner, created, modified, rejected, document)
            VALUES ($1, $2, $3, $4, $5, $6)
        ";
        sqlx::query(query)
            .bind(&proposal.id)
            .bind(&proposal.owner)
            .bind(proposal.created)
            .bind(proposal.modified)
            .bind(proposal.rejected)
            .bind(Json(&proposal.fields))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_proposals(&self) -> Result<Vec<Proposal>> {
        let query = format!("SELECT {PROPOSAL_COLUMNS} FROM proposals ORDER BY created ASC");
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(proposal_from_row).collect()
    }

    async fn proposals_by_owner(&self, owner: &str) -> Result<Vec<Proposal>> {
        let query = format!(
            "SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE owner = $1 ORDER BY created ASC"
        );
        let rows = sqlx::query(&query)
            .bind(owner)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(proposal_from_row).collect()
    }

    async fn find_proposal(&self, id: &str) -> Result<Option<Proposal>> {
        let query = format!("SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(proposal_from_row).transpose()
    }

    async fn find_owned_proposal(&self, id: &str, owner: &str) -> Result<Option<Proposal>> {
        let query = format!("SELECT {PROPOSAL_COLUMNS} FROM proposals WHERE id = $1 AND owner = $2");
        let row = sqlx::query(&query)
            .bind(id)
            .bind(owner)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(proposal_from_row).transpose()
    }

    #[instrument(skip_all, fields(proposal_id = %proposal.id))]
    async fn update_proposal(&self, proposal: &Proposal) -> Result<()> {
        let query = r"
            UPDATE proposals
            SET document = $3, modified = $4, rejected = $5
            WHERE id = $1 AND owner = $2
        ";
        sqlx::query(query)
            .bind(&proposal.id)
            .bind(&proposal.owner)
            .bind(Json(&proposal.fields))
            .bind(proposal.modified)
            .bind(proposal.rejected)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_proposal(&self, id: &str, owner: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM proposals WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_splits_into_statements() {
        let statements = split_sql_statements(SCHEMA_SQL);
        assert_eq!(statements.len(), 6);
        assert!(statements
            .iter()
            .all(|statement| statement.ends_with(';') && !statement.contains("--")));
        assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS registrations"));
    }

    #[test]
    fn split_keeps_trailing_statement_without_semicolon() {
        let statements = split_sql_statements("SELECT 1;\nSELECT 2");
        assert_eq!(statements, vec!["SELECT 1;".to_string(), "SELECT 2".to_string()]);
    }
}
