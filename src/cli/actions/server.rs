use crate::{
    api::{self, AppConfig, AppState},
    identity::OpenIdProvider,
    store,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_secret: SecretString,
    pub public_url: Url,
    pub identity_provider_url: String,
    pub identity_domain: String,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub submission_deadline: Option<DateTime<Utc>>,
    pub admins: Vec<String>,
    pub notice: Option<String>,
}

impl Args {
    /// Translate CLI arguments into the application configuration.
    #[must_use]
    pub fn app_config(&self) -> AppConfig {
        let mut config = AppConfig::new(self.public_url.clone())
            .with_identity_provider_url(self.identity_provider_url.clone())
            .with_identity_domain(self.identity_domain.clone())
            .with_admins(self.admins.clone())
            .with_notice(self.notice.clone());

        if let Some(deadline) = self.registration_deadline {
            config = config.with_registration_deadline(deadline);
        }
        if let Some(deadline) = self.submission_deadline {
            config = config.with_submission_deadline(deadline);
        }

        config
    }
}

/// Connect the store and identity client, then serve until shutdown.
///
/// # Errors
/// Returns an error if any dependency fails to initialize or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.app_config();

    let store = store::connect(&args.dsn).await?;
    let identity =
        Arc::new(OpenIdProvider::new().context("Failed to build identity provider client")?);

    info!(
        public_url = %config.public_url(),
        admins = config.admins().len(),
        "Configuration loaded"
    );

    let state = AppState::new(config, store, identity, &args.session_secret)?;

    api::new(args.port, Arc::new(state)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn args() -> Args {
        Args {
            port: 8080,
            dsn: "memory://".to_string(),
            session_secret: SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
            public_url: Url::parse("https://regdesk.test/").unwrap_or_else(|_| unreachable!()),
            identity_provider_url: "https://id.example.org/".to_string(),
            identity_domain: "id.example.org".to_string(),
            registration_deadline: None,
            submission_deadline: None,
            admins: vec!["alice".to_string()],
            notice: None,
        }
    }

    #[test]
    fn app_config_applies_deadlines() {
        let deadline = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).single();
        let mut args = args();
        args.registration_deadline = deadline;

        let config = args.app_config();
        let Some(deadline) = deadline else {
            panic!("valid timestamp");
        };
        assert!(config.registration_open(deadline));
        assert!(!config.registration_open(deadline + chrono::Duration::seconds(1)));
        assert!(config.submission_open(deadline + chrono::Duration::days(365)));
        assert!(config.is_admin(Some("alice")));
        assert_eq!(config.identity_domain(), "id.example.org");
    }
}
