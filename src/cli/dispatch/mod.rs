//! Map validated CLI arguments to the action the binary runs.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{event, identity, ARG_DSN, ARG_PORT};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use url::Url;

/// Build the server action from parsed matches.
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let session_secret = matches
        .get_one::<String>(identity::ARG_SESSION_SECRET)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --session-secret")?;

    let public_url = matches
        .get_one::<String>(identity::ARG_PUBLIC_URL)
        .context("missing required argument: --public-url")?;
    let public_url =
        Url::parse(public_url).with_context(|| format!("invalid public URL: {public_url}"))?;

    let identity_provider_url = matches
        .get_one::<String>(identity::ARG_IDENTITY_PROVIDER_URL)
        .cloned()
        .unwrap_or_else(|| identity::DEFAULT_IDENTITY_PROVIDER_URL.to_string());
    let identity_domain = matches
        .get_one::<String>(identity::ARG_IDENTITY_DOMAIN)
        .cloned()
        .unwrap_or_else(|| identity::DEFAULT_IDENTITY_DOMAIN.to_string());

    let admins = matches
        .get_one::<String>(event::ARG_ADMINS)
        .map(|value| event::parse_admins(value))
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        dsn,
        session_secret,
        public_url,
        identity_provider_url,
        identity_domain,
        registration_deadline: matches
            .get_one::<DateTime<Utc>>(event::ARG_REGISTRATION_DEADLINE)
            .copied(),
        submission_deadline: matches
            .get_one::<DateTime<Utc>>(event::ARG_SUBMISSION_DEADLINE)
            .copied(),
        admins,
        notice: matches
            .get_one::<String>(event::ARG_NOTICE)
            .filter(|notice| !notice.trim().is_empty())
            .cloned(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn server_args(extra: &[&str]) -> Result<Args> {
        temp_env::with_vars(
            [
                ("REGDESK_PUBLIC_URL", None::<&str>),
                ("REGDESK_ADMINS", None),
                ("REGDESK_NOTICE", None),
                ("REGDESK_REGISTRATION_DEADLINE", None),
                ("REGDESK_SUBMISSION_DEADLINE", None),
            ],
            || {
                let mut args = vec!["regdesk", "--dsn", "memory://", "--session-secret", SECRET];
                args.extend_from_slice(extra);
                let matches = crate::cli::commands::new().try_get_matches_from(args)?;
                let Action::Server(args) = handler(&matches)?;
                Ok(args)
            },
        )
    }

    #[test]
    fn defaults_produce_open_event() {
        let Ok(args) = server_args(&[]) else {
            panic!("defaults should dispatch");
        };
        assert_eq!(args.port, 8080);
        assert_eq!(args.session_secret.expose_secret(), SECRET);
        assert_eq!(args.public_url.as_str(), "http://localhost:8080/");
        assert!(args.registration_deadline.is_none());
        assert!(args.submission_deadline.is_none());
        assert!(args.admins.is_empty());
        assert!(args.notice.is_none());
    }

    #[test]
    fn admins_and_notice_are_passed_through() {
        let Ok(args) = server_args(&["--admins", "alice, bob", "--notice", "Doors open at 9"])
        else {
            panic!("arguments should dispatch");
        };
        assert_eq!(args.admins, vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(args.notice.as_deref(), Some("Doors open at 9"));
    }

    #[test]
    fn invalid_public_url_is_rejected() {
        let result = server_args(&["--public-url", "not a url"]);
        assert!(result.is_err());
        if let Err(err) = result {
            assert!(err.to_string().contains("invalid public URL"));
        }
    }
}
