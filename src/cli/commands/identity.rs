use clap::{Arg, Command};

pub const ARG_PUBLIC_URL: &str = "public-url";
pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_IDENTITY_PROVIDER_URL: &str = "identity-provider-url";
pub const ARG_IDENTITY_DOMAIN: &str = "identity-domain";

pub const DEFAULT_IDENTITY_PROVIDER_URL: &str = "https://id.fedoraproject.org/";
pub const DEFAULT_IDENTITY_DOMAIN: &str = "id.fedoraproject.org";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PUBLIC_URL)
                .long(ARG_PUBLIC_URL)
                .help("Externally visible base URL, used as OpenID realm and return address")
                .env("REGDESK_PUBLIC_URL")
                .default_value("http://localhost:8080/"),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("Secret used to encrypt session cookies (at least 32 bytes)")
                .env("REGDESK_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_IDENTITY_PROVIDER_URL)
                .long(ARG_IDENTITY_PROVIDER_URL)
                .help("OpenID provider used by the one-click login button")
                .env("REGDESK_IDENTITY_PROVIDER_URL")
                .default_value(DEFAULT_IDENTITY_PROVIDER_URL),
        )
        .arg(
            Arg::new(ARG_IDENTITY_DOMAIN)
                .long(ARG_IDENTITY_DOMAIN)
                .help("Domain whose identities map to short usernames")
                .env("REGDESK_IDENTITY_DOMAIN")
                .default_value(DEFAULT_IDENTITY_DOMAIN),
        )
}
