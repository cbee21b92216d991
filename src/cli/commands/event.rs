use chrono::{DateTime, Utc};
use clap::{builder::ValueParser, Arg, Command};

pub const ARG_REGISTRATION_DEADLINE: &str = "registration-deadline";
pub const ARG_SUBMISSION_DEADLINE: &str = "submission-deadline";
pub const ARG_ADMINS: &str = "admins";
pub const ARG_NOTICE: &str = "notice";

/// RFC 3339 timestamp, normalized to UTC.
#[must_use]
pub fn validator_deadline() -> ValueParser {
    ValueParser::from(move |value: &str| -> std::result::Result<DateTime<Utc>, String> {
        DateTime::parse_from_rfc3339(value)
            .map(|deadline| deadline.with_timezone(&Utc))
            .map_err(|err| format!("expected an RFC 3339 timestamp: {err}"))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_REGISTRATION_DEADLINE)
                .long(ARG_REGISTRATION_DEADLINE)
                .help("Last moment registrations are accepted, e.g. 2025-06-01T00:00:00Z")
                .env("REGDESK_REGISTRATION_DEADLINE")
                .value_parser(validator_deadline()),
        )
        .arg(
            Arg::new(ARG_SUBMISSION_DEADLINE)
                .long(ARG_SUBMISSION_DEADLINE)
                .help("Moment talk proposal submission closes")
                .env("REGDESK_SUBMISSION_DEADLINE")
                .value_parser(validator_deadline()),
        )
        .arg(
            Arg::new(ARG_ADMINS)
                .long(ARG_ADMINS)
                .help("Comma separated short usernames allowed to moderate proposals")
                .env("REGDESK_ADMINS")
                .default_value(""),
        )
        .arg(
            Arg::new(ARG_NOTICE)
                .long(ARG_NOTICE)
                .help("Notice shown on the front page")
                .env("REGDESK_NOTICE"),
        )
}

/// Split the admin list, dropping blanks.
#[must_use]
pub fn parse_admins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn deadline_is_converted_to_utc() {
        let matches = with_args(Command::new("test")).try_get_matches_from(vec![
            "test",
            "--registration-deadline",
            "2025-06-01T02:00:00+02:00",
        ]);
        let deadline = matches
            .ok()
            .and_then(|m| m.get_one::<DateTime<Utc>>(ARG_REGISTRATION_DEADLINE).copied());
        assert_eq!(deadline, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).single());
    }

    #[test]
    fn malformed_deadline_is_rejected() {
        let result = with_args(Command::new("test")).try_get_matches_from(vec![
            "test",
            "--submission-deadline",
            "next tuesday",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn admins_are_trimmed_and_blank_entries_dropped() {
        assert_eq!(
            parse_admins(" alice, bob ,,carol,"),
            vec!["alice".to_string(), "bob".to_string(), "carol".to_string()]
        );
        assert!(parse_admins("").is_empty());
    }
}
