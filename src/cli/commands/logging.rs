use clap::{builder::ValueParser, Arg, ArgAction, ArgMatches, Command};

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_LEVEL: &str = "log-level";
pub const ARG_LOG_FILE: &str = "log-file";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Increase verbosity, repeat for more (-v WARN, -vv INFO, -vvv DEBUG)")
                .global(true)
                .action(ArgAction::Count),
        )
        .arg(
            Arg::new(ARG_LOG_LEVEL)
                .long(ARG_LOG_LEVEL)
                .help("Log level: ERROR, WARN, INFO, DEBUG, TRACE or 0-5; overrides -v")
                .env("REGDESK_LOG_LEVEL")
                .global(true)
                .action(ArgAction::Set)
                .value_parser(validator_log_level()),
        )
        .arg(
            Arg::new(ARG_LOG_FILE)
                .long(ARG_LOG_FILE)
                .help("Also write JSON formatted logs to this file")
                .env("REGDESK_LOG_FILE"),
        )
}

/// The effective verbosity: an explicit level wins over the `-v` count.
#[must_use]
pub fn verbosity(matches: &ArgMatches) -> u8 {
    matches
        .get_one::<u8>(ARG_LOG_LEVEL)
        .copied()
        .or_else(|| matches.get_one::<u8>(ARG_VERBOSITY).copied())
        .unwrap_or(0)
}
