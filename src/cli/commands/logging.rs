use clap::{Arg, ArgAction, ArgMatches, Command, builder::ValueParser};
use tracing::Level;

pub const ARG_VERBOSITY: &str = "verbosity";

/// Names accepted by `OIDC_ADAPTER_LOG_LEVEL`, indexed by verbosity count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Accept a level name or its verbosity count so the env var and `-vvv`
/// land on the same number.
fn parse_level() -> ValueParser {
    ValueParser::from(|raw: &str| -> Result<u8, String> {
        let raw = raw.trim().to_ascii_lowercase();
        LEVEL_NAMES
            .iter()
            .position(|name| *name == raw)
            .and_then(|index| u8::try_from(index).ok())
            .or_else(|| raw.parse::<u8>().ok().filter(|count| *count <= 5))
            .ok_or_else(|| format!("expected one of {}", LEVEL_NAMES.join(", ")))
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Log more, repeat for more detail (-vv is INFO); default ERROR")
            .env("OIDC_ADAPTER_LOG_LEVEL")
            .global(true)
            .action(ArgAction::Count)
            .value_parser(parse_level()),
    )
}

/// Level requested on the command line, `None` keeps the ERROR default.
#[must_use]
pub fn level(matches: &ArgMatches) -> Option<Level> {
    match matches.get_one::<u8>(ARG_VERBOSITY).copied().unwrap_or(0) {
        0 => None,
        1 => Some(Level::WARN),
        2 => Some(Level::INFO),
        3 => Some(Level::DEBUG),
        _ => Some(Level::TRACE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_from(args: &[&str]) -> ArgMatches {
        with_args(Command::new("logging")).get_matches_from(args)
    }

    #[test]
    fn count_maps_to_level() {
        temp_env::with_var_unset("OIDC_ADAPTER_LOG_LEVEL", || {
            assert_eq!(level(&matches_from(&["logging"])), None);
            assert_eq!(level(&matches_from(&["logging", "-v"])), Some(Level::WARN));
            assert_eq!(level(&matches_from(&["logging", "-vvv"])), Some(Level::DEBUG));
            assert_eq!(
                level(&matches_from(&["logging", "-vvvvvv"])),
                Some(Level::TRACE)
            );
        });
    }

    #[test]
    fn env_accepts_names_in_any_case() {
        temp_env::with_var("OIDC_ADAPTER_LOG_LEVEL", Some("Info"), || {
            assert_eq!(level(&matches_from(&["logging"])), Some(Level::INFO));
        });
    }

    #[test]
    fn env_rejects_unknown_names() {
        temp_env::with_var("OIDC_ADAPTER_LOG_LEVEL", Some("verbose"), || {
            let result = with_args(Command::new("logging")).try_get_matches_from(["logging"]);
            assert!(result.is_err());
        });
    }
}
