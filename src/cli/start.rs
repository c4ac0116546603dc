use crate::cli::{
    actions::Action,
    commands::{self, logging},
    dispatch, telemetry,
};
use anyhow::Result;

/// Parse the command line, install logging, and return the action to run.
///
/// # Errors
/// Returns an error if telemetry cannot be installed or the arguments are
/// inconsistent.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    telemetry::init(logging::level(&matches))?;

    dispatch::handler(&matches)
}
