//! Map validated CLI arguments to the action to run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{
    ARG_HTTP_TIMEOUT_SECONDS, ARG_PORT, ARG_PUBLIC_BASE_URL, hydra, kratos, lark,
};
use anyhow::{Context, Result};
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let http_timeout_seconds = matches
        .get_one::<u64>(ARG_HTTP_TIMEOUT_SECONDS)
        .copied()
        .unwrap_or(10);

    let public_base_url = matches
        .get_one::<String>(ARG_PUBLIC_BASE_URL)
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .unwrap_or_default();
    if !public_base_url.is_empty() {
        Url::parse(&public_base_url)
            .with_context(|| format!("invalid --{ARG_PUBLIC_BASE_URL}: {public_base_url}"))?;
    }

    Ok(Action::Server(Args {
        port,
        public_base_url,
        http_timeout_seconds,
        hydra: hydra::Options::parse(matches)?,
        lark: lark::Options::parse(matches)?,
        kratos: kratos::Options::parse(matches)?,
    }))
}
