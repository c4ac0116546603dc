use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use url::Url;

pub const ARG_HYDRA_ADMIN_URL: &str = "hydra-admin-url";
pub const ARG_CONSENT_REMEMBER: &str = "consent-remember";
pub const ARG_CONSENT_REMEMBER_FOR: &str = "consent-remember-for";

#[derive(Debug, Clone)]
pub struct Options {
    pub admin_url: Url,
    pub consent_remember: bool,
    pub consent_remember_for: i64,
}

impl Options {
    /// Parse Hydra arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the admin URL is missing or invalid.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let admin_url = matches
            .get_one::<String>(ARG_HYDRA_ADMIN_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_HYDRA_ADMIN_URL}"))?;
        let admin_url = Url::parse(admin_url)
            .with_context(|| format!("invalid --{ARG_HYDRA_ADMIN_URL}: {admin_url}"))?;

        Ok(Self {
            admin_url,
            consent_remember: matches
                .get_one::<bool>(ARG_CONSENT_REMEMBER)
                .copied()
                .unwrap_or(true),
            consent_remember_for: matches
                .get_one::<i64>(ARG_CONSENT_REMEMBER_FOR)
                .copied()
                .unwrap_or(600),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_HYDRA_ADMIN_URL)
                .long(ARG_HYDRA_ADMIN_URL)
                .help("Hydra admin API base URL, example: http://hydra:4445")
                .env("HYDRA_ADMIN_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_CONSENT_REMEMBER)
                .long(ARG_CONSENT_REMEMBER)
                .help("Ask Hydra to remember granted consent")
                .env("OIDC_ADAPTER_CONSENT_REMEMBER")
                .default_value("true")
                .value_parser(clap::value_parser!(bool)),
        )
        .arg(
            Arg::new(ARG_CONSENT_REMEMBER_FOR)
                .long(ARG_CONSENT_REMEMBER_FOR)
                .help("Seconds Hydra remembers granted consent")
                .env("OIDC_ADAPTER_CONSENT_REMEMBER_FOR")
                .default_value("600")
                .value_parser(clap::value_parser!(i64).range(0..)),
        )
}
