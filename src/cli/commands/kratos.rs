use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use url::Url;

pub const ARG_KRATOS_URL: &str = "kratos-url";
pub const ARG_KRATOS_LOGIN_URL: &str = "kratos-login-url";

#[derive(Debug, Clone)]
pub struct Options {
    /// Enables the `/kratos` routes when set.
    pub url: Option<Url>,
    pub login_url: String,
}

impl Options {
    /// Parse Kratos arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the Kratos URL is invalid.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let url = matches
            .get_one::<String>(ARG_KRATOS_URL)
            .filter(|v| !v.trim().is_empty())
            .map(|v| Url::parse(v).with_context(|| format!("invalid --{ARG_KRATOS_URL}: {v}")))
            .transpose()?;

        Ok(Self {
            url,
            login_url: matches
                .get_one::<String>(ARG_KRATOS_LOGIN_URL)
                .cloned()
                .unwrap_or_default(),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_KRATOS_URL)
                .long(ARG_KRATOS_URL)
                .help("Kratos public API URL; enables the /kratos login bridge")
                .env("KRATOS_ADMIN_URL"),
        )
        .arg(
            Arg::new(ARG_KRATOS_LOGIN_URL)
                .long(ARG_KRATOS_LOGIN_URL)
                .help("Kratos browser login flow the user is sent to")
                .env("KRATOS_LOGIN_URL")
                .default_value("/kratos/self-service/login/browser"),
        )
}
