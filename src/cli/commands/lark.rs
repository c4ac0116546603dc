use crate::provider::lark::{DEFAULT_BASE_URL, PROVIDER_NAME};
use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;
use url::Url;

pub const ARG_LARK_APP_ID: &str = "lark-app-id";
pub const ARG_LARK_APP_SECRET: &str = "lark-app-secret";
pub const ARG_LARK_CALLBACK_URL: &str = "lark-callback-url";
pub const ARG_LARK_BASE_URL: &str = "lark-base-url";
pub const ARG_LOGIN_PROVIDER: &str = "login-provider";

#[derive(Debug, Clone)]
pub struct Options {
    pub app_id: String,
    pub app_secret: SecretString,
    pub callback_url: Url,
    pub base_url: Url,
    pub login_provider: String,
}

impl Options {
    /// Parse Lark arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing or URLs are invalid.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let read_required = |id: &str| -> anyhow::Result<String> {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required argument: --{id}"))
        };
        let read_url = |id: &str| -> anyhow::Result<Url> {
            let value = read_required(id)?;
            Url::parse(&value).with_context(|| format!("invalid --{id}: {value}"))
        };

        Ok(Self {
            app_id: read_required(ARG_LARK_APP_ID)?,
            app_secret: SecretString::from(read_required(ARG_LARK_APP_SECRET)?),
            callback_url: read_url(ARG_LARK_CALLBACK_URL)?,
            base_url: read_url(ARG_LARK_BASE_URL)?,
            login_provider: read_required(ARG_LOGIN_PROVIDER)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LARK_APP_ID)
                .long(ARG_LARK_APP_ID)
                .help("Lark application id")
                .env("LARK_APP_ID")
                .required(true),
        )
        .arg(
            Arg::new(ARG_LARK_APP_SECRET)
                .long(ARG_LARK_APP_SECRET)
                .help("Lark application secret")
                .env("LARK_APP_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_LARK_CALLBACK_URL)
                .long(ARG_LARK_CALLBACK_URL)
                .help("Redirect URI registered with Lark, example: https://sso.tld/auth/lark/callback")
                .env("LARK_OAUTH_CALLBACK_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_LARK_BASE_URL)
                .long(ARG_LARK_BASE_URL)
                .help("Lark open platform base URL")
                .env("LARK_BASE_URL")
                .default_value(DEFAULT_BASE_URL),
        )
        .arg(
            Arg::new(ARG_LOGIN_PROVIDER)
                .long(ARG_LOGIN_PROVIDER)
                .help("Provider users are sent to when Hydra asks for a login")
                .env("OIDC_ADAPTER_LOGIN_PROVIDER")
                .default_value(PROVIDER_NAME),
        )
}
