use crate::{
    api,
    bridge::{Bridge, BridgeConfig, kratos::KratosBridge},
    cli::{
        commands::{hydra, kratos, lark},
        telemetry,
    },
    hydra::HydraAdmin,
    kratos::KratosClient,
    provider::{LarkConfig, LarkProvider, ProviderRegistry},
};
use anyhow::{Context, Result, bail};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub public_base_url: String,
    pub http_timeout_seconds: u64,
    pub hydra: hydra::Options,
    pub lark: lark::Options,
    pub kratos: kratos::Options,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is inconsistent or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let http = reqwest::Client::builder()
        .user_agent(crate::APP_USER_AGENT)
        .timeout(Duration::from_secs(args.http_timeout_seconds))
        .build()
        .context("Failed to build HTTP client")?;

    let registry = build_registry(&args.lark, &http)?;
    debug!(
        "Registered providers: {}",
        registry.names().collect::<Vec<_>>().join(", ")
    );

    let config = BridgeConfig {
        login_provider: args.lark.login_provider.clone(),
        public_base_url: args.public_base_url.clone(),
        consent_remember: args.hydra.consent_remember,
        consent_remember_for: args.hydra.consent_remember_for,
    };
    let hydra = HydraAdmin::new(args.hydra.admin_url.clone(), http.clone());

    let kratos = args.kratos.url.clone().map(|url| {
        Arc::new(KratosBridge::new(
            hydra.clone(),
            KratosClient::new(url, http.clone()),
            args.kratos.login_url.clone(),
            config.clone(),
        ))
    });
    let bridge = Arc::new(Bridge::new(hydra, Arc::new(registry), config));

    let result = api::new(args.port, api::app(bridge, kratos)).await;

    telemetry::shutdown_tracer();

    result
}

fn build_registry(lark: &lark::Options, http: &reqwest::Client) -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    let config = LarkConfig::new(
        lark.app_id.clone(),
        lark.app_secret.clone(),
        lark.callback_url.clone(),
    )
    .with_base_url(lark.base_url.clone());
    registry.register(LarkProvider::new(config, http.clone()))?;

    if !registry.contains(&lark.login_provider) {
        bail!(
            "login provider '{}' is not registered (available: {})",
            lark.login_provider,
            registry.names().collect::<Vec<_>>().join(", ")
        );
    }

    Ok(registry)
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "public_base_url",
            if args.public_base_url.is_empty() {
                "(relative)".to_string()
            } else {
                args.public_base_url.clone()
            },
        ),
        ("http_timeout_seconds", args.http_timeout_seconds.to_string()),
        ("hydra_admin_url", args.hydra.admin_url.to_string()),
        ("consent_remember", args.hydra.consent_remember.to_string()),
        (
            "consent_remember_for",
            args.hydra.consent_remember_for.to_string(),
        ),
        ("login_provider", args.lark.login_provider.clone()),
        ("lark_app_id", args.lark.app_id.clone()),
        ("lark_app_secret", "REDACTED".to_string()),
        ("lark_callback_url", args.lark.callback_url.to_string()),
        ("lark_base_url", args.lark.base_url.to_string()),
        (
            "kratos_url",
            args.kratos
                .url
                .as_ref()
                .map_or_else(|| "disabled".to_string(), ToString::to_string),
        ),
    ];
    info!("{}", render_entries("Startup configuration", &entries));
}

fn render_entries(title: &str, entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\n{title}:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        crate::short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}
