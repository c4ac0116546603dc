pub mod hydra;
pub mod kratos;
pub mod lark;
pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_PORT: &str = "port";
pub const ARG_PUBLIC_BASE_URL: &str = "public-base-url";
pub const ARG_HTTP_TIMEOUT_SECONDS: &str = "http-timeout-seconds";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("oidc-adapter")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("OIDC_ADAPTER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_PUBLIC_BASE_URL)
                .long(ARG_PUBLIC_BASE_URL)
                .help("Public URL of this service, used for redirects back into it")
                .long_help(
                    "Public URL of this service, used for redirects back into it. When empty, redirects are relative to the current host.",
                )
                .env("OIDC_ADAPTER_PUBLIC_BASE_URL")
                .default_value(""),
        )
        .arg(
            Arg::new(ARG_HTTP_TIMEOUT_SECONDS)
                .long(ARG_HTTP_TIMEOUT_SECONDS)
                .help("Timeout for calls to Hydra, Kratos and upstream providers")
                .env("OIDC_ADAPTER_HTTP_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        );

    let command = hydra::with_args(command);
    let command = lark::with_args(command);
    let command = kratos::with_args(command);
    logging::with_args(command)
}
