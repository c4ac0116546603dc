//! Write the OpenAPI document of the HTTP surface to stdout.

use anyhow::{Context, Result};
use std::io::{Write, stdout};

fn main() -> Result<()> {
    let json = serde_json::to_string_pretty(&oidc_adapter::api::openapi())
        .context("Failed to serialize OpenAPI document")?;

    let mut out = stdout().lock();
    writeln!(out, "{json}").context("Failed to write OpenAPI document")?;
    Ok(())
}
