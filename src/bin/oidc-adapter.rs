use anyhow::Result;
use oidc_adapter::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::start()?.execute().await
}
