//! What the binary does once arguments are validated.

pub mod server;

use anyhow::Result;

#[derive(Debug)]
pub enum Action {
    /// Serve the login and consent endpoints.
    Server(server::Args),
}

impl Action {
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> Result<()> {
        match self {
            Self::Server(args) => server::execute(args).await,
        }
    }
}
