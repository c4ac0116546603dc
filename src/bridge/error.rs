use crate::{
    hydra::HydraError,
    kratos::KratosError,
    provider::{ProviderError, RegistryError},
};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

/// Why a login or consent request was rejected.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to fetch challenge: {0}")]
    ChallengeFetch(#[source] HydraError),

    #[error("failed to accept challenge: {0}")]
    ChallengeAccept(#[source] HydraError),

    #[error(transparent)]
    UnknownProvider(#[from] RegistryError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Identity(#[from] KratosError),

    #[error("missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error("no authentication session cookie for provider {0}")]
    MissingSession(String),

    #[error("state parameter does not match the authentication session")]
    StateMismatch,

    #[error("upstream denied the authorization: {error}: {description}")]
    UpstreamDenied { error: String, description: String },
}

impl BridgeError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnknownProvider(_) => StatusCode::NOT_FOUND,
            Self::MissingParameter(_)
            | Self::MissingSession(_)
            | Self::StateMismatch
            | Self::UpstreamDenied { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the browser. Upstream and Hydra details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Provider(err @ ProviderError::MissingIdentifier { .. }) => err.user_message(),
            Self::UnknownProvider(err) => err.to_string(),
            Self::MissingParameter(_) | Self::MissingSession(_) | Self::StateMismatch => {
                format!("{self}, please sign in again.")
            }
            Self::UpstreamDenied { .. } => "Sign-in was cancelled or denied upstream.".to_string(),
            _ => "Authentication failed, please sign in again.".to_string(),
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Login bridge failure: {self}");
        } else {
            warn!("Login bridge rejected request: {self}");
        }
        (status, self.public_message()).into_response()
    }
}
