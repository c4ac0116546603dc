use thiserror::Error;

/// Failures of the per-attempt [`Session`](super::Session) value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("an auth URL has not been set on the session")]
    MissingAuthUrl,
    #[error("session cannot be encoded: {0}")]
    Serialization(String),
    #[error("session cannot be decoded: {0}")]
    Deserialization(String),
    #[error("session is already authorized")]
    AlreadyAuthorized,
}

/// Failures surfaced by an upstream identity provider.
///
/// None of these are retried: a consumed authorization code cannot be replayed
/// and the user restarts the login from the beginning.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider}: authorization code exchange failed: {detail}")]
    TokenExchange { provider: String, detail: String },

    #[error("{provider}: user profile fetch failed: {detail}")]
    ProfileFetch { provider: String, detail: String },

    /// The upstream account exists but lacks the organizational identifier
    /// that becomes the Hydra subject.
    #[error("{provider}: user's {field} is not configured upstream")]
    MissingIdentifier {
        provider: String,
        field: &'static str,
    },

    #[error("{provider}: upstream unavailable: {detail}")]
    UpstreamUnavailable { provider: String, detail: String },

    #[error("{provider} does not support {operation}")]
    UnsupportedOperation {
        provider: String,
        operation: &'static str,
    },

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ProviderError {
    /// Message safe to show to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingIdentifier { provider, field } => format!(
                "Your {provider} account has no organizational ID ({field}) configured. \
                 Ask your administrator to fill it in, then sign in again."
            ),
            _ => "Authentication failed, please sign in again.".to_string(),
        }
    }
}
