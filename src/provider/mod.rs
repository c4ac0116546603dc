//! Upstream identity providers.
//!
//! Every upstream implements [`IdentityProvider`]. The set of upstreams is
//! closed: [`Provider`] has one variant per implementation and forwards each
//! call to it, so the registry stores plain values and dispatch is static.

mod error;
mod identity;
pub mod lark;
mod registry;
mod session;

pub use error::{ProviderError, SessionError};
pub use identity::ResolvedIdentity;
pub use lark::{LarkConfig, LarkProvider};
pub use registry::{ProviderRegistry, RegistryError};
pub use session::{SESSION_SCHEMA_VERSION, Session};

use secrecy::SecretString;
use std::future::Future;

/// Capabilities of an upstream identity provider.
///
/// The authorization-code grant spans two HTTP requests with a browser
/// redirect in between, so authentication is split into a begin and a
/// complete call. Only the encoded [`Session`] crosses the gap.
pub trait IdentityProvider: Send + Sync {
    /// Registry key, also reported as [`ResolvedIdentity::provider`].
    fn name(&self) -> &str;

    /// Build the upstream authorization URL for `state`.
    ///
    /// `state` must appear verbatim in the returned session's URL.
    ///
    /// # Errors
    /// Returns [`ProviderError::UpstreamUnavailable`] if the URL cannot be built.
    fn begin_authentication(&self, state: &str) -> Result<Session, ProviderError>;

    /// Exchange `code` for a token and resolve the user's identity.
    fn complete_authentication(
        &self,
        session: &mut Session,
        code: &str,
    ) -> impl Future<Output = Result<ResolvedIdentity, ProviderError>> + Send;

    /// Decode a session produced by this provider's begin leg.
    ///
    /// # Errors
    /// Returns [`ProviderError::Session`] on malformed input.
    fn unmarshal_session(&self, data: &str) -> Result<Session, ProviderError> {
        Ok(Session::unmarshal(data)?)
    }

    fn refresh_token_available(&self) -> bool;

    /// Trade a refresh token for a new access token. Providers without
    /// refresh support fail with [`ProviderError::UnsupportedOperation`].
    fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> impl Future<Output = Result<SecretString, ProviderError>> + Send;
}

/// All upstreams this service can drive.
#[derive(Debug)]
pub enum Provider {
    Lark(LarkProvider),
}

impl IdentityProvider for Provider {
    fn name(&self) -> &str {
        match self {
            Self::Lark(provider) => provider.name(),
        }
    }

    fn begin_authentication(&self, state: &str) -> Result<Session, ProviderError> {
        match self {
            Self::Lark(provider) => provider.begin_authentication(state),
        }
    }

    async fn complete_authentication(
        &self,
        session: &mut Session,
        code: &str,
    ) -> Result<ResolvedIdentity, ProviderError> {
        match self {
            Self::Lark(provider) => provider.complete_authentication(session, code).await,
        }
    }

    fn refresh_token_available(&self) -> bool {
        match self {
            Self::Lark(provider) => provider.refresh_token_available(),
        }
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<SecretString, ProviderError> {
        match self {
            Self::Lark(provider) => provider.refresh_token(refresh_token).await,
        }
    }
}

impl From<LarkProvider> for Provider {
    fn from(provider: LarkProvider) -> Self {
        Self::Lark(provider)
    }
}
