//! Hydra login/consent controller.
//!
//! Each method handles one inbound request and either redirects the browser
//! further or fails. Nothing is remembered between requests: the login
//! challenge travels upstream as the OAuth2 `state` and the provider
//! [`Session`] rides in a cookie owned by the HTTP layer.

mod error;
pub mod kratos;

pub use error::BridgeError;

use crate::{
    hydra::{AcceptConsent, AcceptLogin, ConsentSession, HydraAdmin},
    provider::{IdentityProvider, ProviderRegistry, Session},
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::form_urlencoded;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Provider used when Hydra asks for a login.
    pub login_provider: String,
    /// Prefix for redirects back into this service. Empty means relative.
    pub public_base_url: String,
    pub consent_remember: bool,
    pub consent_remember_for: i64,
}

impl BridgeConfig {
    /// Whether cookies must carry `Secure`.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.public_base_url.starts_with("https://")
    }

    #[must_use]
    pub fn local_url(&self, path: &str, query: &[(&str, &str)]) -> String {
        let base = self.public_base_url.trim_end_matches('/');
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.extend_pairs(query);
        format!("{base}{path}?{}", serializer.finish())
    }
}

/// Where the browser goes after `/login`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Hydra skipped authentication; follow its `redirect_to`.
    Accepted { redirect_to: String },
    /// Authenticate upstream first.
    Upstream { redirect_to: String },
}

impl LoginOutcome {
    #[must_use]
    pub fn redirect_to(&self) -> &str {
        match self {
            Self::Accepted { redirect_to } | Self::Upstream { redirect_to } => redirect_to,
        }
    }
}

/// Query parameters of the upstream callback.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

fn required<'a>(value: Option<&'a str>, name: &'static str) -> Result<&'a str, BridgeError> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(BridgeError::MissingParameter(name))
}

#[derive(Debug)]
pub struct Bridge {
    hydra: HydraAdmin,
    providers: Arc<ProviderRegistry>,
    config: BridgeConfig,
}

impl Bridge {
    #[must_use]
    pub fn new(hydra: HydraAdmin, providers: Arc<ProviderRegistry>, config: BridgeConfig) -> Self {
        Self {
            hydra,
            providers,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    #[must_use]
    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Decide between skipping authentication and sending the user upstream.
    ///
    /// # Errors
    /// [`BridgeError::ChallengeFetch`] if Hydra does not return the challenge,
    /// [`BridgeError::ChallengeAccept`] if a skipped login cannot be accepted.
    #[instrument(skip(self))]
    pub async fn login(&self, challenge: Option<&str>) -> Result<LoginOutcome, BridgeError> {
        let challenge = required(challenge, "login_challenge")?;

        let request = self
            .hydra
            .get_login_request(challenge)
            .await
            .map_err(BridgeError::ChallengeFetch)?;

        if request.skip {
            debug!(subject = %request.subject, "Hydra skipped authentication");
            let completed = self
                .hydra
                .accept_login_request(
                    challenge,
                    &AcceptLogin {
                        subject: request.subject,
                        context: None,
                    },
                )
                .await
                .map_err(BridgeError::ChallengeAccept)?;
            return Ok(LoginOutcome::Accepted {
                redirect_to: completed.redirect_to,
            });
        }

        let provider = self.providers.get(&self.config.login_provider)?;
        let path = format!("/auth/{}", provider.name());
        Ok(LoginOutcome::Upstream {
            redirect_to: self.config.local_url(&path, &[("state", challenge)]),
        })
    }

    /// Start the upstream leg. The returned session must come back with the
    /// callback.
    ///
    /// # Errors
    /// [`BridgeError::UnknownProvider`] or a provider failure.
    #[instrument(skip(self))]
    pub fn begin(&self, provider: &str, state: Option<&str>) -> Result<Session, BridgeError> {
        let provider = self.providers.get(provider)?;
        let state = required(state, "state")?;
        Ok(provider.begin_authentication(state)?)
    }

    /// Finish the upstream leg and accept the login challenge carried in `state`.
    ///
    /// Returns Hydra's `redirect_to`.
    ///
    /// # Errors
    /// Any failure rejects the attempt; nothing is retried.
    #[instrument(skip(self, session, params))]
    pub async fn callback(
        &self,
        provider: &str,
        session: Option<&str>,
        params: CallbackParams,
    ) -> Result<String, BridgeError> {
        let provider = self.providers.get(provider)?;

        if let Some(error) = params.error {
            return Err(BridgeError::UpstreamDenied {
                error,
                description: params.error_description.unwrap_or_default(),
            });
        }

        let Some(encoded) = session.filter(|s| !s.is_empty()) else {
            return Err(BridgeError::MissingSession(provider.name().to_string()));
        };
        let mut session = provider.unmarshal_session(encoded)?;

        let state = required(params.state.as_deref(), "state")?;
        if session.state().as_deref() != Some(state) {
            return Err(BridgeError::StateMismatch);
        }
        let code = required(params.code.as_deref(), "code")?;

        let identity = provider.complete_authentication(&mut session, code).await?;
        info!(
            provider = %identity.provider,
            subject = %identity.subject,
            "upstream identity resolved"
        );

        let completed = self
            .hydra
            .accept_login_request(
                state,
                &AcceptLogin {
                    subject: identity.subject.clone(),
                    context: Some(identity.login_context()),
                },
            )
            .await
            .map_err(BridgeError::ChallengeAccept)?;

        Ok(completed.redirect_to)
    }

    /// Grant everything the client asked for, with claims from the login context.
    ///
    /// # Errors
    /// [`BridgeError::ChallengeFetch`] or [`BridgeError::ChallengeAccept`].
    #[instrument(skip(self))]
    pub async fn consent(&self, challenge: Option<&str>) -> Result<String, BridgeError> {
        let challenge = required(challenge, "consent_challenge")?;

        let request = self
            .hydra
            .get_consent_request(challenge)
            .await
            .map_err(BridgeError::ChallengeFetch)?;

        let id_token = match request.context {
            Value::Object(claims) if !claims.is_empty() => Some(Value::Object(claims)),
            _ => None,
        };

        let completed = self
            .hydra
            .accept_consent_request(
                challenge,
                &AcceptConsent {
                    grant_scope: request.requested_scope,
                    grant_access_token_audience: request.requested_access_token_audience,
                    remember: self.config.consent_remember,
                    remember_for: Some(self.config.consent_remember_for),
                    session: ConsentSession { id_token },
                },
            )
            .await
            .map_err(BridgeError::ChallengeAccept)?;

        Ok(completed.redirect_to)
    }
}
