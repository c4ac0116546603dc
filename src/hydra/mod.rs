//! Client for the Ory Hydra admin API (login and consent requests).

use reqwest::{Client, Method, Response};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

const LOGIN_REQUEST_PATH: &str = "/oauth2/auth/requests/login";
const LOGIN_ACCEPT_PATH: &str = "/oauth2/auth/requests/login/accept";
const CONSENT_REQUEST_PATH: &str = "/oauth2/auth/requests/consent";
const CONSENT_ACCEPT_PATH: &str = "/oauth2/auth/requests/consent/accept";

#[derive(Debug, Error)]
pub enum HydraError {
    #[error("hydra {operation}: request failed: {source}")]
    Request {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("hydra {operation}: unexpected status {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("hydra {operation}: malformed response: {detail}")]
    Decode {
        operation: &'static str,
        detail: String,
    },
}

// Hydra writes `null` for empty lists.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A pending login request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LoginRequest {
    pub challenge: String,
    /// Hydra already authenticated this subject; the request must be accepted
    /// without asking the user again.
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub subject: String,
}

/// A pending consent request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConsentRequest {
    pub challenge: String,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub subject: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requested_scope: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requested_access_token_audience: Vec<String>,
    /// Whatever the login accept stored in `context`.
    #[serde(default)]
    pub context: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptLogin {
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AcceptConsent {
    pub grant_scope: Vec<String>,
    pub grant_access_token_audience: Vec<String>,
    pub remember: bool,
    /// Seconds; `None` lets Hydra remember indefinitely when `remember` is set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_for: Option<i64>,
    pub session: ConsentSession,
}

/// Claims Hydra copies into issued tokens.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsentSession {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<Value>,
}

/// Answer to an accept call: where Hydra wants the browser next.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletedRequest {
    pub redirect_to: String,
}

#[derive(Debug, Clone)]
pub struct HydraAdmin {
    base_url: Url,
    http: Client,
}

impl HydraAdmin {
    #[must_use]
    pub fn new(base_url: Url, http: Client) -> Self {
        Self { base_url, http }
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        query: (&str, &str),
        body: Option<&B>,
    ) -> Result<T, HydraError> {
        let mut request = self
            .http
            .request(method, self.endpoint(path))
            .query(&[query]);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|source| HydraError::Request { operation, source })?;

        decode(operation, response).await
    }

    /// # Errors
    /// Returns [`HydraError`] if Hydra is unreachable or does not know the challenge.
    #[instrument(skip(self))]
    pub async fn get_login_request(&self, challenge: &str) -> Result<LoginRequest, HydraError> {
        self.call::<(), _>(
            "get login request",
            Method::GET,
            LOGIN_REQUEST_PATH,
            ("login_challenge", challenge),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns [`HydraError`] if Hydra rejects the accept call.
    #[instrument(skip(self, body), fields(subject = %body.subject))]
    pub async fn accept_login_request(
        &self,
        challenge: &str,
        body: &AcceptLogin,
    ) -> Result<CompletedRequest, HydraError> {
        let completed: CompletedRequest = self
            .call(
                "accept login request",
                Method::PUT,
                LOGIN_ACCEPT_PATH,
                ("login_challenge", challenge),
                Some(body),
            )
            .await?;
        debug!(redirect_to = %completed.redirect_to, "login request accepted");
        Ok(completed)
    }

    /// # Errors
    /// Returns [`HydraError`] if Hydra is unreachable or does not know the challenge.
    #[instrument(skip(self))]
    pub async fn get_consent_request(
        &self,
        challenge: &str,
    ) -> Result<ConsentRequest, HydraError> {
        self.call::<(), _>(
            "get consent request",
            Method::GET,
            CONSENT_REQUEST_PATH,
            ("consent_challenge", challenge),
            None,
        )
        .await
    }

    /// # Errors
    /// Returns [`HydraError`] if Hydra rejects the accept call.
    #[instrument(skip(self, body))]
    pub async fn accept_consent_request(
        &self,
        challenge: &str,
        body: &AcceptConsent,
    ) -> Result<CompletedRequest, HydraError> {
        let completed: CompletedRequest = self
            .call(
                "accept consent request",
                Method::PUT,
                CONSENT_ACCEPT_PATH,
                ("consent_challenge", challenge),
                Some(body),
            )
            .await?;
        debug!(redirect_to = %completed.redirect_to, "consent request accepted");
        Ok(completed)
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> Result<T, HydraError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(HydraError::Status {
            operation,
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|source| HydraError::Request { operation, source })?;
    serde_json::from_slice(&bytes).map_err(|e| HydraError::Decode {
        operation,
        detail: e.to_string(),
    })
}
