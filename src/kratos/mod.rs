//! Minimal Ory Kratos client: resolve the browser's identity session.

use reqwest::{Client, StatusCode, header::COOKIE};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::instrument;
use url::Url;

const WHOAMI_PATH: &str = "/sessions/whoami";

#[derive(Debug, Error)]
pub enum KratosError {
    #[error("kratos whoami failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("no active identity session")]
    NoSession,
    #[error("kratos whoami returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("kratos whoami returned a malformed session: {0}")]
    Decode(String),
    #[error("identity traits cannot be decoded: {0}")]
    Traits(String),
}

/// Identity traits the bridge relies on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Traits {
    /// Campus network id, used as the Hydra subject.
    pub netid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Traits {
    /// Claims placed in the ID token at consent.
    #[must_use]
    pub fn id_token_claims(&self) -> Value {
        json!({
            "netid": self.netid,
            "name": self.name,
            "given_name": self.name,
            "email": self.email,
        })
    }
}

#[derive(Deserialize)]
struct WhoamiSession {
    #[serde(default = "default_active")]
    active: bool,
    identity: WhoamiIdentity,
}

#[derive(Deserialize)]
struct WhoamiIdentity {
    #[serde(default)]
    traits: Value,
}

fn default_active() -> bool {
    true
}

/// Decode the `netid`, `name` and `email` traits, requiring a non-empty `netid`.
///
/// # Errors
/// Returns [`KratosError::Traits`] if the traits do not match.
pub fn decode_traits(traits: Value) -> Result<Traits, KratosError> {
    let traits: Traits =
        serde_json::from_value(traits).map_err(|e| KratosError::Traits(e.to_string()))?;
    if traits.netid.trim().is_empty() {
        return Err(KratosError::Traits("netid is empty".to_string()));
    }
    Ok(traits)
}

#[derive(Debug, Clone)]
pub struct KratosClient {
    base_url: Url,
    http: Client,
}

impl KratosClient {
    #[must_use]
    pub fn new(base_url: Url, http: Client) -> Self {
        Self { base_url, http }
    }

    /// Resolve the session identified by the browser's cookies.
    ///
    /// # Errors
    /// Returns [`KratosError::NoSession`] when Kratos does not recognise the
    /// cookies, other variants on transport or decode failures.
    #[instrument(skip_all)]
    pub async fn whoami(&self, cookie: Option<&str>) -> Result<Traits, KratosError> {
        let Some(cookie) = cookie.filter(|c| !c.is_empty()) else {
            return Err(KratosError::NoSession);
        };

        let response = self
            .http
            .get(format!(
                "{}{WHOAMI_PATH}",
                self.base_url.as_str().trim_end_matches('/')
            ))
            .header(COOKIE, cookie)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(KratosError::NoSession);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KratosError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let session: WhoamiSession =
            serde_json::from_slice(&bytes).map_err(|e| KratosError::Decode(e.to_string()))?;
        if !session.active {
            return Err(KratosError::NoSession);
        }

        decode_traits(session.identity.traits)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn traits_require_netid() {
        assert!(matches!(
            decode_traits(json!({"name": "Alice"})),
            Err(KratosError::Traits(_))
        ));
        assert!(matches!(
            decode_traits(json!({"netid": " "})),
            Err(KratosError::Traits(_))
        ));
        assert!(matches!(
            decode_traits(json!({"netid": 42})),
            Err(KratosError::Traits(_))
        ));
    }

    #[test]
    fn id_token_claims_mirror_name() {
        let traits = decode_traits(json!({
            "netid": "alice",
            "name": "Alice",
            "email": "alice@example.com",
            "extra": true
        }))
        .unwrap();
        assert_eq!(
            traits.id_token_claims(),
            json!({
                "netid": "alice",
                "name": "Alice",
                "given_name": "Alice",
                "email": "alice@example.com"
            })
        );
    }

    #[tokio::test]
    async fn whoami_forwards_cookie() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WHOAMI_PATH))
            .and(header("cookie", "ory_kratos_session=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "s1",
                "active": true,
                "identity": {"id": "i1", "traits": {"netid": "alice", "name": "Alice"}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let kratos = KratosClient::new(server.uri().parse().unwrap(), Client::new());
        let traits = kratos
            .whoami(Some("ory_kratos_session=abc"))
            .await
            .unwrap();
        assert_eq!(traits.netid, "alice");
        assert_eq!(traits.email, "");
    }

    #[tokio::test]
    async fn unauthorized_means_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WHOAMI_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let kratos = KratosClient::new(server.uri().parse().unwrap(), Client::new());
        assert!(matches!(
            kratos.whoami(Some("x=y")).await,
            Err(KratosError::NoSession)
        ));
    }

    #[tokio::test]
    async fn malformed_session_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(WHOAMI_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let kratos = KratosClient::new(server.uri().parse().unwrap(), Client::new());
        assert!(matches!(
            kratos.whoami(Some("x=y")).await,
            Err(KratosError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn missing_cookie_skips_the_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let kratos = KratosClient::new(server.uri().parse().unwrap(), Client::new());
        assert!(matches!(
            kratos.whoami(None).await,
            Err(KratosError::NoSession)
        ));
    }
}
