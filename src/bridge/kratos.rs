//! Hydra login/consent backed by an Ory Kratos browser session.
//!
//! Kratos runs its own login UI; this bridge only sends the browser there and
//! reads the resulting session back through `whoami`.

use super::{BridgeConfig, BridgeError, required};
use crate::{
    hydra::{AcceptConsent, AcceptLogin, ConsentSession, HydraAdmin},
    kratos::KratosClient,
};
use tracing::{debug, info, instrument};
use url::form_urlencoded;

#[derive(Debug)]
pub struct KratosBridge {
    hydra: HydraAdmin,
    kratos: KratosClient,
    /// Kratos browser login flow, absolute or relative to the public host.
    login_url: String,
    config: BridgeConfig,
}

impl KratosBridge {
    #[must_use]
    pub fn new(
        hydra: HydraAdmin,
        kratos: KratosClient,
        login_url: impl Into<String>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            hydra,
            kratos,
            login_url: login_url.into(),
            config,
        }
    }

    fn login_flow_url(&self, challenge: &str) -> String {
        let return_to = self
            .config
            .local_url("/kratos/callback", &[("login_challenge", challenge)]);
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("return_to", &return_to)
            .finish();
        let separator = if self.login_url.contains('?') { '&' } else { '?' };
        format!("{}{separator}{query}", self.login_url)
    }

    /// # Errors
    /// [`BridgeError::ChallengeFetch`] or [`BridgeError::ChallengeAccept`].
    #[instrument(skip(self))]
    pub async fn login(&self, challenge: Option<&str>) -> Result<String, BridgeError> {
        let challenge = required(challenge, "login_challenge")?;

        let request = self
            .hydra
            .get_login_request(challenge)
            .await
            .map_err(BridgeError::ChallengeFetch)?;

        if !request.skip {
            return Ok(self.login_flow_url(challenge));
        }

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
        Ok(completed.redirect_to)
    }

    /// Accept the login with the `netid` of the browser's Kratos session.
    ///
    /// # Errors
    /// [`BridgeError::Identity`] when there is no usable Kratos session.
    #[instrument(skip(self, cookie))]
    pub async fn callback(
        &self,
        challenge: Option<&str>,
        cookie: Option<&str>,
    ) -> Result<String, BridgeError> {
        let challenge = required(challenge, "login_challenge")?;
        let traits = self.kratos.whoami(cookie).await?;
        info!(subject = %traits.netid, "identity session resolved");

        let completed = self
            .hydra
            .accept_login_request(
                challenge,
                &AcceptLogin {
                    subject: traits.netid,
                    context: None,
                },
            )
            .await
            .map_err(BridgeError::ChallengeAccept)?;
        Ok(completed.redirect_to)
    }

    /// # Errors
    /// Hydra or Kratos failures.
    #[instrument(skip(self, cookie))]
    pub async fn consent(
        &self,
        challenge: Option<&str>,
        cookie: Option<&str>,
    ) -> Result<String, BridgeError> {
        let challenge = required(challenge, "consent_challenge")?;

        let request = self
            .hydra
            .get_consent_request(challenge)
            .await
            .map_err(BridgeError::ChallengeFetch)?;
        let traits = self.kratos.whoami(cookie).await?;

        let completed = self
            .hydra
            .accept_consent_request(
                challenge,
                &AcceptConsent {
                    grant_scope: request.requested_scope,
                    grant_access_token_audience: request.requested_access_token_audience,
                    remember: false,
                    remember_for: None,
                    session: ConsentSession {
                        id_token: Some(traits.id_token_claims()),
                    },
                },
            )
            .await
            .map_err(BridgeError::ChallengeAccept)?;
        Ok(completed.redirect_to)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::kratos::KratosError;
    use reqwest::Client;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bridge(hydra: &MockServer, kratos: &MockServer) -> KratosBridge {
        KratosBridge::new(
            HydraAdmin::new(hydra.uri().parse().unwrap(), Client::new()),
            KratosClient::new(kratos.uri().parse().unwrap(), Client::new()),
            "/kratos/self-service/login/browser",
            BridgeConfig {
                login_provider: "lark".to_string(),
                public_base_url: "https://sso.example.com".to_string(),
                consent_remember: true,
                consent_remember_for: 600,
            },
        )
    }

    #[tokio::test]
    async fn login_sends_browser_to_kratos_with_return_to() {
        let hydra = MockServer::start().await;
        let kratos = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/oauth2/auth/requests/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "challenge": "abc123",
                "skip": false
            })))
            .mount(&hydra)
            .await;

        let redirect = bridge(&hydra, &kratos).login(Some("abc123")).await.unwrap();
        assert_eq!(
            redirect,
            "/kratos/self-service/login/browser?return_to=\
             https%3A%2F%2Fsso.example.com%2Fkratos%2Fcallback%3Flogin_challenge%3Dabc123"
        );
    }

    #[tokio::test]
    async fn callback_accepts_netid() {
        let hydra = MockServer::start().await;
        let kratos = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/whoami"))
            .and(header("cookie", "ory_kratos_session=s"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "active": true,
                "identity": {"traits": {"netid": "alice", "name": "Alice"}}
            })))
            .mount(&kratos)
            .await;
        Mock::given(method("PUT"))
            .and(path("/oauth2/auth/requests/login/accept"))
            .and(query_param("login_challenge", "abc123"))
            .and(body_json(json!({"subject": "alice"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "redirect_to": "https://hydra.test/next"
            })))
            .expect(1)
            .mount(&hydra)
            .await;

        let redirect = bridge(&hydra, &kratos)
            .callback(Some("abc123"), Some("ory_kratos_session=s"))
            .await
            .unwrap();
        assert_eq!(redirect, "https://hydra.test/next");
    }

    #[tokio::test]
    async fn callback_without_netid_never_accepts() {
        let hydra = MockServer::start().await;
        let kratos = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/whoami"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "identity": {"traits": {"name": "Alice"}}
            })))
            .mount(&kratos)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&hydra)
            .await;

        let err = bridge(&hydra, &kratos)
            .callback(Some("abc123"), Some("ory_kratos_session=s"))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Identity(KratosError::Traits(_))));
    }

    #[tokio::test]
    async fn consent_uses_traits_as_claims_without_remember() {
        let hydra = MockServer::start().await;
        let kratos = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sessions/whoami"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "identity": {"traits": {"netid": "alice", "name": "Alice", "email": "a@x.org"}}
            })))
            .mount(&kratos)
            .await;
        Mock::given(method("GET"))
            .and(path("/oauth2/auth/requests/consent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "challenge": "c1",
                "requested_scope": ["openid", "email"],
                "requested_access_token_audience": ["api"]
            })))
            .mount(&hydra)
            .await;
        Mock::given(method("PUT"))
            .and(path("/oauth2/auth/requests/consent/accept"))
            .and(body_json(json!({
                "grant_scope": ["openid", "email"],
                "grant_access_token_audience": ["api"],
                "remember": false,
                "session": {"id_token": {
                    "netid": "alice",
                    "name": "Alice",
                    "given_name": "Alice",
                    "email": "a@x.org"
                }}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "redirect_to": "https://hydra.test/consented"
            })))
            .expect(1)
            .mount(&hydra)
            .await;

        let redirect = bridge(&hydra, &kratos)
            .consent(Some("c1"), Some("ory_kratos_session=s"))
            .await
            .unwrap();
        assert_eq!(redirect, "https://hydra.test/consented");
    }
}
