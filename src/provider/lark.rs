//! Lark (Feishu) as an upstream identity provider.
//!
//! Uses the Lark open platform web login:
//!
//! - `GET  /open-apis/authen/v1/index`: browser authorization page.
//! - `POST /open-apis/auth/v3/app_access_token/internal`: app credential.
//! - `POST /open-apis/authen/v1/access_token`: authorization code exchange.
//! - `GET  /open-apis/contact/v3/users/{union_id}`: user profile.
//!
//! Lark answers most failures with HTTP 200 and a non-zero `code`, so both the
//! status and the envelope code are checked. The Hydra subject is the user's
//! `employee_no`; accounts without one cannot sign in.

use super::{IdentityProvider, ProviderError, ResolvedIdentity, Session};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};
use url::Url;

pub const PROVIDER_NAME: &str = "lark";
pub const DEFAULT_BASE_URL: &str = "https://open.feishu.cn";

const AUTHORIZE_PATH: &str = "/open-apis/authen/v1/index";
const APP_ACCESS_TOKEN_PATH: &str = "/open-apis/auth/v3/app_access_token/internal";
const USER_ACCESS_TOKEN_PATH: &str = "/open-apis/authen/v1/access_token";
const SUBJECT_FIELD: &str = "employee_no";

/// Application credentials registered on the Lark open platform.
#[derive(Clone)]
pub struct LarkConfig {
    app_id: String,
    app_secret: SecretString,
    callback_url: Url,
    base_url: Option<Url>,
}

impl LarkConfig {
    /// Credentials for the default deployment at [`DEFAULT_BASE_URL`].
    #[must_use]
    pub fn new(app_id: impl Into<String>, app_secret: SecretString, callback_url: Url) -> Self {
        Self {
            app_id: app_id.into(),
            app_secret,
            callback_url,
            base_url: None,
        }
    }

    /// Point at another Lark deployment (e.g. `https://open.larksuite.com`).
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn callback_url(&self) -> &Url {
        &self.callback_url
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_ref().map_or(DEFAULT_BASE_URL, Url::as_str)
    }
}

impl std::fmt::Debug for LarkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LarkConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &"***")
            .field("callback_url", &self.callback_url.as_str())
            .field("base_url", &self.base_url())
            .finish()
    }
}

#[derive(Debug)]
pub struct LarkProvider {
    name: String,
    config: LarkConfig,
    http: Client,
}

// Lark response envelopes

#[derive(Deserialize)]
struct AppAccessTokenResponse {
    code: i64,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    app_access_token: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

#[derive(Deserialize)]
struct UserAccessToken {
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    open_id: String,
    #[serde(default)]
    union_id: String,
}

#[derive(Deserialize)]
struct UserData {
    user: LarkUser,
}

#[derive(Deserialize)]
struct LarkUser {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    en_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    employee_no: Option<String>,
    #[serde(default)]
    avatar: Option<Avatar>,
}

#[derive(Deserialize)]
struct Avatar {
    #[serde(default)]
    avatar_origin: Option<String>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<T, String> {
        if self.code != 0 {
            return Err(format!("code {}: {}", self.code, self.msg));
        }
        self.data
            .ok_or_else(|| "response carries no data".to_string())
    }
}

/// Read a JSON body, turning a non-2xx status into an error string.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("{status} - {body}"));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| format!("malformed response: {e}"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl LarkProvider {
    #[must_use]
    pub fn new(config: LarkConfig, http: Client) -> Self {
        Self {
            name: PROVIDER_NAME.to_string(),
            config,
            http,
        }
    }

    /// Register the same kind of provider under another name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn config(&self) -> &LarkConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}{path}",
            self.config.base_url().trim_end_matches('/')
        )
    }

    fn token_exchange_error(&self, detail: impl Into<String>) -> ProviderError {
        ProviderError::TokenExchange {
            provider: self.name.clone(),
            detail: detail.into(),
        }
    }

    fn profile_error(&self, detail: impl Into<String>) -> ProviderError {
        ProviderError::ProfileFetch {
            provider: self.name.clone(),
            detail: detail.into(),
        }
    }

    #[instrument(skip(self), fields(provider = %self.name))]
    async fn app_access_token(&self) -> Result<String, ProviderError> {
        let unavailable = |detail: String| ProviderError::UpstreamUnavailable {
            provider: self.name.clone(),
            detail,
        };

        let response = self
            .http
            .post(self.endpoint(APP_ACCESS_TOKEN_PATH))
            .json(&json!({
                "app_id": self.config.app_id,
                "app_secret": self.config.app_secret.expose_secret(),
            }))
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let body: AppAccessTokenResponse = read_json(response).await.map_err(unavailable)?;
        if body.code != 0 || body.app_access_token.is_empty() {
            return Err(unavailable(format!(
                "app access token refused, code {}: {}",
                body.code, body.msg
            )));
        }

        Ok(body.app_access_token)
    }

    #[instrument(skip_all, fields(provider = %self.name))]
    async fn exchange_code(
        &self,
        app_access_token: &str,
        code: &str,
    ) -> Result<UserAccessToken, ProviderError> {
        let response = self
            .http
            .post(self.endpoint(USER_ACCESS_TOKEN_PATH))
            .bearer_auth(app_access_token)
            .json(&json!({
                "grant_type": "authorization_code",
                "code": code,
            }))
            .send()
            .await
            .map_err(|e| self.token_exchange_error(e.to_string()))?;

        let envelope: Envelope<UserAccessToken> = read_json(response)
            .await
            .map_err(|e| self.token_exchange_error(e))?;
        let token = envelope
            .into_data()
            .map_err(|e| self.token_exchange_error(e))?;

        if token.access_token.is_empty() {
            return Err(self.token_exchange_error("response carries no access_token"));
        }
        if token.union_id.is_empty() {
            return Err(self.token_exchange_error("response carries no union_id"));
        }

        Ok(token)
    }

    #[instrument(skip_all, fields(provider = %self.name))]
    async fn fetch_user(&self, access_token: &str, union_id: &str) -> Result<LarkUser, ProviderError> {
        let mut url = Url::parse(&self.endpoint("/"))
            .map_err(|e| self.profile_error(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| self.profile_error("base URL cannot carry a path"))?
            .clear()
            .extend(["open-apis", "contact", "v3", "users", union_id]);
        url.query_pairs_mut().append_pair("user_id_type", "union_id");

        let response = self
            .http
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| self.profile_error(e.to_string()))?;

        let envelope: Envelope<UserData> = read_json(response)
            .await
            .map_err(|e| self.profile_error(e))?;
        let data = envelope.into_data().map_err(|e| self.profile_error(e))?;

        Ok(data.user)
    }

    /// Resolve the identity of an authorized session.
    async fn fetch_identity(&self, session: &Session) -> Result<ResolvedIdentity, ProviderError> {
        if !session.is_authorized() {
            return Err(self.profile_error("cannot get user information without access token"));
        }

        let user = self
            .fetch_user(session.access_token(), session.user_key())
            .await?;

        let Some(employee_no) = non_empty(user.employee_no) else {
            warn!(union_id = session.user_key(), "Lark user has no employee_no");
            return Err(ProviderError::MissingIdentifier {
                provider: self.name.clone(),
                field: SUBJECT_FIELD,
            });
        };

        let display_name = non_empty(user.name);
        let avatar_url = non_empty(user.avatar.and_then(|avatar| avatar.avatar_origin));

        let mut raw_attributes = Map::new();
        raw_attributes.insert(SUBJECT_FIELD.to_string(), Value::String(employee_no.clone()));
        raw_attributes.insert(
            "union_id".to_string(),
            Value::String(session.user_key().to_string()),
        );
        if let Some(open_id) = session.attribute("open_id") {
            raw_attributes.insert("open_id".to_string(), Value::String(open_id.to_string()));
        }
        if let Some(en_name) = non_empty(user.en_name) {
            raw_attributes.insert("en_name".to_string(), Value::String(en_name));
        }
        if let Some(email) = non_empty(user.email) {
            raw_attributes.insert("email".to_string(), Value::String(email));
        }

        debug!(subject = %employee_no, "Lark user resolved");

        Ok(ResolvedIdentity {
            provider: self.name.clone(),
            subject: employee_no,
            display_name,
            avatar_url,
            raw_attributes,
        })
    }
}

impl IdentityProvider for LarkProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn begin_authentication(&self, state: &str) -> Result<Session, ProviderError> {
        let mut url = Url::parse(&self.endpoint(AUTHORIZE_PATH)).map_err(|e| {
            ProviderError::UpstreamUnavailable {
                provider: self.name.clone(),
                detail: format!("invalid base URL: {e}"),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", self.config.callback_url.as_str())
            .append_pair("app_id", &self.config.app_id)
            .append_pair("state", state);

        Ok(Session::new(url))
    }

    async fn complete_authentication(
        &self,
        session: &mut Session,
        code: &str,
    ) -> Result<ResolvedIdentity, ProviderError> {
        session.authorization_url()?;

        if code.is_empty() {
            return Err(self.token_exchange_error("missing authorization code"));
        }

        let app_access_token = self.app_access_token().await?;
        let token = self.exchange_code(&app_access_token, code).await?;

        let mut attributes = BTreeMap::new();
        if !token.open_id.is_empty() {
            attributes.insert("open_id".to_string(), token.open_id);
        }
        session.authorize(token.access_token, token.union_id, attributes)?;

        self.fetch_identity(session).await
    }

    fn refresh_token_available(&self) -> bool {
        false
    }

    async fn refresh_token(&self, _refresh_token: &str) -> Result<SecretString, ProviderError> {
        Err(ProviderError::UnsupportedOperation {
            provider: self.name.clone(),
            operation: "refresh_token",
        })
    }
}
