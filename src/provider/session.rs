use super::error::SessionError;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Version tag written into every encoded session.
pub const SESSION_SCHEMA_VERSION: u8 = 1;

/// State of one authentication attempt against an upstream provider.
///
/// Created by `begin_authentication`, carried by the browser between the two
/// legs as an opaque string, completed by `complete_authentication` and then
/// dropped.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    auth_url: String,
    #[serde(default)]
    access_token: String,
    #[serde(default)]
    user_key: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attributes: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct EncodeEnvelope<'a> {
    v: u8,
    #[serde(flatten)]
    session: &'a Session,
}

#[derive(Deserialize)]
struct DecodeEnvelope {
    v: u8,
    #[serde(flatten)]
    session: Session,
}

impl Session {
    #[must_use]
    pub fn new(auth_url: impl Into<String>) -> Self {
        Self {
            auth_url: auth_url.into(),
            ..Self::default()
        }
    }

    /// URL set by `begin_authentication`.
    ///
    /// # Errors
    /// Returns [`SessionError::MissingAuthUrl`] when the session was not
    /// produced by the begin leg.
    pub fn authorization_url(&self) -> Result<&str, SessionError> {
        if self.auth_url.is_empty() {
            Err(SessionError::MissingAuthUrl)
        } else {
            Ok(&self.auth_url)
        }
    }

    /// The `state` query parameter embedded in the authorization URL.
    #[must_use]
    pub fn state(&self) -> Option<String> {
        let url = Url::parse(&self.auth_url).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
    }

    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Provider assigned user key (Lark `union_id`).
    #[must_use]
    pub fn user_key(&self) -> &str {
        &self.user_key
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_authorized(&self) -> bool {
        !self.access_token.is_empty()
    }

    /// Record the result of the code exchange. A session is authorized once.
    ///
    /// # Errors
    /// Returns [`SessionError::AlreadyAuthorized`] if a token is already set.
    pub fn authorize(
        &mut self,
        access_token: String,
        user_key: String,
        attributes: BTreeMap<String, String>,
    ) -> Result<(), SessionError> {
        if self.is_authorized() {
            return Err(SessionError::AlreadyAuthorized);
        }
        self.access_token = access_token;
        self.user_key = user_key;
        self.attributes = attributes;
        Ok(())
    }

    /// Encode into a cookie safe string (base64url of a versioned JSON document).
    ///
    /// # Errors
    /// Returns [`SessionError::Serialization`] if the session cannot be
    /// written as JSON.
    pub fn marshal(&self) -> Result<String, SessionError> {
        let envelope = EncodeEnvelope {
            v: SESSION_SCHEMA_VERSION,
            session: self,
        };
        let json = serde_json::to_vec(&envelope)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode what [`Session::marshal`] produced.
    ///
    /// # Errors
    /// Returns [`SessionError::Deserialization`] on malformed input or an
    /// unknown schema version.
    pub fn unmarshal(data: &str) -> Result<Self, SessionError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(data.trim())
            .map_err(|e| SessionError::Deserialization(format!("invalid base64url: {e}")))?;
        let envelope: DecodeEnvelope = serde_json::from_slice(&bytes)
            .map_err(|e| SessionError::Deserialization(format!("invalid json: {e}")))?;
        if envelope.v != SESSION_SCHEMA_VERSION {
            return Err(SessionError::Deserialization(format!(
                "unsupported session version {}",
                envelope.v
            )));
        }
        Ok(envelope.session)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("auth_url", &self.auth_url)
            .field(
                "access_token",
                &if self.access_token.is_empty() { "" } else { "***" },
            )
            .field("user_key", &self.user_key)
            .field("attributes", &self.attributes)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn authorized() -> Session {
        let mut session =
            Session::new("https://open.feishu.cn/open-apis/authen/v1/index?app_id=a&state=abc123");
        session
            .authorize(
                "u-token".to_string(),
                "on_union".to_string(),
                BTreeMap::from([("open_id".to_string(), "ou_open".to_string())]),
            )
            .unwrap();
        session
    }

    #[test]
    fn marshal_round_trips() {
        let fresh = Session::new("https://upstream.test/authorize?state=s");
        assert_eq!(Session::unmarshal(&fresh.marshal().unwrap()).unwrap(), fresh);

        let done = authorized();
        assert_eq!(Session::unmarshal(&done.marshal().unwrap()).unwrap(), done);
    }

    #[test]
    fn marshal_is_cookie_safe() {
        let encoded = authorized().marshal().unwrap();
        assert!(
            encoded
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn unmarshal_rejects_garbage() {
        assert!(matches!(
            Session::unmarshal("not base64 !!"),
            Err(SessionError::Deserialization(_))
        ));

        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(matches!(
            Session::unmarshal(&not_json),
            Err(SessionError::Deserialization(_))
        ));
    }

    #[test]
    fn unmarshal_rejects_unknown_version() {
        let encoded = URL_SAFE_NO_PAD.encode(br#"{"v":9,"auth_url":"https://x"}"#);
        let err = Session::unmarshal(&encoded).unwrap_err();
        assert_eq!(
            err,
            SessionError::Deserialization("unsupported session version 9".to_string())
        );
    }

    #[test]
    fn authorization_url_requires_begin_leg() {
        assert_eq!(
            Session::default().authorization_url(),
            Err(SessionError::MissingAuthUrl)
        );
        assert_eq!(
            Session::new("https://x/authorize").authorization_url(),
            Ok("https://x/authorize")
        );
    }

    #[test]
    fn state_is_read_from_auth_url() {
        assert_eq!(authorized().state().as_deref(), Some("abc123"));
        assert_eq!(Session::new("https://x/authorize").state(), None);
    }

    #[test]
    fn authorize_only_once() {
        let mut session = authorized();
        let err = session
            .authorize("other".to_string(), "other".to_string(), BTreeMap::new())
            .unwrap_err();
        assert_eq!(err, SessionError::AlreadyAuthorized);
        assert_eq!(session.access_token(), "u-token");
        assert_eq!(session.user_key(), "on_union");
        assert_eq!(session.attribute("open_id"), Some("ou_open"));
    }

    #[test]
    fn debug_redacts_token() {
        let rendered = format!("{:?}", authorized());
        assert!(!rendered.contains("u-token"));
        assert!(rendered.contains("***"));
    }
}
