use serde::Serialize;
use serde_json::{Map, Value};

/// A user whose identity an upstream provider has verified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedIdentity {
    /// Name of the provider that produced this identity.
    pub provider: String,
    /// Stable organizational identifier, used as the Hydra subject.
    pub subject: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// Provider-native claims, passed through untouched.
    pub raw_attributes: Map<String, Value>,
}

impl ResolvedIdentity {
    /// Claims handed to Hydra as the login `context`; the consent leg turns
    /// them into ID token claims.
    #[must_use]
    pub fn login_context(&self) -> Value {
        let mut claims = self.raw_attributes.clone();
        if let Some(name) = &self.display_name {
            claims.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(avatar) = &self.avatar_url {
            claims.insert("picture".to_string(), Value::String(avatar.clone()));
        }
        Value::Object(claims)
    }
}
