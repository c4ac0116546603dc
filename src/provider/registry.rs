use super::{IdentityProvider, Provider};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no provider named '{0}' is registered")]
    Unknown(String),
    #[error("a provider named '{0}' is already registered")]
    Duplicate(String),
}

/// Providers keyed by name. Filled at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Provider>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// Returns [`RegistryError::Duplicate`] if the name is taken.
    pub fn register(&mut self, provider: impl Into<Provider>) -> Result<(), RegistryError> {
        let provider = provider.into();
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        self.providers.insert(name, provider);
        Ok(())
    }

    /// # Errors
    /// Returns [`RegistryError::Unknown`] if nothing is registered under `name`.
    pub fn get(&self, name: &str) -> Result<&Provider, RegistryError> {
        self.providers
            .get(name)
            .ok_or_else(|| RegistryError::Unknown(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::{LarkConfig, LarkProvider};
    use secrecy::SecretString;

    fn lark(name: &str) -> LarkProvider {
        let config = LarkConfig::new(
            "cli_app",
            SecretString::from("secret".to_string()),
            "https://sso.example.com/auth/lark/callback".parse().unwrap(),
        );
        LarkProvider::new(config, reqwest::Client::new()).with_name(name)
    }

    #[test]
    fn lookup_by_name_is_stable() {
        let mut registry = ProviderRegistry::new();
        registry.register(lark("lark")).unwrap();

        let first = registry.get("lark").unwrap().name().to_string();
        let second = registry.get("lark").unwrap().name().to_string();
        assert_eq!(first, "lark");
        assert_eq!(first, second);
        assert!(registry.contains("lark"));
    }

    #[test]
    fn unknown_name_is_a_lookup_error() {
        let registry = ProviderRegistry::new();
        assert_eq!(
            registry.get("github").unwrap_err(),
            RegistryError::Unknown("github".to_string())
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = ProviderRegistry::new();
        registry.register(lark("lark")).unwrap();
        assert_eq!(
            registry.register(lark("lark")).unwrap_err(),
            RegistryError::Duplicate("lark".to_string())
        );
    }

    #[test]
    fn same_kind_under_two_names() {
        let mut registry = ProviderRegistry::new();
        registry.register(lark("lark")).unwrap();
        registry.register(lark("feishu")).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["feishu", "lark"]);
    }
}
