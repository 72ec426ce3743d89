use crate::secrets::string::SecretString;
use crate::secrets::SecretManager;
use sdk::errors::EngineError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// An in-memory cache in front of the environment and the OS keychain.
///
/// Lookup order for a key such as `asana_access_token`:
/// 1. the memory cache
/// 2. the environment variable `ASANA_ACCESS_TOKEN`
/// 3. the keychain entry under the manager's service name
///
/// Nothing here prompts; a server has no terminal to prompt on.
#[derive(Clone)]
pub struct SecretCache {
    manager: Arc<SecretManager>,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretCache {
    /// Creates a new SecretCache wrapping the provided SecretManager
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Environment variable consulted for a secret key
    pub fn env_var_name(key: &str) -> String {
        key.to_ascii_uppercase()
    }

    /// Retrieves a secret, caching it on first successful lookup.
    ///
    /// # Errors
    /// Returns `EngineError::KeyringError` if the secret is neither in the
    /// environment nor the keychain.
    pub fn get_secret(&self, key: &str) -> Result<SecretString, EngineError> {
        self.get_optional(key)?.ok_or_else(|| {
            EngineError::KeyringError(format!(
                "Secret '{}' not found (set {} or store it in the keychain)",
                key,
                Self::env_var_name(key)
            ))
        })
    }

    /// Retrieves a secret if one is available.
    ///
    /// A missing secret is `Ok(None)`. Only keychain backend failures are errors.
    pub fn get_optional(&self, key: &str) -> Result<Option<SecretString>, EngineError> {
        {
            let cache = self
                .cache
                .read()
                .map_err(|_| EngineError::KeyringError("Secret cache lock poisoned".to_string()))?;
            if let Some(secret) = cache.get(key) {
                return Ok(Some(secret.clone()));
            }
        }

        let found = match std::env::var(Self::env_var_name(key)) {
            Ok(value) if !value.trim().is_empty() => {
                tracing::debug!("Secret '{}' read from environment", key);
                Some(value.trim().to_string())
            }
            _ => self.manager.get_secret(key)?,
        };

        let Some(raw) = found else {
            return Ok(None);
        };

        let secret = SecretString::new(raw);
        self.cache
            .write()
            .map_err(|_| EngineError::KeyringError("Secret cache lock poisoned".to_string()))?
            .insert(key.to_string(), secret.clone());

        Ok(Some(secret))
    }

    /// Checks availability without surfacing keychain errors
    pub fn has_secret(&self, key: &str) -> bool {
        matches!(self.get_optional(key), Ok(Some(_)))
    }

    /// Seeds the cache directly, bypassing environment and keychain
    pub fn insert(&self, key: &str, value: impl Into<SecretString>) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(key.to_string(), value.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> SecretCache {
        SecretCache::new(Arc::new(SecretManager::new("switchboard-test-cache")))
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(SecretCache::env_var_name("asana_access_token"), "ASANA_ACCESS_TOKEN");
    }

    #[test]
    fn test_environment_lookup() {
        std::env::set_var("SWITCHBOARD_TEST_ENV_SECRET", "from-env");
        let secrets = cache();

        let secret = secrets.get_secret("switchboard_test_env_secret").unwrap();
        assert_eq!(secret.unsecure(), "from-env");
        assert!(secrets.has_secret("switchboard_test_env_secret"));

        std::env::remove_var("SWITCHBOARD_TEST_ENV_SECRET");
    }

    #[test]
    fn test_inserted_secret_wins() {
        let secrets = cache();
        secrets.insert("openai_api_key", "sk-inserted");
        assert_eq!(secrets.get_secret("openai_api_key").unwrap().unsecure(), "sk-inserted");
    }

    #[test]
    fn test_blank_env_value_is_ignored() {
        std::env::set_var("SWITCHBOARD_TEST_BLANK_SECRET", "   ");
        let secrets = cache();
        // Falls through to the keychain, which has no such entry
        assert!(!secrets.has_secret("switchboard_test_blank_secret"));
        std::env::remove_var("SWITCHBOARD_TEST_BLANK_SECRET");
    }
}
