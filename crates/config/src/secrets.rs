// Secret lookup
//
// Secrets are resolved in order:
// 1. System keychain (when built with the `keychain` feature)
// 2. Environment variable named in the config file
//
// They are NEVER read from config.toml itself.

use std::env;

use crate::error::ConfigError;

/// Service name for keychain storage
#[cfg_attr(not(feature = "keychain"), allow(dead_code))]
const KEYCHAIN_SERVICE: &str = "datahub";

/// Where a secret was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSource {
    Keychain,
    Environment,
    None,
}

impl SecretSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecretSource::Keychain => "keychain",
            SecretSource::Environment => "environment",
            SecretSource::None => "none",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecretLookup {
    pub value: Option<String>,
    pub source: SecretSource,
}

/// Keychain account for a secret, e.g. "rest/password".
#[cfg_attr(not(feature = "keychain"), allow(dead_code))]
fn keychain_account(name: &str) -> String {
    name.to_lowercase()
}

/// Look up secret `name`, falling back to environment variable `env_name`.
pub fn lookup(name: &str, env_name: &str) -> SecretLookup {
    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(name)) {
            if let Ok(value) = entry.get_password() {
                return SecretLookup { value: Some(value), source: SecretSource::Keychain };
            }
        }
    }

    if let Ok(value) = env::var(env_name) {
        if !value.is_empty() {
            return SecretLookup { value: Some(value), source: SecretSource::Environment };
        }
    }

    SecretLookup { value: None, source: SecretSource::None }
}

/// Like [`lookup`] but a missing secret is an error naming both places searched.
pub fn require(name: &str, env_name: &str) -> Result<String, ConfigError> {
    let found = lookup(name, env_name);
    log::debug!("Secret {} resolved from {}", name, found.source.as_str());
    found.value.ok_or_else(|| ConfigError::MissingSecret(format!("{} (env {})", name, env_name)))
}
