//! Secret parameter store backed by environment variables

use crate::relay::{RelayError, SecretStore};
use async_trait::async_trait;
use secrecy::SecretString;

/// Reads a parameter from the environment variable derived from its name.
///
/// `/ci/github-token` is read from `CI_GITHUB_TOKEN`. The value is read on
/// every fetch.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore {
    prefix: Option<String>,
}

impl EnvSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `prefix` to every derived variable name
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    pub fn variable_name(&self, parameter: &str) -> String {
        let base: String = parameter
            .trim_matches('/')
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        match &self.prefix {
            Some(prefix) => format!("{}{}", prefix, base),
            None => base,
        }
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn fetch(&self, name: &str) -> Result<SecretString, RelayError> {
        let variable = self.variable_name(name);
        match std::env::var(&variable) {
            Ok(value) if !value.is_empty() => Ok(SecretString::from(value)),
            Ok(_) => Err(RelayError::Secret {
                name: name.to_string(),
                message: format!("{} is empty", variable),
            }),
            Err(e) => Err(RelayError::Secret {
                name: name.to_string(),
                message: format!("{}: {}", variable, e),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_variable_name() {
        let store = EnvSecretStore::new();
        assert_eq!(store.variable_name("/ci/github-token"), "CI_GITHUB_TOKEN");
        assert_eq!(store.variable_name("token"), "TOKEN");

        let prefixed = EnvSecretStore::with_prefix("WAVELINE_");
        assert_eq!(prefixed.variable_name("/ci/github-token"), "WAVELINE_CI_GITHUB_TOKEN");
    }

    #[tokio::test]
    async fn test_fetch_reads_environment() {
        let store = EnvSecretStore::with_prefix("WAVELINE_TEST_FETCH_");
        std::env::set_var("WAVELINE_TEST_FETCH_CI_TOKEN", "s3cret");

        let secret = store.fetch("/ci/token").await.unwrap();
        assert_eq!(secret.expose_secret(), "s3cret");

        std::env::remove_var("WAVELINE_TEST_FETCH_CI_TOKEN");
    }

    #[tokio::test]
    async fn test_missing_secret_is_permanent_error() {
        let store = EnvSecretStore::with_prefix("WAVELINE_TEST_MISSING_");
        let err = store.fetch("/ci/token").await.unwrap_err();
        assert!(matches!(err, RelayError::Secret { .. }));
        assert!(!err.is_transient());
    }
}
