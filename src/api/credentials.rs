//! Credential sources for the ARM and Kudu clients

use async_trait::async_trait;
use std::env;
use thiserror::Error;

/// Errors raised while resolving credentials
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("environment variable {0} is not set or empty")]
    MissingEnv(&'static str),
    #[error("failed to acquire token: {0}")]
    Acquire(String),
}

/// Source of bearer tokens for ARM requests.
///
/// The management API takes an OAuth bearer token; where that token comes
/// from (env var, CLI cache, managed identity) is up to the implementation.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn bearer_token(&self) -> Result<String, CredentialError>;
}

/// A fixed token supplied up front
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn bearer_token(&self) -> Result<String, CredentialError> {
        Ok(self.token.clone())
    }
}

/// Reads the ARM token from `AZUP_ARM_TOKEN` on every request, so a rotated
/// token is picked up without restarting
pub struct EnvTokenCredential;

const ARM_TOKEN_VAR: &str = "AZUP_ARM_TOKEN";

impl EnvTokenCredential {
    /// Check if the env var is set (for capability gating at startup)
    pub fn is_env_configured() -> bool {
        env::var(ARM_TOKEN_VAR).map(|t| !t.is_empty()).unwrap_or(false)
    }
}

#[async_trait]
impl TokenCredential for EnvTokenCredential {
    async fn bearer_token(&self) -> Result<String, CredentialError> {
        match env::var(ARM_TOKEN_VAR) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => Err(CredentialError::MissingEnv(ARM_TOKEN_VAR)),
        }
    }
}

/// Basic-auth credentials for the Kudu SCM site
#[derive(Debug, Clone)]
pub struct KuduCredentials {
    pub username: String,
    pub password: String,
}

impl KuduCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Create from `AZUP_KUDU_USER` / `AZUP_KUDU_PASSWORD`
    pub fn from_env() -> Result<Self, CredentialError> {
        let user = env::var("AZUP_KUDU_USER").unwrap_or_default();
        let password = env::var("AZUP_KUDU_PASSWORD").unwrap_or_default();

        if user.is_empty() {
            return Err(CredentialError::MissingEnv("AZUP_KUDU_USER"));
        }
        if password.is_empty() {
            return Err(CredentialError::MissingEnv("AZUP_KUDU_PASSWORD"));
        }
        Ok(Self::new(user, password))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_token() {
        let cred = StaticTokenCredential::new("tok-123");
        assert_eq!(cred.bearer_token().await.unwrap(), "tok-123");
    }

    #[tokio::test]
    async fn test_env_token_missing() {
        env::remove_var(ARM_TOKEN_VAR);
        let cred = EnvTokenCredential;
        assert!(cred.bearer_token().await.is_err());
        assert!(!EnvTokenCredential::is_env_configured());
    }

    #[test]
    fn test_kudu_credentials_from_parts() {
        let cred = KuduCredentials::new("$my-site", "secret");
        assert_eq!(cred.username, "$my-site");
        assert_eq!(cred.password, "secret");
    }
}
