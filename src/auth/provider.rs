//! Strategy selection.
//!
//! [`AuthProvider`] is the one capability surface callers see. Each variant
//! wraps a concrete strategy and every operation dispatches on the variant.

use std::path::PathBuf;

use super::federated::FederatedProvider;
use super::file::FileProvider;
use super::token::TokenProvider;
use super::types::{AuthConfig, AuthType, Credentials};
use crate::config::{default_auth_file, DEFAULT_AUTH_FILE, DEFAULT_TOKEN_ENV_VAR};
use crate::error::{AuthError, Result};

/// A credential source
#[derive(Debug)]
pub enum AuthProvider {
    Token(TokenProvider),
    File(FileProvider),
    Federated(FederatedProvider),
}

impl AuthProvider {
    /// Build the strategy selected by `config.auth_type`
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        tracing::debug!(auth_type = %config.auth_type, "Creating auth provider");
        Ok(match config.auth_type {
            AuthType::Token => AuthProvider::Token(TokenProvider::new(config.token.clone())),
            AuthType::File => AuthProvider::File(FileProvider::new(config.file.clone())),
            AuthType::Federated => {
                AuthProvider::Federated(FederatedProvider::new(config.federated.clone())?)
            }
        })
    }

    /// Pick a provider without explicit configuration.
    ///
    /// The default token environment variable wins; otherwise the default
    /// credential file under the home directory is used if it exists.
    pub fn resolve_default() -> Result<Self> {
        let env_token = std::env::var(DEFAULT_TOKEN_ENV_VAR).ok();
        resolve_from(env_token.as_deref(), default_auth_file())
    }

    /// Returns a currently valid token or an explanatory error
    pub async fn get_credentials(&self) -> Result<Credentials> {
        match self {
            AuthProvider::Token(p) => p.get_credentials().await,
            AuthProvider::File(p) => p.get_credentials().await,
            AuthProvider::Federated(p) => p.get_credentials().await,
        }
    }

    pub fn auth_type(&self) -> AuthType {
        match self {
            AuthProvider::Token(p) => p.auth_type(),
            AuthProvider::File(p) => p.auth_type(),
            AuthProvider::Federated(p) => p.auth_type(),
        }
    }

    /// Cheap check, false when expiry does not apply
    pub fn needs_refresh(&self) -> bool {
        match self {
            AuthProvider::Token(p) => p.needs_refresh(),
            AuthProvider::File(p) => p.needs_refresh(),
            AuthProvider::Federated(p) => p.needs_refresh(),
        }
    }

    /// Long-lived secrets held by the strategy itself, as opposed to the
    /// tokens it hands out
    pub fn secrets(&self) -> Vec<&str> {
        match self {
            AuthProvider::Token(_) | AuthProvider::File(_) => Vec::new(),
            AuthProvider::Federated(p) => p.secrets().collect(),
        }
    }

    /// Do whatever makes the next `get_credentials` succeed
    pub async fn refresh(&self) -> Result<()> {
        match self {
            AuthProvider::Token(p) => p.refresh().await,
            AuthProvider::File(p) => p.refresh().await,
            AuthProvider::Federated(p) => p.refresh().await,
        }
    }
}

impl From<TokenProvider> for AuthProvider {
    fn from(p: TokenProvider) -> Self {
        AuthProvider::Token(p)
    }
}

impl From<FileProvider> for AuthProvider {
    fn from(p: FileProvider) -> Self {
        AuthProvider::File(p)
    }
}

impl From<FederatedProvider> for AuthProvider {
    fn from(p: FederatedProvider) -> Self {
        AuthProvider::Federated(p)
    }
}

/// Default resolution over explicit inputs
fn resolve_from(env_token: Option<&str>, auth_file: Option<PathBuf>) -> Result<AuthProvider> {
    if env_token.is_some_and(|t| !t.is_empty()) {
        tracing::info!("Using token from {}", DEFAULT_TOKEN_ENV_VAR);
        return Ok(AuthProvider::Token(TokenProvider::from_env(
            DEFAULT_TOKEN_ENV_VAR,
        )));
    }

    if let Some(path) = auth_file.filter(|p| p.exists()) {
        tracing::info!("Using credential file {}", path.display());
        return Ok(AuthProvider::File(FileProvider::from_path(&path)));
    }

    Err(AuthError::NoCredentials(format!(
        "set {} or create ~/{}",
        DEFAULT_TOKEN_ENV_VAR, DEFAULT_AUTH_FILE
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::{FederatedConfig, FileConfig, TokenConfig};

    #[test]
    fn test_factory_dispatch() {
        let mut config = AuthConfig {
            auth_type: AuthType::Token,
            token: TokenConfig {
                token: "abc".to_string(),
                ..Default::default()
            },
            file: FileConfig::default(),
            federated: FederatedConfig::default(),
        };
        assert_eq!(
            AuthProvider::from_config(&config).unwrap().auth_type(),
            AuthType::Token
        );

        config.auth_type = AuthType::File;
        assert!(matches!(
            AuthProvider::from_config(&config).unwrap(),
            AuthProvider::File(_)
        ));

        config.auth_type = AuthType::Federated;
        assert!(matches!(
            AuthProvider::from_config(&config).unwrap(),
            AuthProvider::Federated(_)
        ));
    }

    #[test]
    fn test_factory_from_parsed_config() {
        let config: AuthConfig =
            serde_json::from_str(r#"{"type": "file", "file": {"path": "/tmp/x.json"}}"#).unwrap();
        let provider = AuthProvider::from_config(&config).unwrap();
        assert_eq!(provider.auth_type(), AuthType::File);
        assert!(!provider.needs_refresh());
    }

    #[test]
    fn test_resolve_prefers_env_token() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("claude-auth.json");
        std::fs::write(&file, "{}").unwrap();

        let provider = resolve_from(Some("env-token"), Some(file)).unwrap();
        assert_eq!(provider.auth_type(), AuthType::Token);
    }

    #[test]
    fn test_resolve_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("claude-auth.json");
        std::fs::write(&file, "{}").unwrap();

        let provider = resolve_from(Some(""), Some(file.clone())).unwrap();
        match provider {
            AuthProvider::File(p) => assert_eq!(p.path(), file),
            other => panic!("expected file provider, got {:?}", other.auth_type()),
        }
    }

    #[test]
    fn test_resolve_fails_with_remediation() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("claude-auth.json");

        let err = resolve_from(None, Some(missing)).unwrap_err();
        assert!(matches!(err, AuthError::NoCredentials(_)));
        let msg = err.to_string();
        assert!(msg.contains(DEFAULT_TOKEN_ENV_VAR));
        assert!(msg.contains(".kodama/claude-auth.json"));

        assert!(resolve_from(None, None).is_err());
    }
}
