// Static token provider

use super::types::{AuthType, Credentials, TokenConfig, META_SOURCE};
use crate::config::DEFAULT_TOKEN_ENV_VAR;
use crate::error::{AuthError, Result};

/// Resolves a bearer token from config or the environment. Never refreshes.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    config: TokenConfig,
}

impl TokenProvider {
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// Provider bound to a named environment variable
    pub fn from_env(env_var: &str) -> Self {
        Self::new(TokenConfig {
            env_var: env_var.to_string(),
            ..Default::default()
        })
    }

    /// Resolution order: literal token, named env var, default env var
    fn resolve(&self) -> Option<String> {
        if !self.config.token.is_empty() {
            return Some(self.config.token.clone());
        }

        if !self.config.env_var.is_empty() {
            if let Some(token) = read_env(&self.config.env_var) {
                tracing::debug!(env_var = %self.config.env_var, "Using token from environment");
                return Some(token);
            }
        }

        let fallback = match &self.config.default_env_override {
            Some(value) => Some(value.clone()).filter(|v| !v.is_empty()),
            None => read_env(DEFAULT_TOKEN_ENV_VAR),
        };
        if fallback.is_some() {
            tracing::debug!(env_var = DEFAULT_TOKEN_ENV_VAR, "Using token from default environment variable");
        }
        fallback
    }

    pub async fn get_credentials(&self) -> Result<Credentials> {
        let token = self.resolve().ok_or_else(|| {
            AuthError::NoCredentials(format!(
                "set a token in config, the configured env var, or {}",
                DEFAULT_TOKEN_ENV_VAR
            ))
        })?;

        Ok(Credentials::new(token).with_metadata(META_SOURCE, AuthType::Token.as_str()))
    }

    pub fn auth_type(&self) -> AuthType {
        AuthType::Token
    }

    /// Static tokens have no lifecycle
    pub fn needs_refresh(&self) -> bool {
        false
    }

    pub async fn refresh(&self) -> Result<()> {
        Ok(())
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
