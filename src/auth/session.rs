// Credential acquisition flow shared by the exec adapter and the CLI

use std::sync::Arc;

use super::provider::AuthProvider;
use super::types::{AuthType, Credentials};
use crate::error::Result;
use crate::sanitize::Sanitizer;

/// A provider paired with the sanitizer that guards its tokens
#[derive(Debug)]
pub struct AuthSession {
    provider: AuthProvider,
    sanitizer: Arc<Sanitizer>,
}

impl AuthSession {
    /// Pair `provider` with `sanitizer`, registering the provider's own
    /// secrets (refresh token, client secret) up front.
    pub fn new(provider: AuthProvider, sanitizer: Arc<Sanitizer>) -> Self {
        for secret in provider.secrets() {
            sanitizer.add_token(secret);
        }
        Self {
            provider,
            sanitizer,
        }
    }

    /// Refresh if needed, fetch credentials and register the token for redaction.
    ///
    /// A failed refresh is not fatal on its own: if the current token has not
    /// yet expired `get_credentials` still returns it.
    pub async fn credentials(&self) -> Result<Credentials> {
        if self.provider.needs_refresh() {
            if let Err(e) = self.provider.refresh().await {
                tracing::warn!(
                    auth_type = %self.provider.auth_type(),
                    "Token refresh failed, trying existing credentials: {}",
                    self.sanitizer.sanitize_error(&e)
                );
            }
        }

        let creds = self.provider.get_credentials().await?;
        self.sanitizer.add_token(&creds.token);
        Ok(creds)
    }

    pub fn auth_type(&self) -> AuthType {
        self.provider.auth_type()
    }

    pub fn provider(&self) -> &AuthProvider {
        &self.provider
    }

    pub fn sanitizer(&self) -> &Arc<Sanitizer> {
        &self.sanitizer
    }
}
