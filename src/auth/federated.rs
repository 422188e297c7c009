use chrono::{Duration, Utc};
use reqwest::Client;
use std::path::PathBuf;
use tokio::sync::Mutex;

use super::cache::{self, CachedToken, TokenCache};
use super::refresh;
use super::types::{AuthType, Credentials, FederatedConfig, META_SOURCE, META_TOKEN_TYPE};
use super::REFRESH_WINDOW_SECS;
use crate::config::expand_tilde;
use crate::error::{AuthError, Result};

/// OAuth refresh-token provider
///
/// Keeps the current access token in memory (optionally mirrored to a cache
/// file) and exchanges the configured refresh token when it runs out.
/// Refreshes are single-flight: concurrent callers that find the cache
/// expired wait for one exchange instead of each issuing their own.
pub struct FederatedProvider {
    config: FederatedConfig,

    /// Current token, expiry and token type, always updated together
    cache: TokenCache,

    /// Held for the duration of a refresh exchange
    refresh_gate: Mutex<()>,

    /// HTTP client for refresh requests
    client: Client,
}

impl FederatedProvider {
    /// Create a provider, seeding the cache from the cache file when present.
    /// A missing or unreadable cache file is ignored.
    pub fn new(config: FederatedConfig) -> Result<Self> {
        let client = refresh::build_client()?;

        let initial = match cache_path(&config) {
            Some(path) => match cache::load_cache_file(&path) {
                Ok(cached) => {
                    tracing::debug!(path = %path.display(), "Loaded token cache");
                    cached
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "No usable token cache");
                    CachedToken::default()
                }
            },
            None => CachedToken::default(),
        };

        Ok(Self {
            config,
            cache: TokenCache::new(initial),
            refresh_gate: Mutex::new(()),
            client,
        })
    }

    /// Get a valid access token, refreshing if the cache is empty or expired
    pub async fn get_credentials(&self) -> Result<Credentials> {
        let cached = self.cache.snapshot();
        if cached.is_valid_at(Utc::now()) {
            return Ok(self.to_credentials(cached));
        }

        let _gate = self.refresh_gate.lock().await;

        // Another caller may have refreshed while we waited
        let cached = self.cache.snapshot();
        if cached.is_valid_at(Utc::now()) {
            tracing::debug!("Using token refreshed by a concurrent caller");
            return Ok(self.to_credentials(cached));
        }

        self.refresh_locked().await?;

        let cached = self.cache.snapshot();
        match cached.expires_at {
            Some(_) if cached.is_valid_at(Utc::now()) => Ok(self.to_credentials(cached)),
            Some(exp) => Err(AuthError::TokenExpired { expired_at: exp }),
            None => Err(AuthError::InvalidResponse(
                "refresh did not produce an expiry".to_string(),
            )),
        }
    }

    pub fn auth_type(&self) -> AuthType {
        AuthType::Federated
    }

    /// True when less than the refresh window remains, or nothing is cached
    pub fn needs_refresh(&self) -> bool {
        self.cache
            .snapshot()
            .expires_within(Duration::seconds(REFRESH_WINDOW_SECS), Utc::now())
    }

    /// Exchange the refresh token and update the cache
    pub async fn refresh(&self) -> Result<()> {
        refresh::check_config(&self.config)?;
        let _gate = self.refresh_gate.lock().await;
        self.refresh_locked().await
    }

    /// Current cache contents
    pub fn cached(&self) -> CachedToken {
        self.cache.snapshot()
    }

    /// Configured secrets that must never appear in output
    pub fn secrets(&self) -> impl Iterator<Item = &str> {
        [
            self.config.refresh_token.as_str(),
            self.config.client_secret.as_str(),
        ]
        .into_iter()
        .filter(|s| !s.is_empty())
    }

    /// Cache file location, expanded at use time
    pub fn cache_path(&self) -> Option<PathBuf> {
        cache_path(&self.config)
    }

    // Caller must hold `refresh_gate`
    async fn refresh_locked(&self) -> Result<()> {
        let previous = self.cache.snapshot();
        let token_data = refresh::refresh_token_grant(&self.client, &self.config).await?;

        let next = CachedToken::new(token_data.access_token, token_data.expires_at)
            .with_token_type(token_data.token_type);
        if !self.cache.compare_and_swap(&previous, next.clone()) {
            // Only writers outside the gate get here; the fresh exchange wins
            tracing::debug!("Token cache changed during refresh, replacing it");
            self.cache.store(next.clone());
        }

        if let Some(path) = self.cache_path() {
            // The in-memory token stays valid even if the disk write fails
            if let Err(e) = cache::save_cache_file(&path, &next) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to persist token cache");
            }
        }

        Ok(())
    }

    fn to_credentials(&self, cached: CachedToken) -> Credentials {
        let mut creds = Credentials::new(cached.token)
            .with_expiry(cached.expires_at)
            .with_metadata(META_SOURCE, AuthType::Federated.as_str());
        if !cached.token_type.is_empty() {
            creds = creds.with_metadata(META_TOKEN_TYPE, cached.token_type);
        }
        creds
    }
}

impl std::fmt::Debug for FederatedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedProvider")
            .field("token_endpoint", &self.config.token_endpoint)
            .field("client_id", &self.config.client_id)
            .field("cache_file", &self.config.cache_file)
            .field("expires_at", &self.cache.snapshot().expires_at)
            .finish_non_exhaustive()
    }
}

fn cache_path(config: &FederatedConfig) -> Option<PathBuf> {
    if config.cache_file.is_empty() {
        None
    } else {
        Some(expand_tilde(&config.cache_file))
    }
}
