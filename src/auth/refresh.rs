// Token refresh logic

use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};

use super::types::{FederatedConfig, RefreshRequest, RefreshResponse};
use crate::error::{AuthError, Result};

/// Fixed deadline for a token endpoint exchange
pub const REFRESH_TIMEOUT_SECS: u64 = 30;

/// Token data from a successful refresh
#[derive(Clone)]
pub struct TokenData {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub token_type: String,
}

/// Build the HTTP client used for refresh requests
pub fn build_client() -> Result<Client> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(REFRESH_TIMEOUT_SECS))
        .user_agent(concat!("kodama-auth/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(AuthError::Transport)
}

/// Fail fast when the config cannot possibly produce a refresh
pub fn check_config(config: &FederatedConfig) -> Result<()> {
    if config.token_endpoint.is_empty() {
        return Err(AuthError::Config(
            "federated auth requires a token endpoint".to_string(),
        ));
    }
    if config.refresh_token.is_empty() {
        return Err(AuthError::Config(
            "federated auth requires a refresh token".to_string(),
        ));
    }
    Ok(())
}

/// Exchange the configured refresh token for a new access token
pub async fn refresh_token_grant(client: &Client, config: &FederatedConfig) -> Result<TokenData> {
    check_config(config)?;

    tracing::info!(endpoint = %config.token_endpoint, "Refreshing access token...");

    let request = RefreshRequest {
        grant_type: "refresh_token",
        refresh_token: &config.refresh_token,
        client_id: &config.client_id,
        client_secret: Some(config.client_secret.as_str()).filter(|s| !s.is_empty()),
    };

    let response = client
        .post(&config.token_endpoint)
        .json(&request)
        .send()
        .await?;

    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, "Token refresh rejected by endpoint");
        return Err(AuthError::RefreshFailed {
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response.bytes().await?;
    let data: RefreshResponse = serde_json::from_slice(&bytes)
        .map_err(|e| AuthError::InvalidResponse(format!("malformed token response: {}", e)))?;

    if data.access_token.is_empty() {
        return Err(AuthError::InvalidResponse(
            "response does not contain access_token".to_string(),
        ));
    }

    let expires_at = Duration::try_seconds(data.expires_in)
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| AuthError::InvalidResponse("expires_in out of range".to_string()))?;

    tracing::info!(
        "Token refreshed via {}, expires: {}",
        config.token_endpoint,
        expires_at.to_rfc3339()
    );

    Ok(TokenData {
        access_token: data.access_token,
        expires_at,
        token_type: data.token_type,
    })
}
