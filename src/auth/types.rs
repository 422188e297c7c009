// Authentication types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

/// Metadata key naming the strategy that produced a credential
pub const META_SOURCE: &str = "source";
/// Metadata key naming the credential file profile
pub const META_PROFILE: &str = "profile";
/// Metadata key carrying the OAuth token type
pub const META_TOKEN_TYPE: &str = "token_type";

/// Type of authentication strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// Static bearer token from config or environment
    #[default]
    Token,

    /// Named profile in a JSON credential file
    File,

    /// OAuth refresh-token grant against a token endpoint
    Federated,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Token => "token",
            AuthType::File => "file",
            AuthType::Federated => "federated",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "token" => Ok(AuthType::Token),
            "file" => Ok(AuthType::File),
            "federated" => Ok(AuthType::Federated),
            other => Err(AuthError::Config(format!(
                "unknown auth type '{}' (expected token, file or federated)",
                other
            ))),
        }
    }
}

/// A resolved, usable credential
#[derive(Clone, Default)]
pub struct Credentials {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub metadata: HashMap<String, String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Default::default()
        }
    }

    pub fn with_expiry(mut self, expires_at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = expires_at;
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

// Never print the token itself
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &crate::sanitize::REDACTION_MARKER)
            .field("expires_at", &self.expires_at)
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Caller-supplied strategy selection
///
/// Only the embedded config matching `auth_type` is consulted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AuthConfig {
    #[serde(rename = "type")]
    pub auth_type: AuthType,
    pub token: TokenConfig,
    pub file: FileConfig,
    pub federated: FederatedConfig,
}

/// Static token strategy configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenConfig {
    /// Literal token, wins over any environment variable
    pub token: String,

    /// Environment variable to read when no literal token is set
    pub env_var: String,

    /// Stands in for the default environment variable's value.
    /// Lets tests exercise the last fallback without touching process env.
    #[serde(skip)]
    #[doc(hidden)]
    pub default_env_override: Option<String>,
}

/// File strategy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FileConfig {
    /// Credential file path, `~` allowed; empty means the default location
    pub path: String,

    /// Profile to use instead of the file's declared default
    pub profile: String,
}

/// Federated (OAuth refresh-token) strategy configuration
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FederatedConfig {
    pub token_endpoint: String,
    pub refresh_token: String,
    pub client_id: String,
    pub client_secret: String,

    /// Optional on-disk cache for the current access token, `~` allowed
    pub cache_file: String,
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        crate::sanitize::REDACTION_MARKER
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("token", &redacted(&self.token))
            .field("env_var", &self.env_var)
            .finish_non_exhaustive()
    }
}

impl fmt::Debug for FederatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedConfig")
            .field("token_endpoint", &self.token_endpoint)
            .field("refresh_token", &redacted(&self.refresh_token))
            .field("client_id", &self.client_id)
            .field("client_secret", &redacted(&self.client_secret))
            .field("cache_file", &self.cache_file)
            .finish()
    }
}

/// Multi-profile credential file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthFile {
    #[serde(default)]
    pub default_profile: String,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// One named credential record
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_url: Option<String>,
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profile")
            .field("token", &redacted(&self.token))
            .field("expires_at", &self.expires_at)
            .field("refresh_url", &self.refresh_url)
            .finish()
    }
}

/// OAuth refresh-token grant request body
#[derive(Serialize)]
pub struct RefreshRequest<'a> {
    pub grant_type: &'static str,
    pub refresh_token: &'a str,
    pub client_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<&'a str>,
}

/// OAuth token endpoint response
#[derive(Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub access_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub token_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_type_parse() {
        assert_eq!("token".parse::<AuthType>().unwrap(), AuthType::Token);
        assert_eq!("FILE".parse::<AuthType>().unwrap(), AuthType::File);
        assert_eq!(" federated ".parse::<AuthType>().unwrap(), AuthType::Federated);

        let err = "kerberos".parse::<AuthType>().unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
        assert!(err.to_string().contains("kerberos"));
    }

    #[test]
    fn test_auth_type_display_roundtrip() {
        for t in [AuthType::Token, AuthType::File, AuthType::Federated] {
            assert_eq!(t.to_string().parse::<AuthType>().unwrap(), t);
        }
    }

    #[test]
    fn test_credentials_debug_hides_token() {
        let creds = Credentials::new("super-secret-value");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("super-secret-value"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_config_debug_hides_secrets() {
        let config = AuthConfig {
            auth_type: AuthType::Federated,
            token: TokenConfig {
                token: "literal-secret".to_string(),
                ..Default::default()
            },
            federated: FederatedConfig {
                refresh_token: "refresh-secret".to_string(),
                client_secret: "client-secret".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("literal-secret"));
        assert!(!debug.contains("refresh-secret"));
        assert!(!debug.contains("client-secret"));
    }

    #[test]
    fn test_auth_file_parse() {
        let json = r#"{
            "defaultProfile": "work",
            "profiles": {
                "work": {"token": "xyz", "expiresAt": "2030-01-01T00:00:00Z"},
                "home": {"token": "abc", "refreshUrl": "https://auth.example.com/refresh"}
            }
        }"#;
        let file: AuthFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.default_profile, "work");
        assert_eq!(file.profiles["work"].token, "xyz");
        assert_eq!(
            file.profiles["work"].expires_at.as_deref(),
            Some("2030-01-01T00:00:00Z")
        );
        assert_eq!(
            file.profiles["home"].refresh_url.as_deref(),
            Some("https://auth.example.com/refresh")
        );
    }

    #[test]
    fn test_auth_config_parse() {
        let json = r#"{
            "type": "federated",
            "federated": {
                "tokenEndpoint": "https://auth.example.com/token",
                "refreshToken": "rt",
                "clientId": "kodama"
            }
        }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.auth_type, AuthType::Federated);
        assert_eq!(config.federated.token_endpoint, "https://auth.example.com/token");
        assert!(config.federated.cache_file.is_empty());
        assert!(config.token.token.is_empty());
    }

    #[test]
    fn test_refresh_request_omits_empty_secret() {
        let req = RefreshRequest {
            grant_type: "refresh_token",
            refresh_token: "rt",
            client_id: "cid",
            client_secret: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["grant_type"], "refresh_token");
        assert_eq!(value["client_id"], "cid");
        assert!(value.get("client_secret").is_none());
    }
}
