// Error handling module
// Defines the error kinds surfaced by credential providers

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while resolving or refreshing credentials
///
/// Messages may echo remote response bodies. Pass them through
/// [`Sanitizer::sanitize_error`](crate::sanitize::Sanitizer::sanitize_error)
/// before showing them to a user or writing them to a log.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Missing or invalid strategy configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No credential source produced a token
    #[error("No authentication token available: {0}")]
    NoCredentials(String),

    /// The resolved profile name is absent from the credential file
    #[error("Profile '{profile}' not found in {}", .path.display())]
    ProfileNotFound { profile: String, path: PathBuf },

    /// A declared expiry could not be parsed as RFC3339
    #[error("Invalid expiresAt '{value}' for profile '{profile}': {source}")]
    InvalidExpiry {
        profile: String,
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    /// The token was read successfully but is already past its expiry
    #[error("Token expired at {}", .expired_at.to_rfc3339())]
    TokenExpired { expired_at: DateTime<Utc> },

    /// The strategy has no refresh path configured
    #[error("Refresh not supported: {0}")]
    RefreshNotSupported(String),

    /// The strategy knows where to refresh but cannot do it automatically yet
    #[error("Refresh not yet implemented: {0}")]
    RefreshNotImplemented(String),

    /// Network failure or timeout while talking to the token endpoint
    #[error("Token endpoint request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Token endpoint answered with a non-200 status
    #[error("Token refresh failed with status {status}: {body}")]
    RefreshFailed { status: u16, body: String },

    /// Token endpoint answered 200 with an unusable body
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// Reading or writing a credential file failed
    #[error("Failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A credential file is not valid JSON for the expected structure
    #[error("Failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl AuthError {
    /// Whether a caller may reasonably retry the operation as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::Transport(_) | AuthError::RefreshFailed { .. }
        )
    }
}

/// Result type alias for credential operations
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AuthError::Config("token endpoint is required".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: token endpoint is required"
        );

        let err = AuthError::ProfileNotFound {
            profile: "work".to_string(),
            path: PathBuf::from("/tmp/auth.json"),
        };
        assert_eq!(err.to_string(), "Profile 'work' not found in /tmp/auth.json");

        let err = AuthError::RefreshFailed {
            status: 401,
            body: "invalid_grant".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Token refresh failed with status 401: invalid_grant"
        );
    }

    #[test]
    fn test_token_expired_message() {
        let expired_at = DateTime::parse_from_rfc3339("2025-01-12T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let err = AuthError::TokenExpired { expired_at };
        assert_eq!(err.to_string(), "Token expired at 2025-01-12T10:30:00+00:00");
    }

    #[test]
    fn test_invalid_expiry_message() {
        let source = DateTime::parse_from_rfc3339("tomorrow").unwrap_err();
        let err = AuthError::InvalidExpiry {
            profile: "default".to_string(),
            value: "tomorrow".to_string(),
            source,
        };
        assert!(err
            .to_string()
            .starts_with("Invalid expiresAt 'tomorrow' for profile 'default'"));
    }

    #[test]
    fn test_io_error_message() {
        let err = AuthError::Io {
            path: PathBuf::from("/missing/auth.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "Failed to access /missing/auth.json: not found");
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(AuthError::RefreshFailed {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!AuthError::Config("x".to_string()).is_retryable());
        assert!(!AuthError::NoCredentials("x".to_string()).is_retryable());
        assert!(!AuthError::RefreshNotImplemented("x".to_string()).is_retryable());
    }
}
