// Credential loading from a multi-profile JSON file

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};

use super::types::{AuthFile, AuthType, Credentials, FileConfig, Profile, META_PROFILE, META_SOURCE};
use super::REFRESH_WINDOW_SECS;
use crate::config::resolve_auth_file;
use crate::error::{AuthError, Result};

/// Profile name used when neither config nor file names one
pub const FALLBACK_PROFILE: &str = "default";

/// Last profile successfully read from disk
#[derive(Debug, Clone)]
struct LoadedProfile {
    profile: Profile,
    loaded_at: DateTime<Utc>,
}

/// Resolves a token from a named profile in a credential file
#[derive(Debug)]
pub struct FileProvider {
    config: FileConfig,
    loaded: RwLock<Option<LoadedProfile>>,
}

impl FileProvider {
    pub fn new(config: FileConfig) -> Self {
        Self {
            config,
            loaded: RwLock::new(None),
        }
    }

    /// Provider bound to an explicit file path
    pub fn from_path(path: &Path) -> Self {
        Self::new(FileConfig {
            path: path.to_string_lossy().into_owned(),
            profile: String::new(),
        })
    }

    /// Credential file location, expanded at use time
    pub fn path(&self) -> PathBuf {
        resolve_auth_file(&self.config.path)
    }

    pub async fn get_credentials(&self) -> Result<Credentials> {
        let path = self.path();
        let file = load_auth_file(&path)?;

        let name = select_profile(&self.config.profile, &file.default_profile).to_string();
        let profile = file
            .profiles
            .get(&name)
            .cloned()
            .ok_or_else(|| AuthError::ProfileNotFound {
                profile: name.clone(),
                path: path.clone(),
            })?;

        if profile.token.is_empty() {
            return Err(AuthError::NoCredentials(format!(
                "profile '{}' in {} has an empty token",
                name,
                path.display()
            )));
        }

        let expires_at = match profile.expires_at.as_deref() {
            Some(raw) => {
                let expires_at =
                    parse_datetime(raw).map_err(|source| AuthError::InvalidExpiry {
                        profile: name.clone(),
                        value: raw.to_string(),
                        source,
                    })?;
                if expires_at <= Utc::now() {
                    return Err(AuthError::TokenExpired {
                        expired_at: expires_at,
                    });
                }
                Some(expires_at)
            }
            None => None,
        };

        tracing::debug!(
            path = %path.display(),
            profile = %name,
            "Loaded credentials from file"
        );

        let creds = Credentials::new(profile.token.clone())
            .with_expiry(expires_at)
            .with_metadata(META_SOURCE, AuthType::File.as_str())
            .with_metadata(META_PROFILE, name);

        *self.loaded.write() = Some(LoadedProfile {
            profile,
            loaded_at: Utc::now(),
        });

        Ok(creds)
    }

    /// When the cached profile was last read, if ever
    pub fn last_loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded.read().as_ref().map(|l| l.loaded_at)
    }

    pub fn auth_type(&self) -> AuthType {
        AuthType::File
    }

    /// True when the last read profile expires within the refresh window.
    /// An unparseable expiry is treated as not needing refresh.
    pub fn needs_refresh(&self) -> bool {
        let loaded = self.loaded.read();
        let Some(raw) = loaded
            .as_ref()
            .and_then(|l| l.profile.expires_at.as_deref())
        else {
            return false;
        };

        match parse_datetime(raw) {
            Ok(expires_at) => expires_at - Utc::now() < Duration::seconds(REFRESH_WINDOW_SECS),
            Err(_) => false,
        }
    }

    /// No automatic refresh path exists; the user must update the file
    pub async fn refresh(&self) -> Result<()> {
        let refresh_url = self
            .loaded
            .read()
            .as_ref()
            .and_then(|l| l.profile.refresh_url.clone())
            .filter(|url| !url.is_empty());

        match refresh_url {
            None => Err(AuthError::RefreshNotSupported(format!(
                "profile has no refreshUrl; update {} manually",
                self.path().display()
            ))),
            Some(url) => Err(AuthError::RefreshNotImplemented(format!(
                "automatic refresh via {} is unavailable; update {} manually",
                url,
                self.path().display()
            ))),
        }
    }
}

/// Profile precedence: config > file default > "default"
fn select_profile<'a>(configured: &'a str, file_default: &'a str) -> &'a str {
    if !configured.is_empty() {
        configured
    } else if !file_default.is_empty() {
        file_default
    } else {
        FALLBACK_PROFILE
    }
}

fn load_auth_file(path: &Path) -> Result<AuthFile> {
    let contents = std::fs::read_to_string(path).map_err(|source| AuthError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| AuthError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse an RFC3339 timestamp into UTC
fn parse_datetime(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s.trim()).map(|dt| dt.with_timezone(&Utc))
}
