//! In-memory token cache and its optional on-disk mirror.
//!
//! The token and its expiry are only ever read or written as one
//! [`CachedToken`] value, so no reader can observe a token paired with
//! another token's expiry.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AuthError, Result};

/// Token plus the instant it stops being valid
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedToken {
    pub token: String,
    /// `None` means the cache was never populated
    pub expires_at: Option<DateTime<Utc>>,
    /// Token type reported with this token; not persisted
    #[serde(skip)]
    pub token_type: String,
}

impl CachedToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at: Some(expires_at),
            token_type: String::new(),
        }
    }

    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = token_type.into();
        self
    }

    /// Non-empty and not yet expired
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => !self.token.is_empty() && exp > now,
            None => false,
        }
    }

    /// Less than `window` remains before expiry (always true when unset)
    pub fn expires_within(&self, window: Duration, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(exp) => exp - now < window,
            None => true,
        }
    }
}

/// Thread-safe holder for the current [`CachedToken`]
#[derive(Debug, Default)]
pub struct TokenCache {
    inner: RwLock<CachedToken>,
}

impl TokenCache {
    pub fn new(initial: CachedToken) -> Self {
        Self {
            inner: RwLock::new(initial),
        }
    }

    /// Consistent copy of the current pair
    pub fn snapshot(&self) -> CachedToken {
        self.inner.read().clone()
    }

    /// Replace the pair, returning the previous one
    pub fn store(&self, next: CachedToken) -> CachedToken {
        std::mem::replace(&mut *self.inner.write(), next)
    }

    /// Replace the pair only if it still equals `expected`.
    ///
    /// Returns false and leaves the cache untouched otherwise.
    pub fn compare_and_swap(&self, expected: &CachedToken, next: CachedToken) -> bool {
        let mut guard = self.inner.write();
        if *guard != *expected {
            return false;
        }
        *guard = next;
        true
    }
}

/// Load a cache file written by [`save_cache_file`]
pub fn load_cache_file(path: &Path) -> Result<CachedToken> {
    let contents = std::fs::read_to_string(path).map_err(|source| AuthError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| AuthError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write the cache file atomically with owner-only permissions.
///
/// Parent directories are created as needed (0700 on Unix). The data goes to a
/// uniquely named temp file first and is renamed over `path`.
pub fn save_cache_file(path: &Path, cached: &CachedToken) -> Result<()> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let io_err = |source| AuthError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_private_dir(parent).map_err(io_err)?;
    }

    let json = serde_json::to_string_pretty(cached).map_err(|source| AuthError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp_name = format!(
        "{}.{}.{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy(),
        std::process::id(),
        seq,
    );
    let tmp_path = path.with_file_name(tmp_name);

    if let Err(e) = write_private_file(&tmp_path, json.as_bytes()) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(e));
    }
    if let Err(e) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(io_err(e));
    }
    Ok(())
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(unix)]
fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // mode() only applies on creation and is subject to the umask
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_cache_needs_refresh() {
        let cached = CachedToken::default();
        let now = Utc::now();
        assert!(!cached.is_valid_at(now));
        assert!(cached.expires_within(Duration::minutes(5), now));
    }

    #[test]
    fn test_refresh_window() {
        let now = Utc::now();
        let far = CachedToken::new("tok", now + Duration::minutes(10));
        assert!(far.is_valid_at(now));
        assert!(!far.expires_within(Duration::minutes(5), now));

        let near = CachedToken::new("tok", now + Duration::minutes(2));
        assert!(near.is_valid_at(now));
        assert!(near.expires_within(Duration::minutes(5), now));

        let past = CachedToken::new("tok", now - Duration::seconds(1));
        assert!(!past.is_valid_at(now));
    }

    #[test]
    fn test_empty_token_is_invalid() {
        let now = Utc::now();
        let cached = CachedToken::new("", now + Duration::hours(1));
        assert!(!cached.is_valid_at(now));
    }

    #[test]
    fn test_store_and_snapshot() {
        let cache = TokenCache::default();
        let next = CachedToken::new("a", Utc::now() + Duration::hours(1));

        let previous = cache.store(next.clone());
        assert_eq!(previous, CachedToken::default());
        assert_eq!(cache.snapshot(), next);
    }

    #[test]
    fn test_compare_and_swap() {
        let first = CachedToken::new("a", Utc::now() + Duration::hours(1));
        let cache = TokenCache::new(first.clone());

        let stale = CachedToken::new("old", Utc::now());
        let second = CachedToken::new("b", Utc::now() + Duration::hours(2));
        assert!(!cache.compare_and_swap(&stale, second.clone()));
        assert_eq!(cache.snapshot().token, "a");

        assert!(cache.compare_and_swap(&first, second.clone()));
        assert_eq!(cache.snapshot(), second);
    }

    #[test]
    fn test_token_type_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let expires_at = Utc::now() + Duration::hours(1);

        save_cache_file(&path, &CachedToken::new("tok", expires_at).with_token_type("Bearer"))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("tokenType").is_none());
        assert!(load_cache_file(&path).unwrap().token_type.is_empty());
    }

    #[test]
    fn test_cache_file_roundtrip_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("token.json");
        let expires_at = DateTime::parse_from_rfc3339("2030-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        save_cache_file(&path, &CachedToken::new("newtok", expires_at)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["token"], "newtok");
        assert_eq!(raw["expiresAt"], "2030-06-01T12:00:00Z");

        let loaded = load_cache_file(&path).unwrap();
        assert_eq!(loaded.expires_at, Some(expires_at));

        // No temp files left behind
        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_cache_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let parent = dir.path().join("cache");
        let path = parent.join("token.json");
        save_cache_file(&path, &CachedToken::new("t", Utc::now())).unwrap();

        let file_mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = std::fs::metadata(&parent).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode & 0o077, 0);
    }

    #[test]
    fn test_load_malformed_cache_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_cache_file(&path), Err(AuthError::Parse { .. })));

        let missing = dir.path().join("missing.json");
        assert!(matches!(load_cache_file(&missing), Err(AuthError::Io { .. })));
    }
}
