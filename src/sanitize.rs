//! Token redaction for logs and error output.
//!
//! Every token obtained from a provider is registered here before it is used
//! in a command or log line, so any message built afterward can be scrubbed.

use std::collections::HashSet;
use std::fmt;

use parking_lot::RwLock;
use thiserror::Error;

/// Replacement text for every registered secret.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Thread-safe registry of secrets to strip from text.
#[derive(Default)]
pub struct Sanitizer {
    tokens: RwLock<HashSet<String>>,
}

impl fmt::Debug for Sanitizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sanitizer")
            .field("tokens", &self.len())
            .finish()
    }
}

/// An error whose message has been scrubbed of registered secrets.
///
/// The original error is dropped: its structured fields could still hold the
/// secret, so only the flattened, sanitized message survives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SanitizedError {
    message: String,
}

impl SanitizedError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret. Empty strings are ignored.
    pub fn add_token(&self, token: &str) {
        if token.is_empty() {
            return;
        }
        self.tokens.write().insert(token.to_string());
    }

    /// Replace every registered secret in `text` with [`REDACTION_MARKER`].
    ///
    /// Longer secrets are replaced first so that a secret containing another
    /// registered secret is redacted as a whole.
    pub fn sanitize(&self, text: &str) -> String {
        let mut tokens: Vec<String> = self.tokens.read().iter().cloned().collect();
        if tokens.is_empty() {
            return text.to_string();
        }
        tokens.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let mut out = text.to_string();
        for token in &tokens {
            if out.contains(token.as_str()) {
                out = out.replace(token.as_str(), REDACTION_MARKER);
            }
        }
        out
    }

    /// Flatten `err` (including its `{:#}` chain) into a sanitized error.
    pub fn sanitize_error<E: fmt::Display + ?Sized>(&self, err: &E) -> SanitizedError {
        SanitizedError {
            message: self.sanitize(&format!("{err:#}")),
        }
    }

    /// Pass `Ok` through untouched and sanitize the error of `Err`.
    pub fn sanitize_result<T, E: fmt::Display>(
        &self,
        result: std::result::Result<T, E>,
    ) -> std::result::Result<T, SanitizedError> {
        result.map_err(|e| self.sanitize_error(&e))
    }

    /// Forget every registered secret.
    pub fn clear(&self) {
        self.tokens.write().clear();
    }

    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}
