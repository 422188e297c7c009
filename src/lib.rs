// Kodama auth - credential providers and token redaction

pub mod auth;
pub mod config;
pub mod error;
pub mod sanitize;

pub use auth::{AuthProvider, AuthSession, Credentials};
pub use error::AuthError;
pub use sanitize::{SanitizedError, Sanitizer};
