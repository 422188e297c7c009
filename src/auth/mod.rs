// Authentication module
// Credential providers and token lifecycle

mod cache;
mod federated;
mod file;
mod provider;
mod refresh;
mod session;
mod token;
mod types;

/// Tokens expiring within this many seconds are due for refresh
pub const REFRESH_WINDOW_SECS: i64 = 300;

pub use cache::{load_cache_file, save_cache_file, CachedToken, TokenCache};
pub use federated::FederatedProvider;
pub use file::{FileProvider, FALLBACK_PROFILE};
pub use provider::AuthProvider;
pub use refresh::REFRESH_TIMEOUT_SECS;
pub use session::AuthSession;
pub use token::TokenProvider;
pub use types::{
    AuthConfig, AuthFile, AuthType, Credentials, FederatedConfig, FileConfig, Profile,
    TokenConfig, META_PROFILE, META_SOURCE, META_TOKEN_TYPE,
};
