use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::auth::{AuthConfig, AuthType, FederatedConfig, FileConfig, TokenConfig};

/// Environment variable holding a bearer token for the default token path
pub const DEFAULT_TOKEN_ENV_VAR: &str = "KODAMA_CLAUDE_TOKEN";

/// Default credential file, relative to the home directory
pub const DEFAULT_AUTH_FILE: &str = ".kodama/claude-auth.json";

/// Credential helper for the kodama remote-exec agent
#[derive(Parser, Default)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Authentication strategy (token, file, federated); omit for automatic detection
    #[arg(short = 't', long, env = "KODAMA_AUTH_TYPE")]
    pub auth_type: Option<String>,

    /// Literal bearer token (token strategy)
    #[arg(long, env = "KODAMA_AUTH_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Environment variable to read the token from (token strategy)
    #[arg(long, env = "KODAMA_AUTH_TOKEN_ENV")]
    pub token_env: Option<String>,

    /// Credential file path (file strategy)
    #[arg(short = 'f', long, env = "KODAMA_AUTH_FILE")]
    pub auth_file: Option<String>,

    /// Profile name inside the credential file (file strategy)
    #[arg(short = 'p', long, env = "KODAMA_AUTH_PROFILE")]
    pub profile: Option<String>,

    /// OAuth token endpoint (federated strategy)
    #[arg(long, env = "KODAMA_TOKEN_ENDPOINT")]
    pub token_endpoint: Option<String>,

    /// OAuth refresh token (federated strategy)
    #[arg(long, env = "KODAMA_REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// OAuth client id (federated strategy)
    #[arg(long, env = "KODAMA_CLIENT_ID")]
    pub client_id: Option<String>,

    /// OAuth client secret (federated strategy)
    #[arg(long, env = "KODAMA_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Where to cache the federated access token
    #[arg(long, env = "KODAMA_TOKEN_CACHE")]
    pub cache_file: Option<String>,

    /// Print only the raw token on stdout
    #[arg(long)]
    pub print_token: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Explicit strategy selection; `None` means default resolution
    pub auth: Option<AuthConfig>,
    pub print_token: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        Self::from_args(CliArgs::parse())
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let auth = match args.auth_type.as_deref() {
            None | Some("") => None,
            Some(tag) => {
                let auth_type: AuthType = tag.parse().context("Invalid --auth-type")?;
                Some(AuthConfig {
                    auth_type,
                    token: TokenConfig {
                        token: args.token.unwrap_or_default(),
                        env_var: args.token_env.unwrap_or_default(),
                        default_env_override: None,
                    },
                    file: FileConfig {
                        path: args.auth_file.unwrap_or_default(),
                        profile: args.profile.unwrap_or_default(),
                    },
                    federated: FederatedConfig {
                        token_endpoint: args.token_endpoint.unwrap_or_default(),
                        refresh_token: args.refresh_token.unwrap_or_default(),
                        client_id: args.client_id.unwrap_or_default(),
                        client_secret: args.client_secret.unwrap_or_default(),
                        cache_file: args.cache_file.unwrap_or_default(),
                    },
                })
            }
        };

        Ok(Config {
            auth,
            print_token: args.print_token,
            log_level: args.log_level,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let Some(auth) = &self.auth else {
            return Ok(());
        };

        match auth.auth_type {
            AuthType::Token => {}
            AuthType::File => {
                let path = resolve_auth_file(&auth.file.path);
                if !path.exists() {
                    anyhow::bail!("Credential file does not exist: {}", path.display());
                }
            }
            AuthType::Federated => {
                if auth.federated.token_endpoint.is_empty() {
                    anyhow::bail!(
                        "Token endpoint is required (use --token-endpoint or set KODAMA_TOKEN_ENDPOINT)"
                    );
                }
                if auth.federated.refresh_token.is_empty() {
                    anyhow::bail!(
                        "Refresh token is required (use --refresh-token or set KODAMA_REFRESH_TOKEN)"
                    );
                }
            }
        }

        Ok(())
    }
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths are left untouched when the home directory cannot be resolved.
pub fn expand_tilde(path: &str) -> PathBuf {
    expand_tilde_with(path, dirs::home_dir().as_deref())
}

fn expand_tilde_with(path: &str, home: Option<&Path>) -> PathBuf {
    if let Some(home) = home {
        if path == "~" {
            return home.to_path_buf();
        }
        if let Some(rest) = path.strip_prefix("~/") {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Default credential file location, if the home directory is known
pub fn default_auth_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(DEFAULT_AUTH_FILE))
}

/// Credential file path for a configured value; empty means the default
pub fn resolve_auth_file(configured: &str) -> PathBuf {
    if configured.is_empty() {
        return default_auth_file().unwrap_or_else(|| PathBuf::from(DEFAULT_AUTH_FILE));
    }
    expand_tilde(configured)
}
