use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use kodama_auth::auth::{AuthProvider, AuthSession, Credentials};
use kodama_auth::config::Config;
use kodama_auth::sanitize::{Sanitizer, REDACTION_MARKER};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;

    // Logs go to stderr so stdout only ever carries the requested output
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    config.validate()?;

    let sanitizer = Arc::new(Sanitizer::new());

    let provider = match &config.auth {
        Some(auth) => AuthProvider::from_config(auth),
        None => AuthProvider::resolve_default(),
    };
    let provider = match provider {
        Ok(provider) => provider,
        Err(e) => fail(&sanitizer, &e),
    };
    tracing::info!("Using {} authentication", provider.auth_type());

    let session = AuthSession::new(provider, sanitizer.clone());

    // Dropping the future on Ctrl+C abandons any in-flight refresh
    let creds = tokio::select! {
        result = session.credentials() => match result {
            Ok(creds) => creds,
            Err(e) => fail(&sanitizer, &e),
        },
        _ = shutdown_signal() => {
            tracing::warn!("Interrupted before credentials were obtained");
            std::process::exit(130);
        }
    };

    if config.print_token {
        println!("{}", creds.token);
    } else {
        println!("{}", serde_json::to_string_pretty(&summary(&session, &creds))?);
    }

    Ok(())
}

/// Sanitized, display-safe view of the obtained credentials
fn summary(session: &AuthSession, creds: &Credentials) -> serde_json::Value {
    json!({
        "type": session.auth_type().as_str(),
        "token": REDACTION_MARKER,
        "expiresAt": creds.expires_at.map(|t| t.to_rfc3339()),
        "needsRefresh": session.provider().needs_refresh(),
        "metadata": creds.metadata,
    })
}

fn fail(sanitizer: &Sanitizer, err: &kodama_auth::AuthError) -> ! {
    // Printed directly so it shows regardless of the log filter
    eprintln!("error: {}", sanitizer.sanitize_error(err));
    std::process::exit(1);
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
