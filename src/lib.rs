//! PMP Request Auth
//!
//! Authentication core for signed merchant API calls:
//! - HMAC-SHA256 request signing and verification
//! - API key issuance, rotation, revocation and expiry
//! - Replay protection, failed-attempt lockout and rate limiting

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod state;

pub use config::AppConfig;
pub use state::{AuthState, AuthStores};

use std::sync::Arc;

use tracing::info;

use domain::SystemClock;
use infrastructure::secrets::SecretStoreFactory;

/// Create the authentication state from loaded configuration
pub async fn create_auth_state() -> anyhow::Result<AuthState> {
    let config = AppConfig::load()?;
    create_auth_state_with_config(&config).await
}

/// Create the authentication state with custom configuration
pub async fn create_auth_state_with_config(config: &AppConfig) -> anyhow::Result<AuthState> {
    info!("Secret store backend: {:?}", config.secrets.backend);
    let secrets = SecretStoreFactory::create(&config.secrets).await?;

    let state = AuthState::new(
        config,
        AuthStores::with_secret_store(secrets),
        Arc::new(SystemClock),
    )?;

    info!(
        max_skew_seconds = config.auth.max_skew_seconds,
        rotation_overlap_minutes = config.auth.rotation_overlap_minutes,
        "Authentication services ready"
    );

    Ok(state)
}
