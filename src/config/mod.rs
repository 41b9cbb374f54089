//! Configuration loading

mod app_config;
mod auth_config;

pub use app_config::{AppConfig, LogFormat, LoggingConfig, SecretBackend, SecretsConfig};
pub use auth_config::AuthConfig;
