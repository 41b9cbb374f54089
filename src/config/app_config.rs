use serde::{Deserialize, Serialize};

use super::AuthConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub secrets: SecretsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Which secret store backs key secrets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecretBackend {
    #[default]
    InMemory,
    AwsSecretsManager,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    #[serde(default)]
    pub backend: SecretBackend,
    /// Placeholders: {service}, {merchant_id}, {key_id}, {version}
    #[serde(default = "default_name_template")]
    pub name_template: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Cache TTL for fetched secrets; 0 disables caching
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// AWS region; the SDK default chain applies when absent
    #[serde(default)]
    pub region: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_name_template() -> String {
    "{service}/merchants/{merchant_id}/keys/{key_id}/v{version}".to_string()
}

fn default_service_name() -> String {
    "request-auth".to_string()
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            backend: SecretBackend::default(),
            name_template: default_name_template(),
            service_name: default_service_name(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
            region: None,
        }
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local`, `.env` and `APP__*` variables.
    ///
    /// `auth.rotation_overlap_minutes` has no default and must be supplied.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;

        loaded
            .auth
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(loaded)
    }
}
