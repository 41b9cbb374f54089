//! Config command - prints the effective authentication configuration

use serde_json::json;

use crate::config::AppConfig;

/// Run the config command
pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    config.auth.validate()?;

    let effective = json!({
        "auth": config.auth,
        "secrets": config.secrets,
    });
    println!("{}", serde_json::to_string_pretty(&effective)?);

    Ok(())
}
