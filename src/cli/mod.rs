//! CLI module for PMP Request Auth
//!
//! Provides subcommands for working with signed requests:
//! - `sign`: sign a body and print the authentication headers
//! - `nonce`: generate nonces
//! - `config`: print the effective configuration
//! - `demo`: issue, sign and verify against in-memory stores

pub mod demo;
pub mod nonce;
pub mod show_config;
pub mod sign;

use clap::{Parser, Subcommand};

use crate::config::{LogFormat, LoggingConfig};

/// PMP Request Auth - HMAC request signing and API key lifecycle
#[derive(Parser)]
#[command(name = "pmp-request-auth")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            format: if self.log_json {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign a request body
    Sign(sign::SignArgs),

    /// Generate request nonces
    Nonce(nonce::NonceArgs),

    /// Print the effective authentication configuration
    Config,

    /// Issue a key in memory, sign a request with it and verify it
    Demo(demo::DemoArgs),
}
