//! Nonce command - prints fresh request nonces

use std::sync::Arc;

use clap::Args;

use crate::domain::OsRandom;
use crate::infrastructure::auth::{NonceGenerator, MAX_NONCE_BYTES, MIN_NONCE_BYTES};

/// Arguments for the nonce command
#[derive(Args, Clone)]
pub struct NonceArgs {
    /// How many nonces to print
    #[arg(long, default_value_t = 1)]
    pub count: usize,

    /// Random bytes per nonce
    #[arg(long, default_value_t = MIN_NONCE_BYTES, value_parser = parse_nonce_bytes)]
    pub bytes: usize,
}

/// Run the nonce command
pub fn run(args: NonceArgs) -> anyhow::Result<()> {
    let generator = NonceGenerator::new(Arc::new(OsRandom), args.bytes);
    for _ in 0..args.count {
        println!("{}", generator.generate());
    }

    Ok(())
}

/// Accept only sizes a verifier will take
pub(crate) fn parse_nonce_bytes(value: &str) -> Result<usize, String> {
    let bytes: usize = value.parse().map_err(|e| format!("{}", e))?;

    if (MIN_NONCE_BYTES..=MAX_NONCE_BYTES).contains(&bytes) {
        Ok(bytes)
    } else {
        Err(format!(
            "must be between {} and {}",
            MIN_NONCE_BYTES, MAX_NONCE_BYTES
        ))
    }
}
