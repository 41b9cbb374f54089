//! Nonce generation
//!
//! Nonces are fixed-length random tokens, base64 encoded, drawn from an
//! injected [`RandomSource`].

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::domain::{OsRandom, RandomSource};

/// Minimum nonce size: 128 bits of entropy
pub const MIN_NONCE_BYTES: usize = 16;

/// Longest nonce a verifier accepts, in encoded characters
pub const MAX_NONCE_LENGTH: usize = 256;

/// Largest nonce size whose encoding fits in [`MAX_NONCE_LENGTH`]
pub const MAX_NONCE_BYTES: usize = MAX_NONCE_LENGTH / 4 * 3;

/// Generator for single-use request nonces
#[derive(Debug, Clone)]
pub struct NonceGenerator {
    random: Arc<dyn RandomSource>,
    bytes: usize,
}

impl NonceGenerator {
    /// Create a generator; sizes are clamped to the accepted range
    pub fn new(random: Arc<dyn RandomSource>, bytes: usize) -> Self {
        Self {
            random,
            bytes: bytes.clamp(MIN_NONCE_BYTES, MAX_NONCE_BYTES),
        }
    }

    /// Generator backed by the operating system CSPRNG
    pub fn os() -> Self {
        Self::new(Arc::new(OsRandom), MIN_NONCE_BYTES)
    }

    pub fn byte_len(&self) -> usize {
        self.bytes
    }

    /// Generate a new nonce
    pub fn generate(&self) -> String {
        let mut buf = vec![0u8; self.bytes];
        self.random.fill_bytes(&mut buf);
        STANDARD.encode(&buf)
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::os()
    }
}
