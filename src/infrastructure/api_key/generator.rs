//! Signing secret generation

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::domain::{OsRandom, RandomSource};

/// Random bytes per signing secret
pub const SECRET_BYTES: usize = 32;

/// A freshly generated signing secret.
///
/// The HMAC key is the UTF-8 encoding of `secret`, so clients can use the
/// string exactly as handed out.
#[derive(Clone)]
pub struct GeneratedSecret {
    secret: String,
}

impl GeneratedSecret {
    /// Plaintext secret to hand to the key holder
    pub fn expose(&self) -> &str {
        &self.secret
    }

    /// Bytes to store and to key the MAC with
    pub fn key_material(&self) -> &[u8] {
        self.secret.as_bytes()
    }
}

impl std::fmt::Debug for GeneratedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GeneratedSecret([REDACTED])")
    }
}

/// Generator for signing secrets
#[derive(Debug, Clone)]
pub struct SecretGenerator {
    random: Arc<dyn RandomSource>,
    /// Prefix for all generated secrets (e.g. "sk_live_", "sk_test_")
    prefix: String,
}

impl SecretGenerator {
    pub fn new(random: Arc<dyn RandomSource>, prefix: impl Into<String>) -> Self {
        Self {
            random,
            prefix: prefix.into(),
        }
    }

    /// Generator for production secrets
    pub fn production() -> Self {
        Self::new(Arc::new(OsRandom), "sk_live_")
    }

    /// Generate a new secret
    pub fn generate(&self) -> GeneratedSecret {
        let mut random_bytes = [0u8; SECRET_BYTES];
        self.random.fill_bytes(&mut random_bytes);

        GeneratedSecret {
            secret: format!("{}{}", self.prefix, URL_SAFE_NO_PAD.encode(random_bytes)),
        }
    }
}

impl Default for SecretGenerator {
    fn default() -> Self {
        Self::production()
    }
}
