//! Client-side request signing
//!
//! Produces complete [`SignedRequestEnvelope`]s for outbound calls.

use std::sync::Arc;

use serde_json::Value;

use super::nonce::NonceGenerator;
use super::signer::HmacSigner;
use crate::domain::signing::{canonical_json, format_timestamp, SignedRequestEnvelope};
use crate::domain::{Clock, SystemClock};

/// Signs outbound requests on behalf of one key
#[derive(Clone)]
pub struct RequestSigner {
    merchant_id: String,
    key_id: String,
    secret: Vec<u8>,
    nonces: NonceGenerator,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("merchant_id", &self.merchant_id)
            .field("key_id", &self.key_id)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl RequestSigner {
    pub fn new(
        merchant_id: impl Into<String>,
        key_id: impl Into<String>,
        secret: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            key_id: key_id.into(),
            secret: secret.into(),
            nonces: NonceGenerator::os(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_nonce_generator(mut self, nonces: NonceGenerator) -> Self {
        self.nonces = nonces;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sign a raw body exactly as it will be sent
    pub fn sign_body(&self, body: &str) -> SignedRequestEnvelope {
        let timestamp = format_timestamp(self.clock.now());
        let nonce = self.nonces.generate();
        let signature = HmacSigner::sign(&self.secret, &timestamp, &nonce, body);

        SignedRequestEnvelope {
            merchant_id: self.merchant_id.clone(),
            key_id: self.key_id.clone(),
            timestamp,
            nonce,
            signature,
            canonical_body: body.to_string(),
        }
    }

    /// Canonicalize a JSON body, then sign it
    pub fn sign_json(&self, body: &Value) -> SignedRequestEnvelope {
        self.sign_body(&canonical_json(body))
    }
}
