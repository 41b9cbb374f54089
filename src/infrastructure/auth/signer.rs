//! HMAC-SHA256 request signing

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::domain::signing::canonical_string;

type HmacSha256 = Hmac<Sha256>;

/// Stateless signer over `timestamp:nonce:body`
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner;

impl HmacSigner {
    /// Compute the base64 signature. Deterministic for identical inputs.
    pub fn sign(secret: &[u8], timestamp: &str, nonce: &str, canonical_body: &str) -> String {
        let mac = Self::mac(secret, timestamp, nonce, canonical_body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    /// Check a supplied base64 signature in constant time.
    ///
    /// Undecodable signatures never match.
    pub fn verify(
        secret: &[u8],
        timestamp: &str,
        nonce: &str,
        canonical_body: &str,
        signature: &str,
    ) -> bool {
        let supplied = match STANDARD.decode(signature.trim()) {
            Ok(bytes) => bytes,
            Err(_) => return false,
        };

        Self::mac(secret, timestamp, nonce, canonical_body)
            .verify_slice(&supplied)
            .is_ok()
    }

    fn mac(secret: &[u8], timestamp: &str, nonce: &str, canonical_body: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
        mac.update(canonical_string(timestamp, nonce, canonical_body).as_bytes());
        mac
    }
}
