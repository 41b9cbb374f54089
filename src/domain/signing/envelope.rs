use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HEADER_MERCHANT_ID: &str = "X-Merchant-Id";
pub const HEADER_KEY_ID: &str = "X-Api-Key-Id";
pub const HEADER_TIMESTAMP: &str = "X-Timestamp";
pub const HEADER_NONCE: &str = "X-Nonce";
pub const HEADER_SIGNATURE: &str = "X-Signature";

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EnvelopeError {
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    #[error("Empty header: {0}")]
    EmptyHeader(&'static str),
}

/// A signed request as it travels between client and verifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequestEnvelope {
    pub merchant_id: String,
    pub key_id: String,
    /// ISO-8601 UTC timestamp, signed exactly as sent
    pub timestamp: String,
    pub nonce: String,
    /// Standard base64 HMAC-SHA256
    pub signature: String,
    /// The exact body bytes that were signed
    pub canonical_body: String,
}

impl SignedRequestEnvelope {
    /// Authentication headers, one distinct field each
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (HEADER_MERCHANT_ID, self.merchant_id.clone()),
            (HEADER_KEY_ID, self.key_id.clone()),
            (HEADER_TIMESTAMP, self.timestamp.clone()),
            (HEADER_NONCE, self.nonce.clone()),
            (HEADER_SIGNATURE, self.signature.clone()),
        ]
    }

    /// Rebuild an envelope from request headers (names matched case-insensitively)
    pub fn from_headers<'a, I>(headers: I, canonical_body: impl Into<String>) -> Result<Self, EnvelopeError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let headers: Vec<(&str, &str)> = headers.into_iter().collect();

        let find = |name: &'static str| -> Result<String, EnvelopeError> {
            let value = headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.trim())
                .ok_or(EnvelopeError::MissingHeader(name))?;

            if value.is_empty() {
                return Err(EnvelopeError::EmptyHeader(name));
            }

            Ok(value.to_string())
        };

        Ok(Self {
            merchant_id: find(HEADER_MERCHANT_ID)?,
            key_id: find(HEADER_KEY_ID)?,
            timestamp: find(HEADER_TIMESTAMP)?,
            nonce: find(HEADER_NONCE)?,
            signature: find(HEADER_SIGNATURE)?,
            canonical_body: canonical_body.into(),
        })
    }
}

/// Format an instant the way signing clients send it: `2024-01-01T00:00:00Z`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an ISO-8601 / RFC 3339 timestamp into UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
