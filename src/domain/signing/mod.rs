//! Signed request domain
//!
//! Defines the envelope exchanged between signing clients and the verifier and
//! the canonical form that is fed into the MAC.

mod canonical;
mod envelope;

pub use canonical::{canonical_json, canonical_string};
pub use envelope::{
    format_timestamp, parse_timestamp, EnvelopeError, SignedRequestEnvelope, HEADER_KEY_ID,
    HEADER_MERCHANT_ID, HEADER_NONCE, HEADER_SIGNATURE, HEADER_TIMESTAMP,
};
