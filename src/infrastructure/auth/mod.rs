//! Request signing and verification
//!
//! Client-side signing, nonce generation, and the verifier with its replay,
//! lockout and rate-limit state.

mod attempt_tracker;
mod nonce;
mod nonce_cache;
mod request_signer;
mod signer;
mod verifier;

pub use attempt_tracker::{AttemptTracker, LockoutPolicy};
pub use nonce::{NonceGenerator, MAX_NONCE_BYTES, MIN_NONCE_BYTES};
pub use nonce_cache::{NonceCache, NonceReservation};
pub use request_signer::RequestSigner;
pub use signer::HmacSigner;
pub use verifier::Verifier;
