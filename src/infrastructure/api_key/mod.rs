//! API Key infrastructure implementations
//!
//! This module provides secret generation, in-memory storage, rate limiting
//! and the key lifecycle service.

mod generator;
mod rate_limiter;
mod repository;
mod service;

pub use generator::{GeneratedSecret, SecretGenerator, SECRET_BYTES};
pub use rate_limiter::{RateLimitDecision, RateLimiter};
pub use repository::InMemoryApiKeyRepository;
pub use service::{ApiKeyService, IssuedApiKey, SweepReport};
