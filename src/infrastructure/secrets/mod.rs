//! Secret store implementations
//!
//! Key secrets can be kept in process memory (tests and local runs) or in
//! AWS Secrets Manager, optionally behind a TTL cache.

mod aws_secrets_manager;
mod cached;
mod factory;
mod in_memory;

pub use aws_secrets_manager::{
    AwsSecretsManagerStore, RealSecretsManagerClient, SecretsManagerClientTrait,
};
pub use cached::CachedSecretStore;
pub use factory::SecretStoreFactory;
pub use in_memory::InMemorySecretStore;
