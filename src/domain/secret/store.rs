use async_trait::async_trait;
use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

use super::{SecretName, SecretRef};
use crate::domain::DomainError;

/// Key-value secret storage (secrets manager, vault, ...)
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SecretStore: Send + Sync + Debug {
    /// Fetch secret bytes by reference
    async fn get(&self, secret_ref: &SecretRef) -> Result<Vec<u8>, DomainError>;

    /// Store secret bytes under a name and return the handle to persist
    async fn put(&self, name: &SecretName, secret: &[u8]) -> Result<SecretRef, DomainError>;

    /// Backend name for logging
    fn store_name(&self) -> &'static str;
}
