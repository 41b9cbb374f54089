//! Secret store domain
//!
//! Key records only carry a [`SecretRef`]; secret bytes live behind a
//! [`SecretStore`].

mod name;
mod store;

pub use name::{SecretName, SecretNameError, SecretNameTemplate, SecretRef};
pub use store::SecretStore;

#[cfg(test)]
pub use store::MockSecretStore;
