use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid ID format: {message}")]
    InvalidId { message: String },

    #[error("Limit exceeded: {message}")]
    LimitExceeded { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Secret store error: {message}")]
    SecretStore { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Timed out: {operation}")]
    Timeout { operation: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invalid_id(message: impl Into<String>) -> Self {
        Self::InvalidId {
            message: message.into(),
        }
    }

    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::LimitExceeded {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn secret_store(message: impl Into<String>) -> Self {
        Self::SecretStore {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::Timeout {
            operation: operation.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether the failure came from an external collaborator (store, persistence)
    pub fn is_dependency_failure(&self) -> bool {
        matches!(
            self,
            Self::SecretStore { .. } | Self::Storage { .. } | Self::Timeout { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("API key 'abc' not found");
        assert_eq!(error.to_string(), "Not found: API key 'abc' not found");
    }

    #[test]
    fn test_limit_exceeded_error() {
        let error = DomainError::limit_exceeded("Merchant 'm-1' already has 5 active keys");
        assert_eq!(
            error.to_string(),
            "Limit exceeded: Merchant 'm-1' already has 5 active keys"
        );
    }

    #[test]
    fn test_timeout_error() {
        let error = DomainError::timeout("secret_store.get");
        assert_eq!(error.to_string(), "Timed out: secret_store.get");
        assert!(error.is_dependency_failure());
    }

    #[test]
    fn test_dependency_classification() {
        assert!(DomainError::storage("down").is_dependency_failure());
        assert!(DomainError::secret_store("down").is_dependency_failure());
        assert!(!DomainError::validation("bad").is_dependency_failure());
        assert!(!DomainError::not_found("gone").is_dependency_failure());
    }
}
