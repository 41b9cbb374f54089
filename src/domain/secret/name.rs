use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Handle of a stored secret; safe to persist and log
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretRef(String);

impl SecretRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecretRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rendered name under which a secret is written
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretName(String);

impl SecretName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecretName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SecretNameError {
    #[error("Secret name template cannot be empty")]
    Empty,

    #[error("Unknown placeholder '{{{0}}}' in secret name template")]
    UnknownPlaceholder(String),

    #[error("Unclosed placeholder in secret name template")]
    Unclosed,
}

const PLACEHOLDERS: [&str; 4] = ["merchant_id", "service", "key_id", "version"];

/// Secret naming scheme, e.g. `{service}/merchants/{merchant_id}/keys/{key_id}/v{version}`
///
/// Placeholders are checked when the template is built so rendering cannot fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretNameTemplate {
    template: String,
    service: String,
}

impl SecretNameTemplate {
    pub fn new(
        template: impl Into<String>,
        service: impl Into<String>,
    ) -> Result<Self, SecretNameError> {
        let template = template.into();

        if template.trim().is_empty() {
            return Err(SecretNameError::Empty);
        }

        let mut rest = template.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let end = after.find('}').ok_or(SecretNameError::Unclosed)?;
            let placeholder = &after[..end];

            if !PLACEHOLDERS.contains(&placeholder) {
                return Err(SecretNameError::UnknownPlaceholder(placeholder.to_string()));
            }

            rest = &after[end + 1..];
        }

        Ok(Self {
            template,
            service: service.into(),
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Render the name of one secret version
    pub fn render(&self, merchant_id: &str, key_id: &str, version: u32) -> SecretName {
        let name = self
            .template
            .replace("{merchant_id}", merchant_id)
            .replace("{service}", &self.service)
            .replace("{key_id}", key_id)
            .replace("{version}", &version.to_string());

        SecretName(name)
    }
}
