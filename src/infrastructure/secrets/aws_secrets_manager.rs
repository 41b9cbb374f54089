use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::domain::{DomainError, SecretName, SecretRef, SecretStore};

/// Trait for AWS Secrets Manager client operations (for mocking)
#[async_trait]
pub trait SecretsManagerClientTrait: Send + Sync + std::fmt::Debug {
    async fn get_secret_value(&self, secret_id: &str) -> Result<String, DomainError>;

    /// Create a secret and return its ARN
    async fn create_secret(&self, name: &str, value: &str) -> Result<String, DomainError>;
}

/// Real AWS Secrets Manager client wrapper
#[derive(Debug)]
pub struct RealSecretsManagerClient {
    client: SecretsManagerClient,
}

impl RealSecretsManagerClient {
    pub fn new(client: SecretsManagerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretsManagerClientTrait for RealSecretsManagerClient {
    async fn get_secret_value(&self, secret_id: &str) -> Result<String, DomainError> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .map_err(|e| DomainError::secret_store(format!("AWS Secrets Manager error: {}", e)))?;

        response
            .secret_string()
            .map(|s| s.to_string())
            .ok_or_else(|| DomainError::secret_store("Secret does not contain a string value"))
    }

    async fn create_secret(&self, name: &str, value: &str) -> Result<String, DomainError> {
        let response = self
            .client
            .create_secret()
            .name(name)
            .secret_string(value)
            .send()
            .await
            .map_err(|e| DomainError::secret_store(format!("AWS Secrets Manager error: {}", e)))?;

        Ok(response.arn().unwrap_or(name).to_string())
    }
}

/// Secret store backed by AWS Secrets Manager.
///
/// Secret bytes are kept base64-encoded in the secret string.
#[derive(Debug)]
pub struct AwsSecretsManagerStore<C: SecretsManagerClientTrait> {
    client: C,
}

impl AwsSecretsManagerStore<RealSecretsManagerClient> {
    pub async fn new(region: Option<&str>) -> Result<Self, DomainError> {
        let config = if let Some(region) = region {
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(region.to_string()))
                .load()
                .await
        } else {
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .load()
                .await
        };

        Ok(Self {
            client: RealSecretsManagerClient::new(SecretsManagerClient::new(&config)),
        })
    }
}

impl<C: SecretsManagerClientTrait> AwsSecretsManagerStore<C> {
    pub fn with_client(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: SecretsManagerClientTrait> SecretStore for AwsSecretsManagerStore<C> {
    async fn get(&self, secret_ref: &SecretRef) -> Result<Vec<u8>, DomainError> {
        let encoded = self.client.get_secret_value(secret_ref.as_str()).await?;

        STANDARD.decode(encoded.trim()).map_err(|e| {
            DomainError::secret_store(format!(
                "Secret '{}' is not valid base64: {}",
                secret_ref, e
            ))
        })
    }

    async fn put(&self, name: &SecretName, secret: &[u8]) -> Result<SecretRef, DomainError> {
        let arn = self
            .client
            .create_secret(name.as_str(), &STANDARD.encode(secret))
            .await?;

        tracing::debug!(secret_name = %name, "Stored secret in AWS Secrets Manager");
        Ok(SecretRef::new(arn))
    }

    fn store_name(&self) -> &'static str {
        "aws_secrets_manager"
    }
}
