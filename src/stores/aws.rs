//! # Primary Secret Store
//!
//! Writes the credential bundle to AWS Secrets Manager. The secret carries a
//! fixed description and a `managed-by=runops` ownership tag so cleanup
//! tooling can discover it later. Failures are classified from the service
//! error code; there is no retry at this layer.

use crate::credentials::CredentialBundle;
use crate::stores::{PrimarySecretReceipt, PrimaryStore};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_secretsmanager::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::operation::create_secret::CreateSecretError;
use aws_sdk_secretsmanager::types::Tag;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use thiserror::Error;
use tracing::debug;

const SECRET_DESCRIPTION: &str = "Created by Runops template";
const OWNERSHIP_TAG_KEY: &str = "managed-by";
const OWNERSHIP_TAG_VALUE: &str = "runops";

/// Errors raised while writing the primary secret.
#[derive(Error, Debug)]
pub enum SecretStoreError {
    /// The secret name is already taken.
    #[error("secret name already exists: {name}")]
    AlreadyExists { name: String },

    /// The caller is not allowed to create the secret.
    #[error("access denied creating secret {name}: {message}")]
    AccessDenied { name: String, message: String },

    /// Network or throttling failure; a whole-pipeline retry may succeed.
    #[error("transient failure creating secret {name}: {message}")]
    Transient { name: String, message: String },

    /// Any other service rejection.
    #[error("secrets manager rejected {name}: {message}")]
    Service { name: String, message: String },

    /// The credential bundle could not be serialized.
    #[error("failed to serialize credential bundle")]
    Serialization(#[from] serde_json::Error),
}

/// AWS Secrets Manager client for the primary store.
#[derive(Clone)]
pub struct AwsSecretsStore {
    client: SecretsManagerClient,
}

impl AwsSecretsStore {
    /// Build the client from the SDK's default chain (environment
    /// credentials and region).
    pub async fn from_env() -> Self {
        let shared_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(SecretsManagerClient::new(&shared_config))
    }

    pub fn new(client: SecretsManagerClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PrimaryStore for AwsSecretsStore {
    async fn put_secret(
        &self,
        name: &str,
        bundle: &CredentialBundle,
    ) -> Result<PrimarySecretReceipt, SecretStoreError> {
        let payload = serde_json::to_string(bundle)?;

        debug!(name = %name, "Creating secret in AWS Secrets Manager");
        let response = self
            .client
            .create_secret()
            .name(name)
            .description(SECRET_DESCRIPTION)
            .secret_string(payload)
            .tags(
                Tag::builder()
                    .key(OWNERSHIP_TAG_KEY)
                    .value(OWNERSHIP_TAG_VALUE)
                    .build(),
            )
            .send()
            .await
            .map_err(|error| classify_create_error(name, error))?;

        Ok(PrimarySecretReceipt {
            arn: response.arn().unwrap_or_default().to_string(),
            version_id: response.version_id().unwrap_or_default().to_string(),
        })
    }
}

fn classify_create_error(name: &str, error: SdkError<CreateSecretError>) -> SecretStoreError {
    match &error {
        SdkError::ServiceError(context) => {
            let service_error = context.err();
            if service_error.is_resource_exists_exception() {
                return SecretStoreError::AlreadyExists { name: name.to_string() };
            }

            let message = service_error
                .message()
                .unwrap_or("unknown service error")
                .to_string();
            match service_error.code() {
                Some("AccessDeniedException") => {
                    SecretStoreError::AccessDenied { name: name.to_string(), message }
                }
                Some("InternalServiceError") | Some("ThrottlingException") => {
                    SecretStoreError::Transient { name: name.to_string(), message }
                }
                _ => SecretStoreError::Service { name: name.to_string(), message },
            }
        }
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => SecretStoreError::Transient {
            name: name.to_string(),
            message: error.to_string(),
        },
        _ => SecretStoreError::Service {
            name: name.to_string(),
            message: error.to_string(),
        },
    }
}
