//! # Secret Stores
//!
//! Clients for the two independent stores the credential bundle is written
//! to: AWS Secrets Manager (primary) and Kubernetes Secrets (secondary).
//! Both writes carry the identical JSON bundle and share one random name
//! suffix per run; consistency is by construction, not by transaction.

pub mod aws;
pub mod kubernetes;

use crate::credentials::CredentialBundle;
use async_trait::async_trait;

pub use aws::{AwsSecretsStore, SecretStoreError};
pub use kubernetes::{KubernetesSecretsStore, SecondaryStoreError};

/// Durable identifier returned by a successful primary store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimarySecretReceipt {
    pub arn: String,
    pub version_id: String,
}

/// Durable identifier returned by a successful secondary store write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubernetesSecretReceipt {
    pub uid: String,
    pub resource_version: String,
    pub namespace: String,
}

/// Seam for the primary store stage; production implementation is
/// [`AwsSecretsStore`].
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    async fn put_secret(
        &self,
        name: &str,
        bundle: &CredentialBundle,
    ) -> Result<PrimarySecretReceipt, SecretStoreError>;
}

/// Seam for the secondary store stage; production implementation is
/// [`KubernetesSecretsStore`].
#[async_trait]
pub trait SecondaryStore: Send + Sync {
    async fn put_namespaced_secret(
        &self,
        name: &str,
        bundle: &CredentialBundle,
    ) -> Result<KubernetesSecretReceipt, SecondaryStoreError>;
}
