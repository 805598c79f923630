//! # Secondary Secret Store
//!
//! Mirrors the credential bundle into a namespaced Kubernetes Secret. The
//! base64 access credential is decoded into a scoped temporary kubeconfig
//! file that never outlives the write call: the file is removed on drop,
//! including every failure path.

use crate::config::SecretString;
use crate::credentials::CredentialBundle;
use crate::stores::{KubernetesSecretReceipt, SecondaryStore};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::PostParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

const OWNERSHIP_LABEL_KEY: &str = "managed-by";
const OWNERSHIP_LABEL_VALUE: &str = "runops";
const SECRET_TYPE: &str = "Opaque";

/// Errors raised while writing the secondary secret.
#[derive(Error, Debug)]
pub enum SecondaryStoreError {
    /// The access credential blob is not valid base64 or not a kubeconfig.
    #[error("invalid kubeconfig data: {reason}")]
    InvalidKubeconfig { reason: String },

    /// The target namespace does not exist.
    #[error("namespace not found: {namespace}")]
    NamespaceNotFound { namespace: String },

    /// A secret with the same name already exists in the namespace.
    #[error("secret name already exists: {name}")]
    Conflict { name: String },

    /// The credential was rejected by the cluster.
    #[error("kubernetes authentication failed: {message}")]
    Auth { message: String },

    /// Server-side or network failure; a whole-pipeline retry may succeed.
    #[error("transient kubernetes failure: {message}")]
    Transient { message: String },

    /// Any other API rejection.
    #[error("kubernetes api rejected secret {name} (status {code}): {message}")]
    Api { name: String, code: u16, message: String },

    /// The temporary kubeconfig file could not be materialized.
    #[error("failed to materialize kubeconfig file")]
    Io(#[from] std::io::Error),
}

/// Kubernetes Secrets client for the secondary store.
pub struct KubernetesSecretsStore {
    kubeconfig: SecretString,
    namespace: String,
}

impl KubernetesSecretsStore {
    /// `kubeconfig` is the base64-encoded access credential; it is decoded
    /// per write, not at construction, so the plaintext file exists only for
    /// the duration of a call.
    pub fn new(kubeconfig: SecretString, namespace: String) -> Self {
        Self { kubeconfig, namespace }
    }
}

#[async_trait]
impl SecondaryStore for KubernetesSecretsStore {
    async fn put_namespaced_secret(
        &self,
        name: &str,
        bundle: &CredentialBundle,
    ) -> Result<KubernetesSecretReceipt, SecondaryStoreError> {
        let scoped = ScopedKubeconfig::materialize(&self.kubeconfig)?;
        let client = scoped.client().await?;
        let api: Api<Secret> = Api::namespaced(client, &self.namespace);

        let secret = build_secret(name, &self.namespace, bundle);
        debug!(name = %name, namespace = %self.namespace, "Creating Kubernetes secret");

        match api.create(&PostParams::default(), &secret).await {
            Ok(created) => Ok(KubernetesSecretReceipt {
                uid: created.metadata.uid.unwrap_or_default(),
                resource_version: created.metadata.resource_version.unwrap_or_default(),
                namespace: created
                    .metadata
                    .namespace
                    .unwrap_or_else(|| self.namespace.clone()),
            }),
            Err(error) => Err(classify_api_error(name, &self.namespace, error)),
        }
        // `scoped` drops here: the temporary kubeconfig file is removed on
        // success and failure alike.
    }
}

/// The decoded kubeconfig, materialized as a temporary file that is removed
/// when this value is dropped.
struct ScopedKubeconfig {
    file: NamedTempFile,
}

impl ScopedKubeconfig {
    fn materialize(encoded: &SecretString) -> Result<Self, SecondaryStoreError> {
        let raw = STANDARD
            .decode(encoded.expose_secret())
            .map_err(|error| SecondaryStoreError::InvalidKubeconfig { reason: error.to_string() })?;

        let mut file = NamedTempFile::new()?;
        file.write_all(&raw)?;
        file.flush()?;
        Ok(Self { file })
    }

    async fn client(&self) -> Result<Client, SecondaryStoreError> {
        let kubeconfig = Kubeconfig::read_from(self.file.path())
            .map_err(|error| SecondaryStoreError::InvalidKubeconfig { reason: error.to_string() })?;

        let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
            .await
            .map_err(|error| SecondaryStoreError::InvalidKubeconfig { reason: error.to_string() })?;

        Client::try_from(config)
            .map_err(|error| SecondaryStoreError::Auth { message: error.to_string() })
    }
}

/// Build the Secret object: Opaque type, ownership label, and the bundle
/// fields as `data` values (base64-encoded on the wire, as the platform
/// requires for this secret type).
fn build_secret(name: &str, namespace: &str, bundle: &CredentialBundle) -> Secret {
    let labels = BTreeMap::from([(OWNERSHIP_LABEL_KEY.to_string(), OWNERSHIP_LABEL_VALUE.to_string())]);

    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        type_: Some(SECRET_TYPE.to_string()),
        data: Some(secret_data(bundle)),
        ..Default::default()
    }
}

fn secret_data(bundle: &CredentialBundle) -> BTreeMap<String, ByteString> {
    BTreeMap::from([
        ("user".to_string(), ByteString(bundle.user.clone().into_bytes())),
        ("password".to_string(), ByteString(bundle.password.clone().into_bytes())),
        ("host".to_string(), ByteString(bundle.host.clone().into_bytes())),
        ("database".to_string(), ByteString(bundle.database.clone().into_bytes())),
    ])
}

fn classify_api_error(name: &str, namespace: &str, error: kube::Error) -> SecondaryStoreError {
    match error {
        kube::Error::Api(response) => match response.code {
            404 => SecondaryStoreError::NamespaceNotFound { namespace: namespace.to_string() },
            409 => SecondaryStoreError::Conflict { name: name.to_string() },
            401 | 403 => SecondaryStoreError::Auth { message: response.message },
            code if code >= 500 => SecondaryStoreError::Transient { message: response.message },
            code => SecondaryStoreError::Api {
                name: name.to_string(),
                code,
                message: response.message,
            },
        },
        other => SecondaryStoreError::Transient { message: other.to_string() },
    }
}
