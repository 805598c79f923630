//! End-to-end pipeline scenarios with recording fakes injected at the three
//! seams (database provisioner, primary store, secondary store).

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use credplane::config::{DatabaseSettings, ProvisioningConfig, SecretString, StoreSettings};
use credplane::credentials::{CredentialBundle, GeneratedCredential};
use credplane::db::{ProvisionResult, UserProvisioner};
use credplane::errors::Error;
use credplane::pipeline::{Pipeline, Stage};
use credplane::stores::{
    KubernetesSecretReceipt, PrimarySecretReceipt, PrimaryStore, SecondaryStore, SecretStoreError,
    SecondaryStoreError,
};
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
struct RecordedUser {
    username: String,
    schema: String,
    grants: Vec<String>,
}

#[derive(Clone, Default)]
struct RecordingProvisioner {
    calls: Arc<Mutex<Vec<RecordedUser>>>,
}

impl RecordingProvisioner {
    fn calls(&self) -> Vec<RecordedUser> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl UserProvisioner for RecordingProvisioner {
    async fn create_user(
        &self,
        credential: &GeneratedCredential,
        schema: &str,
        grants: &[String],
    ) -> ProvisionResult<()> {
        self.calls.lock().unwrap().push(RecordedUser {
            username: credential.username().to_string(),
            schema: schema.to_string(),
            grants: grants.to_vec(),
        });
        Ok(())
    }
}

#[derive(Clone, Default)]
struct RecordingPrimaryStore {
    calls: Arc<Mutex<Vec<(String, CredentialBundle)>>>,
    deny_access: bool,
}

impl RecordingPrimaryStore {
    fn denying() -> Self {
        Self { deny_access: true, ..Self::default() }
    }

    fn calls(&self) -> Vec<(String, CredentialBundle)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PrimaryStore for RecordingPrimaryStore {
    async fn put_secret(
        &self,
        name: &str,
        bundle: &CredentialBundle,
    ) -> Result<PrimarySecretReceipt, SecretStoreError> {
        if self.deny_access {
            return Err(SecretStoreError::AccessDenied {
                name: name.to_string(),
                message: "simulated access denied".to_string(),
            });
        }
        self.calls.lock().unwrap().push((name.to_string(), bundle.clone()));
        Ok(PrimarySecretReceipt {
            arn: format!("arn:aws:secretsmanager:us-east-1:000000000000:secret:{name}"),
            version_id: "v1".to_string(),
        })
    }
}

#[derive(Clone, Default)]
struct RecordingSecondaryStore {
    calls: Arc<Mutex<Vec<(String, CredentialBundle)>>>,
}

impl RecordingSecondaryStore {
    fn calls(&self) -> Vec<(String, CredentialBundle)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SecondaryStore for RecordingSecondaryStore {
    async fn put_namespaced_secret(
        &self,
        name: &str,
        bundle: &CredentialBundle,
    ) -> Result<KubernetesSecretReceipt, SecondaryStoreError> {
        self.calls.lock().unwrap().push((name.to_string(), bundle.clone()));
        Ok(KubernetesSecretReceipt {
            uid: "2f0d9c1a-93b8-4a3f-a1be-5c2e8f3f6b7d".to_string(),
            resource_version: "4711".to_string(),
            namespace: "default".to_string(),
        })
    }
}

fn test_config(grants: &[&str]) -> ProvisioningConfig {
    ProvisioningConfig {
        database: DatabaseSettings {
            host: "db.internal".to_string(),
            admin_user: "admin".to_string(),
            admin_password: SecretString::new("admin-pw"),
            schema: "billing".to_string(),
        },
        stores: StoreSettings {
            aws_secret_prefix: "runops/".to_string(),
            kubernetes_secret_prefix: "runops-".to_string(),
            namespace: "default".to_string(),
            kubeconfig: SecretString::new(STANDARD.encode("apiVersion: v1\nkind: Config\n")),
        },
        grants: grants.iter().map(|g| g.to_string()).collect(),
    }
}

#[tokio::test]
async fn valid_run_reaches_both_stores_with_one_bundle() {
    let provisioner = RecordingProvisioner::default();
    let primary = RecordingPrimaryStore::default();
    let secondary = RecordingSecondaryStore::default();
    let pipeline = Pipeline::new(provisioner.clone(), primary.clone(), secondary.clone());

    let config = test_config(&["SELECT", "INSERT"]);
    let report = pipeline.run(&config).await.unwrap();

    // Exactly one principal was requested, with exactly the two grant tokens.
    let users = provisioner.calls();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].schema, "billing");
    assert_eq!(users[0].grants, vec!["SELECT".to_string(), "INSERT".to_string()]);

    // Both stores received one write with the identical bundle.
    let primary_calls = primary.calls();
    let secondary_calls = secondary.calls();
    assert_eq!(primary_calls.len(), 1);
    assert_eq!(secondary_calls.len(), 1);
    assert_eq!(primary_calls[0].1, secondary_calls[0].1);

    let bundle = &primary_calls[0].1;
    assert_eq!(bundle.user, users[0].username);
    assert_eq!(bundle.host, "db.internal");
    assert_eq!(bundle.database, "billing");
    assert!(!bundle.password.is_empty());

    assert_eq!(report.username, users[0].username);
    assert!(report.primary.arn.contains(&report.primary_secret_name));
}

#[tokio::test]
async fn secret_names_share_one_suffix_and_differ_by_prefix() {
    let pipeline = Pipeline::new(
        RecordingProvisioner::default(),
        RecordingPrimaryStore::default(),
        RecordingSecondaryStore::default(),
    );

    let config = test_config(&["SELECT"]);
    let report = pipeline.run(&config).await.unwrap();

    let primary_suffix = report.primary_secret_name.strip_prefix("runops/").unwrap();
    let secondary_suffix = report.secondary_secret_name.strip_prefix("runops-").unwrap();

    assert_eq!(primary_suffix, secondary_suffix);
    assert_eq!(primary_suffix.len(), 16);
    assert!(primary_suffix
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
}

#[tokio::test]
async fn disallowed_grant_stops_before_any_side_effect() {
    let provisioner = RecordingProvisioner::default();
    let primary = RecordingPrimaryStore::default();
    let secondary = RecordingSecondaryStore::default();
    let pipeline = Pipeline::new(provisioner.clone(), primary.clone(), secondary.clone());

    let config = test_config(&["SELECT", "DROP TABLE"]);
    let failure = pipeline.run(&config).await.unwrap_err();

    assert_eq!(failure.stage, Stage::ValidateInput);
    match failure.source {
        Error::GrantNotAllowed { grant, .. } => assert_eq!(grant, "DROP TABLE"),
        other => panic!("unexpected error: {other}"),
    }

    // No database connection was attempted and nothing was written.
    assert!(provisioner.calls().is_empty());
    assert!(primary.calls().is_empty());
    assert!(secondary.calls().is_empty());
}

#[tokio::test]
async fn primary_store_failure_halts_without_touching_secondary() {
    let provisioner = RecordingProvisioner::default();
    let primary = RecordingPrimaryStore::denying();
    let secondary = RecordingSecondaryStore::default();
    let pipeline = Pipeline::new(provisioner.clone(), primary.clone(), secondary.clone());

    let config = test_config(&["SELECT"]);
    let failure = pipeline.run(&config).await.unwrap_err();

    assert_eq!(failure.stage, Stage::WritePrimarySecret);
    match failure.source {
        Error::SecretStore(SecretStoreError::AccessDenied { message, .. }) => {
            assert_eq!(message, "simulated access denied");
        }
        other => panic!("unexpected error: {other}"),
    }

    // The database user was created before the failure and is left in place;
    // the secondary store was never attempted.
    assert_eq!(provisioner.calls().len(), 1);
    assert!(secondary.calls().is_empty());
}
