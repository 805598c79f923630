//! # Provisioning Pipeline
//!
//! The orchestrator: a strictly forward-only state machine over four stages.
//! Each stage either succeeds or terminates the run with the stage name and
//! the wrapped cause. There are no retries and no compensating actions — the
//! design favors visible partial failure over distributed rollback, so a
//! failure after user creation deliberately leaves the principal in place.

use crate::config::ProvisioningConfig;
use crate::credentials::{generate_secret_suffix, GeneratedCredential};
use crate::db::UserProvisioner;
use crate::errors::Error;
use crate::grants::validate_grants;
use crate::stores::{KubernetesSecretReceipt, PrimarySecretReceipt, PrimaryStore, SecondaryStore};
use std::fmt;
use tracing::info;

/// The pipeline's stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ValidateInput,
    ProvisionUser,
    WritePrimarySecret,
    WriteSecondarySecret,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::ValidateInput => "ValidateInput",
            Stage::ProvisionUser => "ProvisionUser",
            Stage::WritePrimarySecret => "WritePrimarySecret",
            Stage::WriteSecondarySecret => "WriteSecondarySecret",
        })
    }
}

/// A pipeline failure: the stage it occurred in plus the wrapped cause.
#[derive(Debug, thiserror::Error)]
#[error("stage {stage} failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl PipelineError {
    fn at(stage: Stage, source: impl Into<Error>) -> Self {
        Self { stage, source: source.into() }
    }
}

/// Identifiers of the resources a successful run created.
#[derive(Debug, Clone)]
pub struct ProvisioningReport {
    pub username: String,
    pub primary_secret_name: String,
    pub secondary_secret_name: String,
    pub primary: PrimarySecretReceipt,
    pub secondary: KubernetesSecretReceipt,
}

/// Sequences the provisioning stages over the three injected seams.
pub struct Pipeline<P, A, K> {
    provisioner: P,
    primary: A,
    secondary: K,
}

impl<P, A, K> Pipeline<P, A, K>
where
    P: UserProvisioner,
    A: PrimaryStore,
    K: SecondaryStore,
{
    pub fn new(provisioner: P, primary: A, secondary: K) -> Self {
        Self { provisioner, primary, secondary }
    }

    /// Run the pipeline to completion.
    ///
    /// Advances only on success of the current stage; the first failure is
    /// returned with its stage and nothing created so far is rolled back.
    pub async fn run(
        &self,
        config: &ProvisioningConfig,
    ) -> Result<ProvisioningReport, PipelineError> {
        validate_grants(&config.grants)
            .map_err(|error| PipelineError::at(Stage::ValidateInput, error))?;
        info!(
            stage = %Stage::ValidateInput,
            grants = %config.grants.join(","),
            "Requested grants are allow-listed"
        );

        let credential = GeneratedCredential::generate()
            .map_err(|error| PipelineError::at(Stage::ProvisionUser, error))?;
        self.provisioner
            .create_user(&credential, &config.database.schema, &config.grants)
            .await
            .map_err(|error| PipelineError::at(Stage::ProvisionUser, error))?;
        info!(
            stage = %Stage::ProvisionUser,
            user = %credential.username(),
            schema = %config.database.schema,
            "Database principal created"
        );

        // One suffix per run, shared by both stores, so the same logical
        // secret can be correlated across systems.
        let suffix = generate_secret_suffix();
        let bundle = credential.bundle(&config.database.host, &config.database.schema);

        let primary_secret_name = format!("{}{}", config.stores.aws_secret_prefix, suffix);
        let primary = self
            .primary
            .put_secret(&primary_secret_name, &bundle)
            .await
            .map_err(|error| PipelineError::at(Stage::WritePrimarySecret, error))?;
        info!(
            stage = %Stage::WritePrimarySecret,
            name = %primary_secret_name,
            arn = %primary.arn,
            version_id = %primary.version_id,
            "Credential bundle stored in AWS Secrets Manager"
        );

        let secondary_secret_name = format!("{}{}", config.stores.kubernetes_secret_prefix, suffix);
        let secondary = self
            .secondary
            .put_namespaced_secret(&secondary_secret_name, &bundle)
            .await
            .map_err(|error| PipelineError::at(Stage::WriteSecondarySecret, error))?;
        info!(
            stage = %Stage::WriteSecondarySecret,
            name = %secondary_secret_name,
            uid = %secondary.uid,
            resource_version = %secondary.resource_version,
            namespace = %secondary.namespace,
            "Credential bundle stored in Kubernetes"
        );

        Ok(ProvisioningReport {
            username: credential.username().to_string(),
            primary_secret_name,
            secondary_secret_name,
            primary,
            secondary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_names() {
        assert_eq!(Stage::ValidateInput.to_string(), "ValidateInput");
        assert_eq!(Stage::ProvisionUser.to_string(), "ProvisionUser");
        assert_eq!(Stage::WritePrimarySecret.to_string(), "WritePrimarySecret");
        assert_eq!(Stage::WriteSecondarySecret.to_string(), "WriteSecondarySecret");
    }

    #[test]
    fn test_pipeline_error_names_stage() {
        let error = PipelineError::at(
            Stage::WritePrimarySecret,
            Error::config("simulated failure"),
        );
        let rendered = error.to_string();
        assert!(rendered.contains("WritePrimarySecret"));
        assert!(rendered.contains("simulated failure"));
    }
}
