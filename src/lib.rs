//! # credplane
//!
//! credplane provisions a randomized MySQL credential and records it in two
//! independent secret stores, so that downstream consumers can retrieve
//! rotated credentials without manual handling.
//!
//! ## Architecture
//!
//! The pipeline is strictly linear:
//!
//! ```text
//! ValidateInput → ProvisionUser → WritePrimarySecret → WriteSecondarySecret
//!       ↓               ↓                  ↓                    ↓
//!  allow-list      MySQL (sqlx)    AWS Secrets Manager   Kubernetes Secrets
//! ```
//!
//! Each stage either succeeds or stops the run with a typed error naming the
//! stage it failed in. There is no retry and no compensation: a failure after
//! user creation leaves the principal in place for manual remediation, and
//! the error makes that state visible to operators.
//!
//! ## Example
//!
//! ```rust,no_run
//! use credplane::config::ProvisioningConfig;
//! use credplane::db::MySqlProvisioner;
//! use credplane::pipeline::Pipeline;
//! use credplane::stores::aws::AwsSecretsStore;
//! use credplane::stores::kubernetes::KubernetesSecretsStore;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = ProvisioningConfig::from_env()?;
//! let pipeline = Pipeline::new(
//!     MySqlProvisioner::new(config.database.clone()),
//!     AwsSecretsStore::from_env().await,
//!     KubernetesSecretsStore::new(config.stores.kubeconfig.clone(), config.stores.namespace.clone()),
//! );
//! let report = pipeline.run(&config).await?;
//! println!("provisioned {}", report.username);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod credentials;
pub mod db;
pub mod errors;
pub mod grants;
pub mod observability;
pub mod pipeline;
pub mod stores;

// Re-export commonly used types
pub use config::ProvisioningConfig;
pub use errors::{Error, Result};
pub use pipeline::{Pipeline, PipelineError, ProvisioningReport, Stage};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_available() {
        assert!(!VERSION.is_empty());
        assert_eq!(APP_NAME, "credplane");
    }
}
