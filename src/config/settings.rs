//! # Configuration Settings
//!
//! Defines the provisioning configuration and its environment-variable
//! parsing. Every value is read exactly once, validated, and frozen before
//! the pipeline starts.

use crate::config::SecretString;
use crate::errors::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use validator::Validate;

const DEFAULT_AWS_SECRET_PREFIX: &str = "runops/";
const DEFAULT_KUBERNETES_SECRET_PREFIX: &str = "runops-";

/// Consumed implicitly by the AWS SDK default credential chain; presence is
/// checked at startup so a missing credential fails before any side effect.
const REQUIRED_AWS_VARS: &[&str] = &["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_DEFAULT_REGION"];

/// Kubernetes secret names are DNS subdomains. The prefix must start with a
/// lowercase alphanumeric and stay within `[a-z0-9.-]` so that
/// `<prefix><suffix>` remains a valid resource name.
static KUBERNETES_PREFIX_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9.-]*$").expect("prefix pattern compiles"));

/// The schema name is interpolated (backtick-quoted) into the GRANT
/// statement, so it is constrained to a bare MySQL identifier.
static SCHEMA_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_$]+$").expect("schema pattern compiles"));

/// Immutable provisioning input, parsed once at startup
#[derive(Debug, Clone, Validate)]
pub struct ProvisioningConfig {
    /// MySQL administrator connection parameters and target schema
    #[validate(nested)]
    pub database: DatabaseSettings,

    /// Secret store naming and access parameters
    #[validate(nested)]
    pub stores: StoreSettings,

    /// Requested privilege names; membership in the allow-list is enforced by
    /// the pipeline's ValidateInput stage before any connection is opened
    pub grants: Vec<String>,
}

/// MySQL administrator connection parameters
#[derive(Debug, Clone, Validate)]
pub struct DatabaseSettings {
    #[validate(length(min = 1, message = "MySQL host cannot be empty"))]
    pub host: String,

    #[validate(length(min = 1, message = "MySQL administrator user cannot be empty"))]
    pub admin_user: String,

    pub admin_password: SecretString,

    /// Target schema the generated principal is granted privileges on
    #[validate(length(min = 1, message = "MySQL schema cannot be empty"))]
    pub schema: String,
}

/// Secret store naming and access parameters
#[derive(Debug, Clone, Validate)]
pub struct StoreSettings {
    /// AWS Secrets Manager name prefix; the shared random suffix is appended
    #[validate(length(max = 150, message = "AWS_SECRET_PREFIX reached max length size (150)"))]
    pub aws_secret_prefix: String,

    /// Kubernetes Secret name prefix; the same shared suffix is appended
    #[validate(length(max = 20, message = "KUBERNETES_SECRET_PREFIX reached max length size (20)"))]
    pub kubernetes_secret_prefix: String,

    /// Namespace the Kubernetes Secret is created in
    #[validate(length(min = 1, message = "secret namespace cannot be empty"))]
    pub namespace: String,

    /// Base64-encoded kubeconfig, decoded to a scoped temporary file per write
    pub kubeconfig: SecretString,
}

impl ProvisioningConfig {
    /// Parse and validate the configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let database = DatabaseSettings {
            host: require_env("MYSQL_GRANT_HOST")?,
            admin_user: require_env("MYSQL_GRANT_USER")?,
            admin_password: SecretString::new(require_env("MYSQL_GRANT_PASSWORD")?),
            schema: require_env("MYSQL_GRANT_DB")?,
        };

        let grants = require_env("MYSQL_GRANT_LIST")?
            .split(',')
            .map(|grant| grant.trim().to_string())
            .filter(|grant| !grant.is_empty())
            .collect();

        for &name in REQUIRED_AWS_VARS {
            require_env(name)?;
        }

        let stores = StoreSettings {
            aws_secret_prefix: env_or("AWS_SECRET_PREFIX", DEFAULT_AWS_SECRET_PREFIX),
            kubernetes_secret_prefix: env_or("KUBERNETES_SECRET_PREFIX", DEFAULT_KUBERNETES_SECRET_PREFIX),
            namespace: require_env("SECRET_NAMESPACE")?,
            kubeconfig: SecretString::new(require_env("KUBECONFIG_DATA")?),
        };

        let config = Self { database, stores, grants };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    /// Custom validation logic beyond what the validator derive covers
    fn validate_custom(&self) -> Result<()> {
        if self.grants.is_empty() {
            return Err(Error::config("MYSQL_GRANT_LIST cannot be empty"));
        }

        if self.database.admin_password.is_empty() {
            return Err(Error::config("MYSQL_GRANT_PASSWORD cannot be empty"));
        }

        if !SCHEMA_NAME_PATTERN.is_match(&self.database.schema) {
            return Err(Error::config(format!(
                "MYSQL_GRANT_DB must be a bare identifier ([A-Za-z0-9_$]+), got {:?}",
                self.database.schema
            )));
        }

        if !KUBERNETES_PREFIX_PATTERN.is_match(&self.stores.kubernetes_secret_prefix) {
            return Err(Error::config(
                "KUBERNETES_SECRET_PREFIX contains unsupported characters",
            ));
        }

        if self.stores.kubeconfig.is_empty() {
            return Err(Error::config("KUBECONFIG_DATA cannot be empty"));
        }

        Ok(())
    }
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name)
        .map_err(|_| Error::config(format!("missing required environment variable {}", name)))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
