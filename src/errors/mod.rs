//! # Error Handling
//!
//! Error types for the provisioning pipeline, defined with `thiserror`.
//! Every stage returns either a success value or a typed failure; nothing is
//! caught and retried, and no error is silently swallowed.

/// Custom result type for credplane operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the provisioning pipeline
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors, caught before any side effect
    #[error("configuration error: {message}")]
    Config { message: String },

    /// A requested privilege is not a member of the fixed allow-list
    #[error("grant not allowed, found={grant}, allowed={allowed}")]
    GrantNotAllowed { grant: String, allowed: String },

    /// Database principal creation or grant failures
    #[error("database provisioning failed: {0}")]
    Database(#[from] crate::db::ProvisionError),

    /// Primary (AWS Secrets Manager) store failures
    #[error("secret store failure: {0}")]
    SecretStore(#[from] crate::stores::aws::SecretStoreError),

    /// Secondary (Kubernetes) store failures
    #[error("secondary store failure: {0}")]
    SecondaryStore(#[from] crate::stores::kubernetes::SecondaryStoreError),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let reasons: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, reasons.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::config(message)
    }
}
