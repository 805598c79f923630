//! # Database Provisioning
//!
//! Creates the generated principal on the target MySQL server and grants the
//! validated privilege set on the target schema, all within one
//! administrator session that is released before returning.

use crate::config::DatabaseSettings;
use crate::credentials::GeneratedCredential;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlDatabaseError};
use sqlx::Connection;
use thiserror::Error;
use tracing::{debug, info, warn};

const MYSQL_PORT: u16 = 3306;

// MySQL server error numbers used to classify provisioning failures.
const ER_CANNOT_USER: u32 = 1396;
const ER_DBACCESS_DENIED: u32 = 1044;
const ER_ACCESS_DENIED: u32 = 1045;
const ER_SPECIFIC_ACCESS_DENIED: u32 = 1227;

/// Result type for provisioning operations.
pub type ProvisionResult<T> = std::result::Result<T, ProvisionError>;

/// Errors raised while creating the database principal.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// Could not open the administrator connection.
    #[error("failed to connect to {target}")]
    Connection {
        target: String,
        #[source]
        source: sqlx::Error,
    },

    /// The generated principal already exists. Treated as fatal rather than
    /// retried with a new name: the random suffix makes collisions
    /// vanishingly unlikely, so any occurrence points at a real problem.
    #[error("database principal already exists: {user}")]
    DuplicateUser {
        user: String,
        #[source]
        source: sqlx::Error,
    },

    /// The administrator account lacks the privilege for the attempted
    /// statement.
    #[error("administrator lacks privileges for {operation}")]
    PermissionDenied {
        operation: String,
        #[source]
        source: sqlx::Error,
    },

    /// CREATE USER failed for a reason other than the above.
    #[error("failed to create database principal {user}")]
    CreateUser {
        user: String,
        #[source]
        source: sqlx::Error,
    },

    /// GRANT failed after the principal was created.
    #[error("failed to grant privileges to {user} on {schema}")]
    Grant {
        user: String,
        schema: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Seam for the user-creation stage; the production implementation is
/// [`MySqlProvisioner`], tests inject recording fakes.
#[async_trait]
pub trait UserProvisioner: Send + Sync {
    /// Create `credential` as a database principal and grant `grants` on
    /// `schema`. Callers must have validated `grants` against the allow-list
    /// and `schema` as a bare identifier before calling.
    async fn create_user(
        &self,
        credential: &GeneratedCredential,
        schema: &str,
        grants: &[String],
    ) -> ProvisionResult<()>;
}

/// Provisions principals on a MySQL server using administrator credentials.
pub struct MySqlProvisioner {
    settings: DatabaseSettings,
}

impl MySqlProvisioner {
    pub fn new(settings: DatabaseSettings) -> Self {
        Self { settings }
    }

    fn connect_options(&self) -> MySqlConnectOptions {
        MySqlConnectOptions::new()
            .host(&self.settings.host)
            .port(MYSQL_PORT)
            .username(&self.settings.admin_user)
            .password(self.settings.admin_password.expose_secret())
    }

    /// Connection target for logs and errors; never includes the password.
    fn target(&self) -> String {
        format!(
            "mysql://{}@{}:{}",
            self.settings.admin_user, self.settings.host, MYSQL_PORT
        )
    }
}

#[async_trait]
impl UserProvisioner for MySqlProvisioner {
    async fn create_user(
        &self,
        credential: &GeneratedCredential,
        schema: &str,
        grants: &[String],
    ) -> ProvisionResult<()> {
        let target = self.target();
        debug!(target = %target, "Connecting to MySQL with administrator credentials");

        let mut conn = MySqlConnection::connect_with(&self.connect_options())
            .await
            .map_err(|source| ProvisionError::Connection { target, source })?;

        // The username and password are bound as data, never interpolated.
        sqlx::query("CREATE USER ?@'%' IDENTIFIED BY ?")
            .bind(credential.username())
            .bind(credential.password().expose_secret())
            .execute(&mut conn)
            .await
            .map_err(|source| match mysql_error_number(&source) {
                Some(ER_CANNOT_USER) => ProvisionError::DuplicateUser {
                    user: credential.username().to_string(),
                    source,
                },
                Some(ER_DBACCESS_DENIED | ER_ACCESS_DENIED | ER_SPECIFIC_ACCESS_DENIED) => {
                    ProvisionError::PermissionDenied { operation: "CREATE USER".to_string(), source }
                }
                _ => ProvisionError::CreateUser {
                    user: credential.username().to_string(),
                    source,
                },
            })?;

        let statement = grant_statement(grants, schema, credential.username());
        sqlx::query(&statement)
            .execute(&mut conn)
            .await
            .map_err(|source| match mysql_error_number(&source) {
                Some(ER_DBACCESS_DENIED | ER_ACCESS_DENIED | ER_SPECIFIC_ACCESS_DENIED) => {
                    ProvisionError::PermissionDenied { operation: "GRANT".to_string(), source }
                }
                _ => ProvisionError::Grant {
                    user: credential.username().to_string(),
                    schema: schema.to_string(),
                    source,
                },
            })?;

        info!(
            user = %credential.username(),
            schema = %schema,
            grant_count = grants.len(),
            "Created database principal with scoped grants"
        );

        if let Err(error) = conn.close().await {
            warn!(error = %error, "Error closing administrator MySQL connection");
        }

        Ok(())
    }
}

/// Build the GRANT statement. The grant list and schema are statement text:
/// acceptable only because the grant list was validated against the closed
/// allow-list and the schema against the bare-identifier pattern. The
/// username is generated internally (fixed prefix + hex) and backtick-free.
fn grant_statement(grants: &[String], schema: &str, user: &str) -> String {
    format!(
        "GRANT {} ON `{}`.* TO '{}'@'%'",
        grants.join(", "),
        schema,
        user
    )
}

fn mysql_error_number(source: &sqlx::Error) -> Option<u32> {
    match source {
        sqlx::Error::Database(db_error) => db_error
            .try_downcast_ref::<MySqlDatabaseError>()
            .map(|mysql_error| mysql_error.number() as u32),
        _ => None,
    }
}
