//! # Credential Generation
//!
//! Produces the randomized principal identity for a provisioning run: a
//! unique username, a high-entropy password, and the random suffix shared by
//! both secret names so one logical secret can be correlated across systems.

use crate::config::SecretString;
use crate::errors::{Error, Result};
use rand::rngs::OsRng;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters a generated password may contain: mixed-case alphanumerics
/// plus a fixed symbol set.
pub const PASSWORD_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_&#-<>=+|~^*";

/// Default password length. Must not exceed the alphabet size (74) because
/// passwords are sampled without replacement.
pub const DEFAULT_PASSWORD_LENGTH: usize = 25;

const USERNAME_PREFIX: &str = "usr_";

/// Generate a unique username: `usr_` followed by 12 lowercase hex characters
/// drawn from the OS CSPRNG. Globally unique with overwhelming probability.
pub fn generate_username() -> String {
    let mut raw = [0u8; 6];
    OsRng.fill_bytes(&mut raw);
    format!("{}{}", USERNAME_PREFIX, hex::encode(raw))
}

/// Generate a password of `length` characters sampled without replacement
/// from [`PASSWORD_ALPHABET`].
///
/// Fails with a configuration error when `length` exceeds the alphabet size;
/// the default of 25 always satisfies the constraint.
pub fn generate_password(length: usize) -> Result<String> {
    let mut alphabet: Vec<char> = PASSWORD_ALPHABET.chars().collect();
    if length > alphabet.len() {
        return Err(Error::config(format!(
            "password length {} exceeds alphabet size {}",
            length,
            alphabet.len()
        )));
    }

    let (sampled, _) = alphabet.partial_shuffle(&mut OsRng, length);
    Ok(sampled.iter().collect())
}

/// Generate the 16-hex-character suffix appended to both configured secret
/// name prefixes. Generated once per run and reused for both stores.
pub fn generate_secret_suffix() -> String {
    let mut raw = [0u8; 8];
    OsRng.fill_bytes(&mut raw);
    hex::encode(raw)
}

/// The identity created for a provisioning run.
///
/// The password lives in a [`SecretString`] so accidental logging renders
/// `[REDACTED]`; the plaintext only leaves this type through
/// [`GeneratedCredential::bundle`] and the statement bind in the provisioner.
#[derive(Debug, Clone)]
pub struct GeneratedCredential {
    username: String,
    password: SecretString,
}

impl GeneratedCredential {
    /// Generate a fresh credential with the default password length.
    pub fn generate() -> Result<Self> {
        Ok(Self {
            username: generate_username(),
            password: SecretString::new(generate_password(DEFAULT_PASSWORD_LENGTH)?),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Build the bundle persisted to both secret stores.
    pub fn bundle(&self, host: &str, database: &str) -> CredentialBundle {
        CredentialBundle {
            user: self.username.clone(),
            password: self.password.expose_secret().to_string(),
            host: host.to_string(),
            database: database.to_string(),
        }
    }
}

/// The JSON record written identically to both secret stores.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialBundle {
    pub user: String,
    pub password: String,
    pub host: String,
    pub database: String,
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialBundle")
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("host", &self.host)
            .field("database", &self.database)
            .finish()
    }
}
