//! # Privilege Validation
//!
//! Checks requested grants against the fixed MySQL privilege allow-list.
//! Grant strings are later interpolated into the GRANT statement as text, so
//! membership in this closed set is the sole injection defense: validation is
//! a strict precondition and runs before any database connection is opened.

use crate::errors::{Error, Result};

/// The privileges this tool will ever grant. Matching is exact and
/// case-sensitive.
pub const GRANT_ALLOW_LIST: &[&str] = &[
    "SELECT",
    "INSERT",
    "UPDATE",
    "DELETE",
    "CREATE",
    "DROP",
    "RELOAD",
    "PROCESS",
    "REFERENCES",
    "INDEX",
    "ALTER",
    "SHOW DATABASES",
    "CREATE TEMPORARY TABLES",
    "LOCK TABLES",
    "EXECUTE",
    "REPLICATION SLAVE",
    "REPLICATION CLIENT",
    "CREATE VIEW",
    "SHOW VIEW",
    "CREATE ROUTINE",
    "ALTER ROUTINE",
    "CREATE USER",
    "EVENT",
];

/// Validate every requested grant against [`GRANT_ALLOW_LIST`].
///
/// Fails on the first entry that is not a member, naming the offending grant
/// and carrying the full allow-list for diagnostics.
pub fn validate_grants(requested: &[String]) -> Result<()> {
    if requested.is_empty() {
        return Err(Error::config("grant list cannot be empty"));
    }

    for grant in requested {
        if !GRANT_ALLOW_LIST.contains(&grant.as_str()) {
            return Err(Error::GrantNotAllowed {
                grant: grant.clone(),
                allowed: GRANT_ALLOW_LIST.join(","),
            });
        }
    }

    Ok(())
}
