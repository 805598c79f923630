//! # Configuration Management
//!
//! All external configuration is parsed once from the environment into an
//! immutable [`ProvisioningConfig`] before any component is constructed.
//! Components never read ambient global state directly, so they remain
//! independently testable with injected fixtures.

mod settings;
mod types;

pub use settings::{DatabaseSettings, ProvisioningConfig, StoreSettings};
pub use types::SecretString;
