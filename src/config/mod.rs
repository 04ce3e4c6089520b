//! Configuration module for fortisync.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `fortisync.yaml`
//! - Environment overrides and credentials
//! - Validation against the schema registry
//! - Computing configuration hashes for change detection

mod spec;
mod parser;
mod validator;
mod hash;

pub use spec::{DefaultsConfig, ProviderConfig, ResourceConfig, StateConfig, SyncConfig};
pub use parser::{
    apply_env_overrides, credentials_from, find_config_file, ConfigParser, PASSWORD_ENV, TOKEN_ENV,
    USERNAME_ENV,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
pub use hash::ConfigHasher;
