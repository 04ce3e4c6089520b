//! Error types for the fortisync system.
//!
//! This module provides the error hierarchy for every stage of a sync run:
//! configuration, schema handling, transcoding, the FortiManager API,
//! resource lifecycle operations, state management, planning and
//! reconciliation.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for fortisync.
#[derive(Debug, Error)]
pub enum FortiSyncError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Schema and transcoding errors.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// FortiManager API errors.
    #[error("FortiManager API error: {0}")]
    Api(#[from] ApiError),

    /// Resource lifecycle errors.
    #[error("{0}")]
    Resource(#[from] ResourceError),

    /// State management errors.
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Planning errors.
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    /// Reconciliation errors.
    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// Duplicate resource definition.
    #[error("Duplicate resource name: {name}")]
    DuplicateName {
        /// The duplicated name.
        name: String,
    },

    /// Resource type not known to the schema registry.
    #[error("Unknown resource type '{resource_type}' for resource '{name}'")]
    UnknownResourceType {
        /// Name of the configured resource.
        name: String,
        /// The unknown type.
        resource_type: String,
    },
}

/// Schema and transcoding errors.
///
/// `path` is always a dotted field path such as `hosts[1].ip`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// A value had the wrong shape for its descriptor.
    #[error("{path}: expected {expected}, got {got}")]
    TypeMismatch {
        /// Dotted field path.
        path: String,
        /// Expected shape.
        expected: String,
        /// Shape that was found.
        got: String,
    },

    /// A field not described by the schema was supplied.
    #[error("{path}: unknown field")]
    UnknownField {
        /// Dotted field path.
        path: String,
    },

    /// A required field is missing.
    #[error("{path}: required field is missing")]
    MissingRequired {
        /// Dotted field path.
        path: String,
    },

    /// A cardinality-1 block was given more than one element.
    #[error("{path}: block accepts at most one element, got {count}")]
    BlockCardinality {
        /// Dotted field path.
        path: String,
        /// Number of elements supplied.
        count: usize,
    },

    /// No descriptor is registered under this name.
    #[error("Unknown resource type '{resource_type}'")]
    UnknownType {
        /// Requested resource type.
        resource_type: String,
    },

    /// A descriptor file could not be loaded.
    #[error("Failed to load schema file {path}: {message}")]
    LoadFailed {
        /// Path of the schema file.
        path: String,
        /// Description of the failure.
        message: String,
    },

    /// A descriptor is internally inconsistent.
    #[error("Invalid descriptor for '{resource_type}': {message}")]
    InvalidDescriptor {
        /// Resource type of the descriptor.
        resource_type: String,
        /// Description of the problem.
        message: String,
    },
}

/// FortiManager API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Authentication failed.
    #[error("FortiManager authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// HTTP request failed.
    #[error("FortiManager request failed: {status} - {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Response body or error message.
        message: String,
    },

    /// JSON-RPC call returned a non-zero status code.
    #[error("{url}: status {code} - {message}")]
    Status {
        /// Object URL the call targeted.
        url: String,
        /// FortiManager status code.
        code: i64,
        /// FortiManager status message.
        message: String,
    },

    /// Network error.
    #[error("Network error communicating with FortiManager: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from API.
    #[error("Invalid response from FortiManager: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },
}

/// Resource lifecycle errors raised by the CRUD dispatcher.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// A path parameter could not be resolved.
    #[error("Error resolving {parameter} for {resource_type} resource: parameter is required but was not set in the resource or its import options")]
    MissingParameter {
        /// Resource type.
        resource_type: String,
        /// Name of the missing parameter.
        parameter: String,
    },

    /// The primary key field is missing from the desired configuration.
    #[error("Error building {resource_type} resource: primary key '{field}' is not set")]
    MissingKey {
        /// Resource type.
        resource_type: String,
        /// Primary key field.
        field: String,
    },

    /// An import option was malformed.
    #[error("Invalid import option '{option}': expected key=value")]
    InvalidImportOption {
        /// The malformed option.
        option: String,
    },

    /// A CRUD call against the API failed.
    #[error("Error {verb} {resource_type} resource: {source}")]
    Operation {
        /// Operation verb (`creating`, `reading`, `updating`, `deleting`).
        verb: &'static str,
        /// Resource type.
        resource_type: String,
        /// Underlying cause.
        #[source]
        source: Box<FortiSyncError>,
    },
}

/// State management errors.
#[derive(Debug, Error)]
pub enum StateError {
    /// State is corrupted.
    #[error("State is corrupted: {message}")]
    Corrupted {
        /// Description of the corruption.
        message: String,
    },

    /// State could not be written.
    #[error("Failed to write state: {message}")]
    WriteFailed {
        /// Description of the failure.
        message: String,
    },

    /// State lock acquisition failed.
    #[error("Failed to acquire state lock: {message}")]
    LockFailed {
        /// Description of the lock failure.
        message: String,
    },

    /// State lock is held by another process.
    #[error("State is locked by another process (lock holder: {holder}, since: {since})")]
    LockedByOther {
        /// Identifier of the lock holder.
        holder: String,
        /// When the lock was acquired.
        since: String,
    },

    /// Serialization error.
    #[error("State serialization error: {message}")]
    SerializationError {
        /// Description of the serialization error.
        message: String,
    },

    /// State version mismatch.
    #[error("State version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected state version.
        expected: String,
        /// Found state version.
        found: String,
    },

    /// No record exists for the named resource.
    #[error("No state recorded for resource '{name}'")]
    UnknownResource {
        /// Resource name.
        name: String,
    },
}

/// Planning errors.
#[derive(Debug, Error)]
pub enum PlanError {
    /// Conflicting operations in plan.
    #[error("Conflicting operations in plan: {message}")]
    ConflictingOperations {
        /// Description of the conflict.
        message: String,
    },

    /// A planned action referenced a resource missing from the configuration.
    #[error("Planned resource '{name}' is not in the configuration")]
    MissingResource {
        /// Resource name.
        name: String,
    },
}

/// Reconciliation errors.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reconciliation failed for a specific resource.
    #[error("Failed to reconcile {resource_type} '{name}': {reason}")]
    ResourceReconcileFailed {
        /// Type of resource.
        resource_type: String,
        /// Name of the resource.
        name: String,
        /// Reason for failure.
        reason: String,
    },

    /// Reconciliation was aborted.
    #[error("Reconciliation aborted: {reason}")]
    Aborted {
        /// Reason for abort.
        reason: String,
    },
}

/// Result type alias for fortisync operations.
pub type Result<T> = std::result::Result<T, FortiSyncError>;

impl FortiSyncError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::NetworkError { .. }) | Self::State(StateError::LockFailed { .. })
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

impl SchemaError {
    /// Creates a type mismatch error.
    #[must_use]
    pub fn mismatch(path: &str, expected: impl Into<String>, got: impl Into<String>) -> Self {
        Self::TypeMismatch {
            path: path.to_string(),
            expected: expected.into(),
            got: got.into(),
        }
    }
}

impl StateError {
    /// Creates a serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Creates a write error with the given message.
    #[must_use]
    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteFailed {
            message: message.into(),
        }
    }
}

impl ApiError {
    /// Creates an HTTP request error.
    #[must_use]
    pub fn request_failed(status: u16, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl ResourceError {
    /// Wraps a failed API call with the verb-prefixed message.
    #[must_use]
    pub fn operation(verb: &'static str, resource_type: &str, source: FortiSyncError) -> Self {
        Self::Operation {
            verb,
            resource_type: resource_type.to_string(),
            source: Box::new(source),
        }
    }
}
