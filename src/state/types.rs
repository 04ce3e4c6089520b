//! State types for tracking managed FortiManager objects.
//!
//! These types record what fortisync last applied and last observed for
//! each configured resource, used for planning, drift detection and
//! idempotent operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::client::JsonMap;
use crate::error::SchemaError;
use crate::resource::PathParams;
use crate::schema::{normalize_object, Attributes, ResourceDescriptor};
use crate::transcode::{expand_object, flatten_object, FieldSelection};

/// Current version of the state format.
pub const STATE_VERSION: &str = "1";

/// Maximum number of history entries kept.
const MAX_HISTORY: usize = 100;

/// The complete sync state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncState {
    /// State format version.
    pub version: String,
    /// FortiManager endpoint the state belongs to.
    pub endpoint: String,
    /// Hash of the last applied configuration.
    #[serde(default)]
    pub config_hash: String,
    /// Managed resources by configuration name.
    #[serde(default)]
    pub resources: BTreeMap<String, ResourceRecord>,
    /// When the state was last updated.
    pub last_updated: DateTime<Utc>,
    /// Recent operations.
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Record of one managed resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceRecord {
    /// Resource name (from config).
    pub name: String,
    /// Resource type.
    pub resource_type: String,
    /// Object id on FortiManager.
    pub id: String,
    /// Resolved path parameters.
    #[serde(default)]
    pub params: PathParams,
    /// Hash of the resource configuration when last applied.
    #[serde(default)]
    pub config_hash: String,
    /// Attributes as configured at the last apply, keyed by local name.
    #[serde(default)]
    pub applied: JsonMap,
    /// Object as last read from FortiManager, in wire form.
    #[serde(default)]
    pub observed: JsonMap,
    /// When the resource was first recorded.
    pub created_at: DateTime<Utc>,
    /// When the resource was last written.
    pub updated_at: DateTime<Utc>,
    /// When the resource was last read from FortiManager.
    #[serde(default)]
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// A single entry in the operation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the operation ran.
    pub timestamp: DateTime<Utc>,
    /// Type of operation.
    pub operation: SyncOperation,
    /// Configuration hash at the time.
    pub config_hash: String,
    /// Resources affected.
    pub resources: Vec<String>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Optional error message.
    #[serde(default)]
    pub error: Option<String>,
}

/// Types of recorded operations.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    /// Plan execution.
    Apply,
    /// Re-read of every managed object.
    Refresh,
    /// Adoption of an existing object.
    Import,
    /// Deletion of every managed object.
    Destroy,
    /// Removal of a record without touching FortiManager.
    Remove,
}

impl SyncState {
    /// Creates a new empty state for an endpoint.
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            endpoint: endpoint.to_string(),
            config_hash: String::new(),
            resources: BTreeMap::new(),
            last_updated: Utc::now(),
            history: Vec::new(),
        }
    }

    /// Gets a resource record by name.
    #[must_use]
    pub fn get_resource(&self, name: &str) -> Option<&ResourceRecord> {
        self.resources.get(name)
    }

    /// Gets a mutable resource record by name.
    pub fn get_resource_mut(&mut self, name: &str) -> Option<&mut ResourceRecord> {
        self.resources.get_mut(name)
    }

    /// Adds or replaces a resource record.
    pub fn set_resource(&mut self, record: ResourceRecord) {
        self.resources.insert(record.name.clone(), record);
        self.last_updated = Utc::now();
    }

    /// Removes a resource record by name.
    pub fn remove_resource(&mut self, name: &str) -> Option<ResourceRecord> {
        let result = self.resources.remove(name);
        if result.is_some() {
            self.last_updated = Utc::now();
        }
        result
    }

    /// Returns all recorded resource names.
    #[must_use]
    pub fn resource_names(&self) -> Vec<&str> {
        self.resources.keys().map(String::as_str).collect()
    }

    /// Adds a history entry, dropping the oldest beyond the limit.
    pub fn add_history(&mut self, entry: HistoryEntry) {
        if self.history.len() >= MAX_HISTORY {
            self.history.remove(0);
        }
        self.history.push(entry);
    }
}

impl ResourceRecord {
    /// Creates a record for a freshly created or imported object.
    #[must_use]
    pub fn new(name: &str, resource_type: &str, id: &str, params: PathParams) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            id: id.to_string(),
            params,
            config_hash: String::new(),
            applied: JsonMap::new(),
            observed: JsonMap::new(),
            created_at: now,
            updated_at: now,
            refreshed_at: None,
        }
    }

    /// Records the configuration that was just applied.
    pub fn set_applied(&mut self, attributes: &JsonMap, config_hash: &str) {
        self.applied = attributes.clone();
        self.config_hash = config_hash.to_string();
        self.updated_at = Utc::now();
    }

    /// Records attributes just read from FortiManager.
    pub fn set_observed(&mut self, descriptor: &ResourceDescriptor, attributes: &Attributes) {
        self.observed = expand_object(&descriptor.fields, attributes, &FieldSelection::All);
        self.refreshed_at = Some(Utc::now());
    }

    /// Attributes applied at the last apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored attributes no longer match the descriptor.
    pub fn applied_attributes(&self, descriptor: &ResourceDescriptor) -> Result<Attributes, SchemaError> {
        normalize_object(&descriptor.fields, &self.applied, "")
    }

    /// Attributes as last observed on FortiManager.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored object no longer matches the descriptor.
    pub fn observed_attributes(&self, descriptor: &ResourceDescriptor) -> Result<Attributes, SchemaError> {
        flatten_object(&descriptor.fields, &self.observed)
    }
}

impl HistoryEntry {
    /// Creates a successful history entry.
    #[must_use]
    pub fn new(operation: SyncOperation, config_hash: &str, resources: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            operation,
            config_hash: config_hash.to_string(),
            resources,
            success: true,
            error: None,
        }
    }

    /// Creates a failed history entry.
    #[must_use]
    pub fn failed(
        operation: SyncOperation,
        config_hash: &str,
        resources: Vec<String>,
        error: &str,
    ) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::new(operation, config_hash, resources)
        }
    }
}

impl std::fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let op = match self {
            Self::Apply => "apply",
            Self::Refresh => "refresh",
            Self::Import => "import",
            Self::Destroy => "destroy",
            Self::Remove => "remove",
        };
        write!(f, "{op}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{SchemaRegistry, Value};
    use serde_json::json;

    #[test]
    fn test_history_is_bounded() {
        let mut state = SyncState::new("https://fmg");
        for i in 0..(MAX_HISTORY + 5) {
            state.add_history(HistoryEntry::new(SyncOperation::Apply, &i.to_string(), vec![]));
        }
        assert_eq!(state.history.len(), MAX_HISTORY);
        assert_eq!(state.history[0].config_hash, "5");
    }

    #[test]
    fn test_observed_round_trip() {
        let registry = SchemaRegistry::with_builtins();
        let descriptor = registry.get("system_snmp_community").unwrap();

        let mut attributes = Attributes::new();
        attributes.insert("fosid".into(), Value::from("1"));
        attributes.insert("name".into(), Value::from("public"));
        attributes.insert(
            "events".into(),
            Value::Set(["cpu-high".to_string()].into_iter().collect()),
        );

        let mut record = ResourceRecord::new("public", &descriptor.name, "1", PathParams::default());
        record.set_observed(descriptor, &attributes);

        assert!(record.refreshed_at.is_some());
        let observed = record.observed_attributes(descriptor).unwrap();
        assert_eq!(observed.get("name"), attributes.get("name"));
        assert_eq!(observed.get("events"), attributes.get("events"));
    }

    #[test]
    fn test_applied_attributes_normalize() {
        let registry = SchemaRegistry::with_builtins();
        let descriptor = registry.get("system_snmp_community").unwrap();

        let mut record = ResourceRecord::new("public", &descriptor.name, "1", PathParams::default());
        let applied = json!({"fosid": 1, "name": "public"});
        record.set_applied(applied.as_object().unwrap(), "abc");

        let attributes = record.applied_attributes(descriptor).unwrap();
        assert_eq!(attributes.get("name"), Some(&Value::from("public")));
        assert_eq!(record.config_hash, "abc");
    }

    #[test]
    fn test_failed_history_entry() {
        let entry = HistoryEntry::failed(SyncOperation::Destroy, "h", vec!["a".into()], "boom");
        assert!(!entry.success);
        assert_eq!(entry.error.as_deref(), Some("boom"));
        assert_eq!(entry.operation.to_string(), "destroy");
    }
}
