//! Diff engine for comparing desired, recorded and observed state.
//!
//! For every configured resource the engine looks at three things: the
//! desired attributes, the state record of the last apply and the object
//! currently on FortiManager. The touched-field set of an update is computed
//! here, once, from the desired attributes against both the last applied
//! configuration and the observed object.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::resource::ResourceState;
use crate::schema::Attributes;
use crate::state::{ResourceRecord, SyncState};
use crate::transcode::{drifted_fields, touched_fields};

use super::desired::DesiredResource;

/// Objects read from FortiManager, by resource name.
///
/// A resource without an entry was not read; an absent [`ResourceState`]
/// means the server has no such object.
pub type ObservedResources = BTreeMap<String, ResourceState>;

/// Engine for computing diffs.
#[derive(Debug, Default)]
pub struct DiffEngine;

/// Difference for a single resource.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDiff {
    /// Resource name.
    pub name: String,
    /// Resource type.
    pub resource_type: String,
    /// Type of difference.
    pub diff_type: DiffType,
    /// Object id on FortiManager, if it exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Top-level fields an update must send.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub touched: BTreeSet<String>,
    /// Per-field details.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<DiffDetail>,
    /// Hash recorded at the last apply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_hash: Option<String>,
    /// Hash of the current configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_hash: Option<String>,
    /// Why the resource is in this state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Type of difference detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffType {
    /// Object does not exist and must be created.
    Create,
    /// Configuration changed since the last apply.
    Update,
    /// Identity or location changed: delete the old object, create a new one.
    Replace,
    /// Object exists on FortiManager but is not recorded yet.
    Adopt,
    /// Object was changed on FortiManager outside fortisync.
    Drift,
    /// Object is recorded but no longer configured.
    Delete,
    /// Nothing to do.
    NoChange,
}

/// Detail about a specific field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffDetail {
    /// Field that differs.
    pub field: String,
    /// Current value.
    pub old_value: Option<String>,
    /// Desired value.
    pub new_value: Option<String>,
}

/// Complete diff result.
#[derive(Debug, Default, Serialize)]
pub struct DiffResult {
    /// All resource diffs.
    pub diffs: Vec<ResourceDiff>,
    /// Number of resources to create (including replacements).
    pub creates: usize,
    /// Number of resources to update, adopt or repair.
    pub updates: usize,
    /// Number of resources to delete.
    pub deletes: usize,
    /// Number of unchanged resources.
    pub unchanged: usize,
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff of every configured and every recorded resource.
    #[must_use]
    pub fn compute_diff(
        &self,
        desired: &[DesiredResource<'_>],
        state: &SyncState,
        observed: &ObservedResources,
    ) -> DiffResult {
        let mut diffs: Vec<ResourceDiff> = desired
            .iter()
            .map(|d| Self::compute_resource_diff(d, state.get_resource(d.name()), observed.get(d.name())))
            .collect();

        for record in state.resources.values() {
            if desired.iter().all(|d| d.name() != record.name) {
                debug!("{} is no longer configured", record.name);
                diffs.push(ResourceDiff {
                    old_hash: Some(record.config_hash.clone()),
                    reason: Some(String::from("removed from configuration")),
                    ..ResourceDiff::new(&record.name, &record.resource_type, DiffType::Delete, Some(&record.id))
                });
            }
        }

        DiffResult::from_diffs(diffs)
    }

    fn compute_resource_diff(
        desired: &DesiredResource<'_>,
        record: Option<&ResourceRecord>,
        observed: Option<&ResourceState>,
    ) -> ResourceDiff {
        let name = desired.name();
        let resource_type = desired.descriptor.name.as_str();

        if let Some(reason) = record.and_then(|r| replacement_reason(desired, r)) {
            debug!("{name} must be replaced: {reason}");
            let record_id = record.map(|r| r.id.as_str());
            return ResourceDiff {
                details: creation_details(&desired.attributes),
                old_hash: record.map(|r| r.config_hash.clone()),
                new_hash: Some(desired.hash.clone()),
                reason: Some(reason),
                ..ResourceDiff::new(name, resource_type, DiffType::Replace, record_id)
            };
        }

        let Some(current) = observed.filter(|o| o.is_present()) else {
            let reason = record.map(|r| format!("object '{}' no longer exists on FortiManager", r.id));
            debug!("{name} needs to be created");
            return ResourceDiff {
                details: creation_details(&desired.attributes),
                old_hash: record.map(|r| r.config_hash.clone()),
                new_hash: Some(desired.hash.clone()),
                reason,
                ..ResourceDiff::new(name, resource_type, DiffType::Create, None)
            };
        };

        let fields = &desired.descriptor.fields;
        let drifted = drifted_fields(fields, &desired.attributes, &current.attributes);

        let Some(record) = record else {
            debug!("{name} exists on FortiManager, adopting ({} fields differ)", drifted.len());
            return ResourceDiff {
                details: field_details(&drifted, &desired.attributes, &current.attributes),
                touched: drifted,
                new_hash: Some(desired.hash.clone()),
                reason: Some(String::from("object already exists on FortiManager")),
                ..ResourceDiff::new(name, resource_type, DiffType::Adopt, Some(&current.id))
            };
        };

        let last_applied = record.applied_attributes(desired.descriptor).unwrap_or_else(|e| {
            warn!("Ignoring unreadable applied attributes of {name}: {e}");
            Attributes::new()
        });
        let changed = touched_fields(fields, &desired.attributes, &last_applied);

        let diff_type = if !changed.is_empty() {
            DiffType::Update
        } else if !drifted.is_empty() {
            DiffType::Drift
        } else {
            DiffType::NoChange
        };

        let touched: BTreeSet<String> = changed.union(&drifted).cloned().collect();
        debug!("{name}: {diff_type} ({} touched fields)", touched.len());

        ResourceDiff {
            details: field_details(&touched, &desired.attributes, &current.attributes),
            touched,
            old_hash: Some(record.config_hash.clone()),
            new_hash: Some(desired.hash.clone()),
            ..ResourceDiff::new(name, resource_type, diff_type, Some(&current.id))
        }
    }
}

/// Returns why a recorded object cannot be updated in place, if it cannot.
fn replacement_reason(desired: &DesiredResource<'_>, record: &ResourceRecord) -> Option<String> {
    if record.resource_type != desired.descriptor.name {
        return Some(format!(
            "type changed from {} to {}",
            record.resource_type, desired.descriptor.name
        ));
    }
    if record.params != desired.params {
        return Some(String::from("path parameters changed"));
    }
    match desired.id.as_deref() {
        Some(id) if !record.id.is_empty() && id != record.id => {
            Some(format!("key changed from '{}' to '{id}'", record.id))
        }
        _ => None,
    }
}

fn creation_details(desired: &Attributes) -> Vec<DiffDetail> {
    desired
        .iter()
        .map(|(field, value)| DiffDetail {
            field: field.clone(),
            old_value: None,
            new_value: Some(value.to_string()),
        })
        .collect()
}

fn field_details(fields: &BTreeSet<String>, desired: &Attributes, observed: &Attributes) -> Vec<DiffDetail> {
    fields
        .iter()
        .map(|field| DiffDetail {
            field: field.clone(),
            old_value: observed.get(field).map(ToString::to_string),
            new_value: desired.get(field).map(ToString::to_string),
        })
        .collect()
}

impl ResourceDiff {
    fn new(name: &str, resource_type: &str, diff_type: DiffType, id: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            resource_type: resource_type.to_string(),
            diff_type,
            id: id.map(String::from),
            touched: BTreeSet::new(),
            details: Vec::new(),
            old_hash: None,
            new_hash: None,
            reason: None,
        }
    }
}

impl DiffResult {
    /// Builds a result and its counters.
    #[must_use]
    pub fn from_diffs(diffs: Vec<ResourceDiff>) -> Self {
        let count = |types: &[DiffType]| diffs.iter().filter(|d| types.contains(&d.diff_type)).count();

        Self {
            creates: count(&[DiffType::Create, DiffType::Replace]),
            updates: count(&[DiffType::Update, DiffType::Adopt, DiffType::Drift]),
            deletes: count(&[DiffType::Delete]),
            unchanged: count(&[DiffType::NoChange]),
            diffs,
        }
    }

    /// Returns true if there are any changes.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.creates > 0 || self.updates > 0 || self.deletes > 0
    }

    /// Returns the total number of changes.
    #[must_use]
    pub const fn total_changes(&self) -> usize {
        self.creates + self.updates + self.deletes
    }

    /// Diffs that require action.
    #[must_use]
    pub fn actionable_diffs(&self) -> Vec<&ResourceDiff> {
        self.diffs
            .iter()
            .filter(|d| d.diff_type != DiffType::NoChange)
            .collect()
    }

    /// Diffs of a given type.
    #[must_use]
    pub fn of_type(&self, diff_type: DiffType) -> Vec<&ResourceDiff> {
        self.diffs.iter().filter(|d| d.diff_type == diff_type).collect()
    }
}

impl std::fmt::Display for DiffType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Adopt => "adopt",
            Self::Drift => "drift",
            Self::Delete => "delete",
            Self::NoChange => "no change",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for ResourceDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.resource_type, self.diff_type)?;
        if !self.touched.is_empty() {
            let fields: Vec<&str> = self.touched.iter().map(String::as_str).collect();
            write!(f, " [{}]", fields.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigParser, SyncConfig};
    use crate::planner::desired::resolve_all;
    use crate::resource::PathParams;
    use crate::schema::{SchemaRegistry, Value};
    use serde_json::json;

    const CONFIG: &str = r"
provider:
  url: https://fmg
defaults:
  device: fgt1
resources:
  - name: public
    type: system_snmp_community
    attributes:
      fosid: 1
      name: public
      events: [cpu-high]
";

    fn config(yaml: &str) -> SyncConfig {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    fn present(id: &str, pairs: &[(&str, Value)]) -> ResourceState {
        ResourceState {
            id: id.to_string(),
            attributes: pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect(),
        }
    }

    fn events(items: &[&str]) -> Value {
        Value::Set(items.iter().map(|s| (*s).to_string()).collect())
    }

    fn recorded(state: &mut SyncState, applied: serde_json::Value) {
        let mut record = ResourceRecord::new(
            "public",
            "system_snmp_community",
            "1",
            PathParams::from_pairs([("device", "fgt1")]),
        );
        record.set_applied(applied.as_object().unwrap(), "old");
        state.set_resource(record);
    }

    #[test]
    fn test_new_resource_is_created() {
        let config = config(CONFIG);
        let registry = SchemaRegistry::with_builtins();
        let desired = resolve_all(&config, &registry).unwrap();

        let mut observed = ObservedResources::new();
        observed.insert("public".into(), ResourceState::absent());

        let result = DiffEngine::new().compute_diff(&desired, &SyncState::new("https://fmg"), &observed);
        assert_eq!(result.creates, 1);
        assert_eq!(result.diffs[0].diff_type, DiffType::Create);
        assert!(result.diffs[0].reason.is_none());
        assert!(result.has_changes());
    }

    #[test]
    fn test_existing_unrecorded_object_is_adopted() {
        let config = config(CONFIG);
        let registry = SchemaRegistry::with_builtins();
        let desired = resolve_all(&config, &registry).unwrap();

        let mut observed = ObservedResources::new();
        observed.insert(
            "public".into(),
            present("1", &[("fosid", Value::Int(1)), ("name", "public".into()), ("events", events(&[]))]),
        );

        let result = DiffEngine::new().compute_diff(&desired, &SyncState::new("https://fmg"), &observed);
        let diff = &result.diffs[0];
        assert_eq!(diff.diff_type, DiffType::Adopt);
        assert_eq!(diff.touched, BTreeSet::from([String::from("events")]));
        assert_eq!(diff.id.as_deref(), Some("1"));
    }

    #[test]
    fn test_unchanged_and_drifted() {
        let config = config(CONFIG);
        let registry = SchemaRegistry::with_builtins();
        let desired = resolve_all(&config, &registry).unwrap();

        let mut state = SyncState::new("https://fmg");
        recorded(&mut state, json!({"fosid": 1, "name": "public", "events": ["cpu-high"]}));

        let mut observed = ObservedResources::new();
        observed.insert(
            "public".into(),
            present("1", &[("fosid", Value::Int(1)), ("name", "public".into()), ("events", events(&["cpu-high"]))]),
        );
        let result = DiffEngine::new().compute_diff(&desired, &state, &observed);
        assert_eq!(result.diffs[0].diff_type, DiffType::NoChange);
        assert!(!result.has_changes());

        observed.insert(
            "public".into(),
            present("1", &[("fosid", Value::Int(1)), ("name", "private".into()), ("events", events(&["cpu-high"]))]),
        );
        let result = DiffEngine::new().compute_diff(&desired, &state, &observed);
        let diff = &result.diffs[0];
        assert_eq!(diff.diff_type, DiffType::Drift);
        assert_eq!(diff.details[0].old_value.as_deref(), Some("private"));
        assert_eq!(diff.details[0].new_value.as_deref(), Some("public"));
    }

    #[test]
    fn test_removed_field_is_touched() {
        let config = config(CONFIG);
        let registry = SchemaRegistry::with_builtins();
        let desired = resolve_all(&config, &registry).unwrap();

        let mut state = SyncState::new("https://fmg");
        recorded(
            &mut state,
            json!({"fosid": 1, "name": "public", "events": ["cpu-high"], "mib_view": "all"}),
        );

        let mut observed = ObservedResources::new();
        observed.insert(
            "public".into(),
            present(
                "1",
                &[
                    ("fosid", Value::Int(1)),
                    ("name", "public".into()),
                    ("events", events(&["cpu-high"])),
                    ("mib_view", "all".into()),
                ],
            ),
        );

        let result = DiffEngine::new().compute_diff(&desired, &state, &observed);
        let diff = &result.diffs[0];
        assert_eq!(diff.diff_type, DiffType::Update);
        assert_eq!(diff.touched, BTreeSet::from([String::from("mib_view")]));
        assert_eq!(diff.details[0].new_value, None);
    }

    #[test]
    fn test_key_change_is_replace_and_orphan_is_delete() {
        let config = config(&CONFIG.replace("fosid: 1", "fosid: 2"));
        let registry = SchemaRegistry::with_builtins();
        let desired = resolve_all(&config, &registry).unwrap();

        let mut state = SyncState::new("https://fmg");
        recorded(&mut state, json!({"fosid": 1, "name": "public"}));
        state.set_resource(ResourceRecord::new(
            "stale",
            "firewall_address",
            "web",
            PathParams::from_pairs([("adom", "root")]),
        ));

        let result = DiffEngine::new().compute_diff(&desired, &state, &ObservedResources::new());
        assert_eq!(result.of_type(DiffType::Replace).len(), 1);
        assert_eq!(result.of_type(DiffType::Replace)[0].id.as_deref(), Some("1"));
        assert_eq!(result.of_type(DiffType::Delete)[0].name, "stale");
        assert_eq!(result.total_changes(), 2);
    }
}
