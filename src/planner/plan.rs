//! Sync plan types and construction.
//!
//! A plan turns a [`DiffResult`] into an ordered list of dispatcher calls.
//! Deletes of resources that left the configuration run first, then
//! replacements (delete followed by create), creates and finally updates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::resource::PathParams;
use crate::state::SyncState;

use super::diff::{DiffResult, DiffType, ResourceDiff};

/// A complete sync plan.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Configuration hash this plan is based on.
    pub config_hash: String,
    /// Planned actions in execution order.
    pub actions: Vec<PlannedAction>,
}

/// A single planned action.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    /// Action type.
    pub action_type: ActionType,
    /// Resource name.
    pub resource_name: String,
    /// Resource type.
    pub resource_type: String,
    /// Object id for updates and deletes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Recorded path parameters for deletes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<PathParams>,
    /// Fields an update sends.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub touched: BTreeSet<String>,
    /// Reason for this action.
    pub reason: String,
    /// Configuration hash after the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_hash: Option<String>,
    /// Indices of actions that must succeed first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<usize>,
}

/// Types of actions in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Create the object.
    Create,
    /// Update the touched fields of the object.
    Update,
    /// Record an existing object, updating the fields that differ.
    Adopt,
    /// Delete the object.
    Delete,
}

impl SyncPlan {
    /// Creates a plan from a diff result.
    ///
    /// Deletes take the object location from the state record.
    #[must_use]
    pub fn from_diff(diff: &DiffResult, state: &SyncState, config_hash: &str) -> Self {
        let mut actions = Vec::new();

        for resource_diff in diff.of_type(DiffType::Delete) {
            actions.push(Self::delete_action(resource_diff, state, "removed from configuration"));
        }

        for resource_diff in diff.of_type(DiffType::Replace) {
            let delete_idx = actions.len();
            let reason = resource_diff.reason.as_deref().unwrap_or("replacement");
            actions.push(Self::delete_action(resource_diff, state, reason));

            let mut create = PlannedAction::from_diff(ActionType::Create, resource_diff, reason);
            create.id = None;
            create.dependencies = vec![delete_idx];
            actions.push(create);
        }

        for resource_diff in diff.of_type(DiffType::Create) {
            let reason = resource_diff.reason.as_deref().unwrap_or("defined in configuration");
            actions.push(PlannedAction::from_diff(ActionType::Create, resource_diff, reason));
        }

        for resource_diff in &diff.diffs {
            let (action_type, reason) = match resource_diff.diff_type {
                DiffType::Update => (ActionType::Update, "configuration changed"),
                DiffType::Drift => (ActionType::Update, "changed outside fortisync"),
                DiffType::Adopt => (ActionType::Adopt, "object already exists on FortiManager"),
                _ => continue,
            };
            actions.push(PlannedAction::from_diff(action_type, resource_diff, reason));
        }

        Self {
            created_at: Utc::now(),
            config_hash: config_hash.to_string(),
            actions,
        }
    }

    /// Creates a plan deleting every recorded resource, newest first.
    #[must_use]
    pub fn destroy(state: &SyncState) -> Self {
        let mut records: Vec<_> = state.resources.values().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.name.cmp(&a.name)));

        let actions = records
            .into_iter()
            .map(|record| PlannedAction {
                action_type: ActionType::Delete,
                resource_name: record.name.clone(),
                resource_type: record.resource_type.clone(),
                id: Some(record.id.clone()),
                params: Some(record.params.clone()),
                touched: BTreeSet::new(),
                reason: String::from("destroy"),
                new_hash: None,
                dependencies: vec![],
            })
            .collect();

        Self {
            created_at: Utc::now(),
            config_hash: String::new(),
            actions,
        }
    }

    fn delete_action(resource_diff: &ResourceDiff, state: &SyncState, reason: &str) -> PlannedAction {
        let record = state.get_resource(&resource_diff.name);
        PlannedAction {
            action_type: ActionType::Delete,
            resource_name: resource_diff.name.clone(),
            resource_type: record.map_or_else(|| resource_diff.resource_type.clone(), |r| r.resource_type.clone()),
            id: record.map(|r| r.id.clone()).or_else(|| resource_diff.id.clone()),
            params: record.map(|r| r.params.clone()),
            touched: BTreeSet::new(),
            reason: reason.to_string(),
            new_hash: None,
            dependencies: vec![],
        }
    }

    /// Returns true if the plan has no actions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the number of actions.
    #[must_use]
    pub const fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Returns the number of actions of a type.
    #[must_use]
    pub fn count(&self, action_type: ActionType) -> usize {
        self.actions.iter().filter(|a| a.action_type == action_type).count()
    }
}

impl PlannedAction {
    fn from_diff(action_type: ActionType, diff: &ResourceDiff, reason: &str) -> Self {
        Self {
            action_type,
            resource_name: diff.name.clone(),
            resource_type: diff.resource_type.clone(),
            id: diff.id.clone(),
            params: None,
            touched: diff.touched.clone(),
            reason: reason.to_string(),
            new_hash: diff.new_hash.clone(),
            dependencies: vec![],
        }
    }

    /// Returns a human-readable description of the action.
    #[must_use]
    pub fn description(&self) -> String {
        let verb = match self.action_type {
            ActionType::Create => "Create",
            ActionType::Update => "Update",
            ActionType::Adopt => "Adopt",
            ActionType::Delete => "Delete",
        };
        format!("{verb} {} '{}'", self.resource_type, self.resource_name)
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Adopt => "adopt",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.action_type, self.resource_name)?;
        if !self.touched.is_empty() {
            let fields: Vec<&str> = self.touched.iter().map(String::as_str).collect();
            write!(f, " [{}]", fields.join(", "))?;
        }
        if !self.reason.is_empty() {
            write!(f, " ({})", self.reason)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for SyncPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No changes required");
        }

        writeln!(f, "Sync plan ({} actions):", self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ResourceRecord;

    fn diff(name: &str, diff_type: DiffType, id: Option<&str>) -> ResourceDiff {
        ResourceDiff {
            name: name.to_string(),
            resource_type: String::from("firewall_address"),
            diff_type,
            id: id.map(String::from),
            touched: BTreeSet::new(),
            details: vec![],
            old_hash: None,
            new_hash: Some(String::from("h")),
            reason: None,
        }
    }

    fn state_with(names: &[&str]) -> SyncState {
        let mut state = SyncState::new("https://fmg");
        for name in names {
            state.set_resource(ResourceRecord::new(
                name,
                "firewall_address",
                name,
                PathParams::from_pairs([("adom", "root")]),
            ));
        }
        state
    }

    #[test]
    fn test_action_order() {
        let mut update = diff("changed", DiffType::Update, Some("changed"));
        update.touched.insert(String::from("comment"));

        let result = DiffResult::from_diffs(vec![
            update,
            diff("new", DiffType::Create, None),
            diff("moved", DiffType::Replace, Some("moved")),
            diff("gone", DiffType::Delete, Some("gone")),
            diff("same", DiffType::NoChange, Some("same")),
        ]);
        let state = state_with(&["changed", "moved", "gone", "same"]);
        let plan = SyncPlan::from_diff(&result, &state, "cfg");

        let order: Vec<(ActionType, &str)> = plan
            .actions
            .iter()
            .map(|a| (a.action_type, a.resource_name.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                (ActionType::Delete, "gone"),
                (ActionType::Delete, "moved"),
                (ActionType::Create, "moved"),
                (ActionType::Create, "new"),
                (ActionType::Update, "changed"),
            ]
        );
        assert_eq!(plan.actions[2].dependencies, vec![1]);
        assert_eq!(plan.actions[2].id, None);
        assert_eq!(plan.actions[0].params.as_ref().and_then(|p| p.get("adom")), Some("root"));
        assert!(plan.actions[4].touched.contains("comment"));
        assert_eq!(plan.count(ActionType::Delete), 2);
    }

    #[test]
    fn test_empty_plan() {
        let plan = SyncPlan::from_diff(&DiffResult::default(), &SyncState::new("x"), "cfg");
        assert!(plan.is_empty());
        assert_eq!(plan.to_string(), "No changes required");
    }

    #[test]
    fn test_destroy_plan_deletes_everything() {
        let state = state_with(&["a", "b"]);
        let plan = SyncPlan::destroy(&state);
        assert_eq!(plan.count(ActionType::Delete), 2);
        assert!(plan.actions.iter().all(|a| a.id.is_some() && a.params.is_some()));
    }
}
