//! Plan executor.
//!
//! Runs planned actions one at a time through the [`ResourceDispatcher`]
//! and records every outcome in the [`SyncState`].

use std::collections::HashSet;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::error::{ConfigError, FortiSyncError, PlanError, ReconcileError, Result};
use crate::resource::{ResourceDispatcher, ResourceState};
use crate::schema::SchemaRegistry;
use crate::state::{HistoryEntry, ResourceRecord, SyncOperation, SyncState};
use crate::transcode::FieldSelection;

use super::desired::{find_desired, DesiredResource};
use super::plan::{ActionType, PlannedAction, SyncPlan};

const SKIPPED: &str = "Skipped due to dependency failure";

/// Executor for sync plans.
pub struct PlanExecutor<'a> {
    /// Dispatcher used for every call.
    dispatcher: &'a ResourceDispatcher,
    /// Registry for descriptors of recorded resources.
    registry: &'a SchemaRegistry,
    /// Resolved configuration.
    desired: &'a [DesiredResource<'a>],
    /// Whether to continue after a failed action.
    continue_on_error: bool,
}

/// Result of executing a single action.
#[derive(Debug, serde::Serialize)]
pub struct ActionResult {
    /// Action index.
    pub index: usize,
    /// Action that was executed.
    pub action: PlannedAction,
    /// Whether the action succeeded.
    pub success: bool,
    /// Object id after the action.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Error message (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall time of the action in milliseconds.
    pub duration_ms: u64,
}

/// Result of executing the entire plan.
#[derive(Debug, Default, serde::Serialize)]
pub struct ExecutionResult {
    /// Individual action results.
    pub results: Vec<ActionResult>,
    /// Number of successful actions.
    pub successful: usize,
    /// Number of failed actions.
    pub failed: usize,
    /// Number of actions skipped after a dependency failed.
    pub skipped: usize,
    /// Whether every action succeeded.
    pub success: bool,
}

impl<'a> PlanExecutor<'a> {
    /// Creates a new plan executor.
    #[must_use]
    pub const fn new(
        dispatcher: &'a ResourceDispatcher,
        registry: &'a SchemaRegistry,
        desired: &'a [DesiredResource<'a>],
    ) -> Self {
        Self {
            dispatcher,
            registry,
            desired,
            continue_on_error: false,
        }
    }

    /// Sets whether to continue on errors.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Executes a plan, updating `state` after every successful action.
    ///
    /// Failures are reported in the result, not as an error. A history entry
    /// for `operation` is appended at the end.
    pub async fn execute(
        &self,
        plan: &SyncPlan,
        state: &mut SyncState,
        operation: SyncOperation,
    ) -> ExecutionResult {
        info!("Executing sync plan with {} actions", plan.actions.len());

        let mut results = Vec::new();
        let mut failed_indices: HashSet<usize> = HashSet::new();

        for (index, action) in plan.actions.iter().enumerate() {
            if action.dependencies.iter().any(|dep| failed_indices.contains(dep)) {
                warn!("Skipping '{}': a dependency failed", action.resource_name);
                failed_indices.insert(index);
                results.push(ActionResult {
                    index,
                    action: action.clone(),
                    success: false,
                    id: None,
                    error: Some(SKIPPED.to_string()),
                    duration_ms: 0,
                });
                continue;
            }

            let started = Instant::now();
            let outcome = self.execute_action(action, state).await;
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            let result = match outcome {
                Ok(id) => {
                    info!("{} done", action.description());
                    ActionResult {
                        index,
                        action: action.clone(),
                        success: true,
                        id,
                        error: None,
                        duration_ms,
                    }
                }
                Err(e) => {
                    error!("{} failed: {e}", action.description());
                    failed_indices.insert(index);
                    ActionResult {
                        index,
                        action: action.clone(),
                        success: false,
                        id: None,
                        error: Some(e.to_string()),
                        duration_ms,
                    }
                }
            };

            let stop = !result.success && !self.continue_on_error;
            results.push(result);
            if stop {
                break;
            }
        }

        let skipped = results.iter().filter(|r| r.error.as_deref() == Some(SKIPPED)).count();
        let successful = results.iter().filter(|r| r.success).count();
        let failed = results.len() - successful - skipped;
        let success = failed == 0 && skipped == 0 && results.len() == plan.actions.len();

        let resources = plan.actions.iter().map(|a| a.resource_name.clone()).collect();
        if success {
            state.add_history(HistoryEntry::new(operation, &plan.config_hash, resources));
            if operation == SyncOperation::Apply {
                state.config_hash.clone_from(&plan.config_hash);
            }
        } else {
            state.add_history(HistoryEntry::failed(
                operation,
                &plan.config_hash,
                resources,
                &format!("{failed} actions failed, {skipped} skipped"),
            ));
        }

        ExecutionResult {
            results,
            successful,
            failed,
            skipped,
            success,
        }
    }

    /// Executes one action and returns the object id afterwards.
    async fn execute_action(&self, action: &PlannedAction, state: &mut SyncState) -> Result<Option<String>> {
        match action.action_type {
            ActionType::Create => {
                let desired = self.desired_for(action)?;
                let created = self
                    .dispatcher
                    .create(desired.descriptor, &desired.params, &desired.attributes)
                    .await?;
                let created = require_present(action, created, "object not found after create")?;

                let mut record = ResourceRecord::new(
                    desired.name(),
                    &desired.descriptor.name,
                    &created.id,
                    desired.params.clone(),
                );
                record.set_applied(&desired.config.attributes, &desired.hash);
                record.set_observed(desired.descriptor, &created.attributes);
                state.set_resource(record);

                Ok(Some(created.id))
            }
            ActionType::Update | ActionType::Adopt => {
                let desired = self.desired_for(action)?;
                let id = action
                    .id
                    .as_deref()
                    .or(desired.id.as_deref())
                    .ok_or_else(|| missing_id(action))?;
                let selection = FieldSelection::Touched(action.touched.clone());

                let updated = self
                    .dispatcher
                    .update(desired.descriptor, &desired.params, id, &desired.attributes, &selection)
                    .await?;
                let updated = require_present(action, updated, "object disappeared during update")?;

                let mut record = state.get_resource(desired.name()).cloned().unwrap_or_else(|| {
                    ResourceRecord::new(desired.name(), &desired.descriptor.name, &updated.id, desired.params.clone())
                });
                record.set_applied(&desired.config.attributes, &desired.hash);
                record.set_observed(desired.descriptor, &updated.attributes);
                state.set_resource(record);

                Ok(Some(updated.id))
            }
            ActionType::Delete => {
                let descriptor = self.registry.get(&action.resource_type).ok_or_else(|| {
                    ConfigError::UnknownResourceType {
                        name: action.resource_name.clone(),
                        resource_type: action.resource_type.clone(),
                    }
                })?;
                let id = action.id.as_deref().ok_or_else(|| missing_id(action))?;
                let params = action.params.clone().unwrap_or_default();

                self.dispatcher.delete(descriptor, &params, id).await?;
                state.remove_resource(&action.resource_name);

                Ok(None)
            }
        }
    }

    fn desired_for(&self, action: &PlannedAction) -> Result<&'a DesiredResource<'a>> {
        find_desired(self.desired, &action.resource_name).ok_or_else(|| {
            PlanError::MissingResource {
                name: action.resource_name.clone(),
            }
            .into()
        })
    }
}

fn require_present(action: &PlannedAction, state: ResourceState, reason: &str) -> Result<ResourceState> {
    if state.is_present() {
        Ok(state)
    } else {
        Err(ReconcileError::ResourceReconcileFailed {
            resource_type: action.resource_type.clone(),
            name: action.resource_name.clone(),
            reason: reason.to_string(),
        }
        .into())
    }
}

fn missing_id(action: &PlannedAction) -> FortiSyncError {
    ReconcileError::ResourceReconcileFailed {
        resource_type: action.resource_type.clone(),
        name: action.resource_name.clone(),
        reason: String::from("no object id"),
    }
    .into()
}
