//! Reconciler for maintaining desired state.
//!
//! This module implements the loop that compares the desired configuration
//! with what is recorded in state and what FortiManager currently holds,
//! and takes corrective actions to converge them. It also hosts the
//! maintenance operations built on the same pieces: refresh, drift
//! detection, import and destroy.

use tracing::{debug, info, warn};

use crate::config::{ConfigHasher, SyncConfig};
use crate::error::{PlanError, ReconcileError, Result};
use crate::planner::{
    resolve_all, ActionResult, ActionType, DesiredResource, DiffEngine, DiffResult, DiffType,
    ExecutionResult, ObservedResources, PlanExecutor, ResourceDiff, SyncPlan,
};
use crate::resource::ResourceDispatcher;
use crate::schema::{Identity, SchemaRegistry};
use crate::state::{HistoryEntry, LockInfo, ResourceRecord, StateStore, SyncOperation, SyncState};

/// Reconciler for maintaining desired state.
pub struct Reconciler<'a, S: StateStore> {
    /// Configuration.
    config: &'a SyncConfig,
    /// Resource descriptors.
    registry: &'a SchemaRegistry,
    /// State store.
    state_store: &'a S,
    /// CRUD dispatcher.
    dispatcher: &'a ResourceDispatcher,
    /// Configuration hasher.
    hasher: ConfigHasher,
    /// Diff engine.
    diff_engine: DiffEngine,
    /// Keep going after a failed action.
    continue_on_error: bool,
}

/// Result of a reconciliation or destroy run.
#[derive(Debug, serde::Serialize)]
pub struct ReconciliationResult {
    /// Whether every action succeeded.
    pub success: bool,
    /// Number of objects created.
    pub created: usize,
    /// Number of objects updated or adopted.
    pub updated: usize,
    /// Number of objects deleted.
    pub deleted: usize,
    /// Number of resources left unchanged.
    pub unchanged: usize,
    /// Errors encountered.
    pub errors: Vec<String>,
    /// Per-action results.
    pub actions: Vec<ActionResult>,
}

/// Plan computed without applying it.
#[derive(Debug, serde::Serialize)]
pub struct PlanReport {
    /// Per-resource differences.
    pub diff: DiffResult,
    /// Actions an apply would run.
    pub plan: SyncPlan,
}

/// Result of re-reading every managed object.
#[derive(Debug, Default, serde::Serialize)]
pub struct RefreshResult {
    /// Resources read successfully.
    pub refreshed: Vec<String>,
    /// Resources whose objects no longer exist and were dropped from state.
    pub removed: Vec<String>,
    /// Resources that could not be read.
    pub errors: Vec<String>,
}

/// Report of drift detection.
#[derive(Debug, serde::Serialize)]
pub struct DriftReport {
    /// Whether objects changed on FortiManager outside fortisync.
    pub has_drift: bool,
    /// Resources whose objects were modified on FortiManager.
    pub drifted: Vec<ResourceDiff>,
    /// Recorded resources whose objects no longer exist.
    pub missing: Vec<String>,
    /// Configuration changes not applied yet.
    pub pending: Vec<String>,
    /// Number of resources in the configuration.
    pub total_resources: usize,
    /// Number of resources recorded in state.
    pub managed_resources: usize,
}

impl<'a, S: StateStore> Reconciler<'a, S> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(
        config: &'a SyncConfig,
        registry: &'a SchemaRegistry,
        state_store: &'a S,
        dispatcher: &'a ResourceDispatcher,
    ) -> Self {
        Self {
            config,
            registry,
            state_store,
            dispatcher,
            hasher: ConfigHasher::new(),
            diff_engine: DiffEngine::new(),
            continue_on_error: false,
        }
    }

    /// Sets whether to continue after a failed action.
    #[must_use]
    pub const fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Computes the plan an apply would execute. Nothing is written.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be resolved, the state
    /// cannot be loaded or an object cannot be read.
    pub async fn plan(&self) -> Result<PlanReport> {
        let desired = resolve_all(self.config, self.registry)?;
        let state = self.load_state().await?;
        let observed = self.observe(&desired, &state).await?;

        let diff = self.diff_engine.compute_diff(&desired, &state, &observed);
        let plan = SyncPlan::from_diff(&diff, &state, &self.hasher.hash_config(self.config));

        Ok(PlanReport { diff, plan })
    }

    /// Performs a full reconciliation.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is locked, the configuration cannot be
    /// resolved or observation fails. Failed actions are reported in the
    /// result instead.
    pub async fn reconcile(&self) -> Result<ReconciliationResult> {
        let lock = self.state_store.acquire_lock("", "apply").await?;
        let result = self.reconcile_locked().await;
        self.release(&lock).await;
        result
    }

    async fn reconcile_locked(&self) -> Result<ReconciliationResult> {
        info!("Starting reconciliation against {}", self.config.provider.url);

        let config_hash = self.hasher.hash_config(self.config);
        let desired = resolve_all(self.config, self.registry)?;
        let mut state = self.load_state().await?;
        let observed = self.observe(&desired, &state).await?;

        let diff = self.diff_engine.compute_diff(&desired, &state, &observed);
        info!(
            "Diff: {} creates, {} updates, {} deletes, {} unchanged",
            diff.creates, diff.updates, diff.deletes, diff.unchanged
        );

        self.record_unchanged(&diff, &observed, &mut state);

        let plan = SyncPlan::from_diff(&diff, &state, &config_hash);
        let execution = if plan.is_empty() {
            info!("No changes required - state is converged");
            state.config_hash.clone_from(&config_hash);
            ExecutionResult {
                success: true,
                ..ExecutionResult::default()
            }
        } else {
            PlanExecutor::new(self.dispatcher, self.registry, &desired)
                .with_continue_on_error(self.continue_on_error)
                .execute(&plan, &mut state, SyncOperation::Apply)
                .await
        };

        self.state_store.save(&state).await?;

        Ok(ReconciliationResult::from_execution(execution, diff.unchanged))
    }

    /// Re-reads every recorded object and updates the state.
    ///
    /// Objects that no longer exist are dropped from state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is locked or cannot be saved.
    pub async fn refresh(&self) -> Result<RefreshResult> {
        let lock = self.state_store.acquire_lock("", "refresh").await?;
        let result = self.refresh_locked().await;
        self.release(&lock).await;
        result
    }

    async fn refresh_locked(&self) -> Result<RefreshResult> {
        let mut state = self.load_state().await?;
        let mut result = RefreshResult::default();

        let names: Vec<String> = state.resources.keys().cloned().collect();
        for name in names {
            let Some(record) = state.get_resource(&name) else {
                continue;
            };
            let Some(descriptor) = self.registry.get(&record.resource_type) else {
                result
                    .errors
                    .push(format!("{name}: unknown resource type {}", record.resource_type));
                continue;
            };

            match self.dispatcher.read(descriptor, &record.params, &record.id).await {
                Ok(current) if current.is_present() => {
                    if let Some(record) = state.get_resource_mut(&name) {
                        record.set_observed(descriptor, &current.attributes);
                    }
                    result.refreshed.push(name);
                }
                Ok(_) => {
                    warn!("{name} no longer exists on FortiManager, removing from state");
                    state.remove_resource(&name);
                    result.removed.push(name);
                }
                Err(e) => result.errors.push(format!("{name}: {e}")),
            }
        }

        let touched: Vec<String> = result.refreshed.iter().chain(&result.removed).cloned().collect();
        let entry = if result.errors.is_empty() {
            HistoryEntry::new(SyncOperation::Refresh, &state.config_hash, touched)
        } else {
            HistoryEntry::failed(
                SyncOperation::Refresh,
                &state.config_hash,
                touched,
                &format!("{} resources could not be read", result.errors.len()),
            )
        };
        state.add_history(entry);
        self.state_store.save(&state).await?;

        Ok(result)
    }

    /// Checks for drift without applying changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be resolved, the state
    /// cannot be loaded or an object cannot be read.
    pub async fn check_drift(&self) -> Result<DriftReport> {
        info!("Checking for drift against {}", self.config.provider.url);

        let desired = resolve_all(self.config, self.registry)?;
        let state = self.load_state().await?;
        let observed = self.observe(&desired, &state).await?;
        let diff = self.diff_engine.compute_diff(&desired, &state, &observed);

        let drifted: Vec<ResourceDiff> = diff.of_type(DiffType::Drift).into_iter().cloned().collect();

        let missing: Vec<String> = desired
            .iter()
            .filter(|d| state.get_resource(d.name()).is_some())
            .filter(|d| observed.get(d.name()).is_some_and(|o| !o.is_present()))
            .map(|d| d.name().to_string())
            .collect();

        let pending: Vec<String> = diff
            .diffs
            .iter()
            .filter(|d| {
                matches!(
                    d.diff_type,
                    DiffType::Create | DiffType::Update | DiffType::Replace | DiffType::Adopt | DiffType::Delete
                )
            })
            .filter(|d| !missing.contains(&d.name))
            .map(|d| d.name.clone())
            .collect();

        Ok(DriftReport {
            has_drift: !drifted.is_empty() || !missing.is_empty(),
            drifted,
            missing,
            pending,
            total_resources: self.config.resources.len(),
            managed_resources: state.resources.len(),
        })
    }

    /// Adopts an existing FortiManager object as the configured resource `name`.
    ///
    /// Singletons ignore `id` and use their fixed id.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not configured, the object does not
    /// exist or the state cannot be saved.
    pub async fn import(&self, name: &str, id: &str) -> Result<ResourceRecord> {
        let resource = self
            .config
            .resources
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| PlanError::MissingResource { name: name.to_string() })?;
        let desired = DesiredResource::resolve(resource, self.config, self.registry)?;

        let lock = self.state_store.acquire_lock("", "import").await?;
        let result = self.import_locked(&desired, id).await;
        self.release(&lock).await;
        result
    }

    async fn import_locked(&self, desired: &DesiredResource<'_>, id: &str) -> Result<ResourceRecord> {
        let id = match &desired.descriptor.identity {
            Identity::Singleton { id } => id.as_str(),
            Identity::Key { .. } => id,
        };

        let mut state = self.load_state().await?;
        if state.get_resource(desired.name()).is_some() {
            warn!("{} is already managed, replacing its record", desired.name());
        }
        if desired.id.as_deref().is_some_and(|key| key != id) {
            warn!(
                "{} is configured with key {:?}; the next apply will replace object '{id}'",
                desired.name(),
                desired.id
            );
        }

        let current = self.dispatcher.read(desired.descriptor, &desired.params, id).await?;
        if !current.is_present() {
            return Err(ReconcileError::ResourceReconcileFailed {
                resource_type: desired.descriptor.name.clone(),
                name: desired.name().to_string(),
                reason: format!("object '{id}' does not exist"),
            }
            .into());
        }

        let mut record = ResourceRecord::new(
            desired.name(),
            &desired.descriptor.name,
            &current.id,
            desired.params.clone(),
        );
        record.set_applied(&desired.config.attributes, &desired.hash);
        record.set_observed(desired.descriptor, &current.attributes);

        let entry = HistoryEntry::new(SyncOperation::Import, &state.config_hash, vec![record.name.clone()]);
        state.set_resource(record.clone());
        state.add_history(entry);
        self.state_store.save(&state).await?;

        info!("Imported {} '{}' as {}", desired.descriptor.name, current.id, desired.name());
        Ok(record)
    }

    /// Deletes every recorded object from FortiManager.
    ///
    /// # Errors
    ///
    /// Returns an error if the state is locked or cannot be saved.
    pub async fn destroy(&self) -> Result<ReconciliationResult> {
        let lock = self.state_store.acquire_lock("", "destroy").await?;
        let result = self.destroy_locked().await;
        self.release(&lock).await;
        result
    }

    async fn destroy_locked(&self) -> Result<ReconciliationResult> {
        let mut state = self.load_state().await?;
        let plan = SyncPlan::destroy(&state);
        info!("Destroying {} managed resources", plan.action_count());

        let execution = PlanExecutor::new(self.dispatcher, self.registry, &[])
            .with_continue_on_error(self.continue_on_error)
            .execute(&plan, &mut state, SyncOperation::Destroy)
            .await;

        if execution.success {
            state.config_hash.clear();
        }
        self.state_store.save(&state).await?;

        Ok(ReconciliationResult::from_execution(execution, 0))
    }

    /// Loads the state, or starts an empty one.
    async fn load_state(&self) -> Result<SyncState> {
        let state = self.state_store.load().await?.unwrap_or_else(|| {
            debug!("No state at {}, starting empty", self.state_store.location());
            SyncState::new(&self.config.provider.url)
        });

        if state.endpoint != self.config.provider.url {
            warn!(
                "State was recorded against {} but the configuration targets {}",
                state.endpoint, self.config.provider.url
            );
        }
        Ok(state)
    }

    /// Reads the current object of every configured resource that has one.
    ///
    /// Recorded resources are read at their recorded location. Unrecorded
    /// resources are read at their desired location when the id is known,
    /// so objects that already exist are adopted instead of created twice.
    async fn observe(&self, desired: &[DesiredResource<'_>], state: &SyncState) -> Result<ObservedResources> {
        let mut observed = ObservedResources::new();

        for d in desired {
            let target = match state.get_resource(d.name()) {
                Some(record) => match self.registry.get(&record.resource_type) {
                    Some(descriptor) => Some((descriptor, &record.params, record.id.as_str())),
                    None => {
                        warn!("{}: recorded type {} is unknown", record.name, record.resource_type);
                        None
                    }
                },
                None => d.id.as_deref().map(|id| (d.descriptor, &d.params, id)),
            };

            let Some((descriptor, params, id)) = target else {
                continue;
            };

            let current = self.dispatcher.read(descriptor, params, id).await?;
            observed.insert(d.name().to_string(), current);
        }

        debug!("Observed {} objects", observed.len());
        Ok(observed)
    }

    /// Stores freshly read objects of unchanged resources.
    fn record_unchanged(&self, diff: &DiffResult, observed: &ObservedResources, state: &mut SyncState) {
        for resource_diff in diff.of_type(DiffType::NoChange) {
            let (Some(descriptor), Some(current)) = (
                self.registry.get(&resource_diff.resource_type),
                observed.get(&resource_diff.name),
            ) else {
                continue;
            };
            if let Some(record) = state.get_resource_mut(&resource_diff.name) {
                record.set_observed(descriptor, &current.attributes);
            }
        }
    }

    async fn release(&self, lock: &LockInfo) {
        if let Err(e) = self.state_store.release_lock(&lock.lock_id).await {
            warn!("Failed to release state lock: {e}");
        }
    }
}

impl ReconciliationResult {
    fn from_execution(execution: ExecutionResult, unchanged: usize) -> Self {
        let succeeded = |types: &[ActionType]| {
            execution
                .results
                .iter()
                .filter(|r| r.success && types.contains(&r.action.action_type))
                .count()
        };

        let mut errors: Vec<String> = execution
            .results
            .iter()
            .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {e}", r.action.resource_name)))
            .collect();
        if !execution.success && errors.is_empty() {
            errors.push(String::from("plan did not complete"));
        }

        Self {
            success: execution.success,
            created: succeeded(&[ActionType::Create]),
            updated: succeeded(&[ActionType::Update, ActionType::Adopt]),
            deleted: succeeded(&[ActionType::Delete]),
            unchanged,
            errors,
            actions: execution.results,
        }
    }
}

impl DriftReport {
    /// Returns true if FortiManager matches both state and configuration.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        !self.has_drift && self.pending.is_empty()
    }
}

impl std::fmt::Display for DriftReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.has_drift {
            writeln!(f, "Drift detected:")?;
            for diff in &self.drifted {
                writeln!(f, "  ~ {diff}")?;
            }
            for name in &self.missing {
                writeln!(f, "  - {name} (deleted outside fortisync)")?;
            }
        } else {
            writeln!(f, "No drift detected")?;
        }
        if !self.pending.is_empty() {
            writeln!(f, "Pending changes: {}", self.pending.join(", "))?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ReconciliationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = if self.success { "successful" } else { "failed" };
        writeln!(f, "Reconciliation {status}:")?;
        writeln!(f, "  Created: {}", self.created)?;
        writeln!(f, "  Updated: {}", self.updated)?;
        writeln!(f, "  Deleted: {}", self.deleted)?;
        writeln!(f, "  Unchanged: {}", self.unchanged)?;

        if !self.errors.is_empty() {
            writeln!(f, "  Errors:")?;
            for error in &self.errors {
                writeln!(f, "    - {error}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{ConfigApi, JsonMap, RequestOptions};
    use crate::config::ConfigParser;
    use crate::state::LocalStateStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// FortiManager stand-in keeping objects by URL.
    #[derive(Default)]
    struct InMemoryApi {
        objects: Mutex<BTreeMap<String, JsonMap>>,
    }

    impl InMemoryApi {
        fn object(&self, url: &str) -> Option<JsonMap> {
            self.objects.lock().unwrap().get(url).cloned()
        }

        fn set(&self, url: &str, key: &str, value: serde_json::Value) {
            if let Some(object) = self.objects.lock().unwrap().get_mut(url) {
                object.insert(key.to_string(), value);
            }
        }

        fn remove(&self, url: &str) {
            self.objects.lock().unwrap().remove(url);
        }
    }

    #[async_trait]
    impl ConfigApi for InMemoryApi {
        async fn add(&self, url: &str, data: &JsonMap, _: &RequestOptions) -> crate::error::Result<JsonMap> {
            let key = data
                .get("id")
                .or_else(|| data.get("name"))
                .and_then(crate::schema::scalar_to_string)
                .unwrap_or_default();
            self.objects
                .lock()
                .unwrap()
                .insert(format!("{url}/{key}"), data.clone());
            Ok(JsonMap::new())
        }

        async fn get(&self, url: &str, _: &RequestOptions) -> crate::error::Result<Option<JsonMap>> {
            Ok(self.object(url))
        }

        async fn update(&self, url: &str, data: &JsonMap, _: &RequestOptions) -> crate::error::Result<JsonMap> {
            let mut objects = self.objects.lock().unwrap();
            let object = objects.entry(url.to_string()).or_default();
            for (k, v) in data {
                object.insert(k.clone(), v.clone());
            }
            Ok(JsonMap::new())
        }

        async fn delete(&self, url: &str, _: &RequestOptions) -> crate::error::Result<()> {
            self.remove(url);
            Ok(())
        }
    }

    const URL: &str = "/pm/config/device/fgt1/global/system/snmp/community/1";

    const CONFIG: &str = r"
provider:
  url: https://fmg.example.com
defaults:
  device: fgt1
resources:
  - name: public
    type: system_snmp_community
    attributes:
      fosid: 1
      name: public
      events: [cpu-high, mem-low]
  - name: fabric
    type: system_fabric_vpn
    attributes:
      status: enable
";

    struct Fixture {
        api: Arc<InMemoryApi>,
        dispatcher: ResourceDispatcher,
        registry: SchemaRegistry,
        store: LocalStateStore,
        _dir: TempDir,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let api = Arc::new(InMemoryApi::default());
        Fixture {
            dispatcher: ResourceDispatcher::new(api.clone(), RequestOptions::default()),
            api,
            registry: SchemaRegistry::with_builtins(),
            store: LocalStateStore::new(dir.path().join("state.json")),
            _dir: dir,
        }
    }

    fn config(yaml: &str) -> SyncConfig {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let fx = fixture();
        let config = config(CONFIG);
        let reconciler = Reconciler::new(&config, &fx.registry, &fx.store, &fx.dispatcher);

        let first = reconciler.reconcile().await.unwrap();
        assert!(first.success, "{first}");
        assert_eq!(first.created, 2);
        assert_eq!(first.updated, 0);

        let stored = fx.api.object(URL).unwrap();
        assert_eq!(stored["events"], json!(["cpu-high", "mem-low"]));

        let state = fx.store.load().await.unwrap().unwrap();
        assert_eq!(state.resources["public"].id, "1");
        assert_eq!(state.resources["fabric"].id, "SystemFabricVpn");
        assert!(fx.store.lock_info().await.unwrap().is_none());

        let report = reconciler.plan().await.unwrap();
        assert!(report.plan.is_empty(), "{}", report.plan);

        let second = reconciler.reconcile().await.unwrap();
        assert_eq!(second.unchanged, 2);
        assert!(second.actions.is_empty());
    }

    #[tokio::test]
    async fn test_drift_is_detected_and_repaired() {
        let fx = fixture();
        let config = config(CONFIG);
        let reconciler = Reconciler::new(&config, &fx.registry, &fx.store, &fx.dispatcher);
        reconciler.reconcile().await.unwrap();

        fx.api.set(URL, "name", json!("hijacked"));

        let report = reconciler.check_drift().await.unwrap();
        assert!(report.has_drift);
        assert_eq!(report.drifted[0].name, "public");
        assert!(report.drifted[0].touched.contains("name"));
        assert!(report.pending.is_empty());

        let repaired = reconciler.reconcile().await.unwrap();
        assert_eq!(repaired.updated, 1);
        assert_eq!(fx.api.object(URL).unwrap()["name"], json!("public"));
        assert!(reconciler.check_drift().await.unwrap().is_converged());
    }

    #[tokio::test]
    async fn test_refresh_drops_deleted_objects() {
        let fx = fixture();
        let config = config(CONFIG);
        let reconciler = Reconciler::new(&config, &fx.registry, &fx.store, &fx.dispatcher);
        reconciler.reconcile().await.unwrap();

        fx.api.remove(URL);

        let refreshed = reconciler.refresh().await.unwrap();
        assert_eq!(refreshed.removed, vec![String::from("public")]);
        assert_eq!(refreshed.refreshed, vec![String::from("fabric")]);

        let state = fx.store.load().await.unwrap().unwrap();
        assert!(state.get_resource("public").is_none());
        assert_eq!(state.history.last().map(|h| h.operation), Some(SyncOperation::Refresh));
    }

    #[tokio::test]
    async fn test_removed_resource_is_deleted() {
        let fx = fixture();
        let reconciler_config = config(CONFIG);
        Reconciler::new(&reconciler_config, &fx.registry, &fx.store, &fx.dispatcher)
            .reconcile()
            .await
            .unwrap();

        let trimmed = config(&CONFIG[..CONFIG.find("  - name: fabric").unwrap()]);
        let result = Reconciler::new(&trimmed, &fx.registry, &fx.store, &fx.dispatcher)
            .reconcile()
            .await
            .unwrap();

        assert_eq!(result.deleted, 1);
        assert!(fx.api.object("/pm/config/device/fgt1/global/system/fabric-vpn").is_none());
        let state = fx.store.load().await.unwrap().unwrap();
        assert_eq!(state.resource_names(), vec!["public"]);
    }

    #[tokio::test]
    async fn test_import_and_destroy() {
        let fx = fixture();
        fx.api
            .update(URL, json!({"id": 1, "name": "public"}).as_object().unwrap(), &RequestOptions::default())
            .await
            .unwrap();

        let config = config(CONFIG);
        let reconciler = Reconciler::new(&config, &fx.registry, &fx.store, &fx.dispatcher);

        let record = reconciler.import("public", "1").await.unwrap();
        assert_eq!(record.id, "1");
        assert_eq!(record.observed["name"], json!("public"));

        let missing = reconciler.import("public", "9").await.unwrap_err();
        assert!(missing.to_string().contains("does not exist"));

        let unknown = reconciler.import("nope", "1").await.unwrap_err();
        assert!(unknown.to_string().contains("nope"));

        let destroyed = reconciler.destroy().await.unwrap();
        assert!(destroyed.success);
        assert_eq!(destroyed.deleted, 1);
        assert!(fx.api.object(URL).is_none());
        assert!(fx.store.load().await.unwrap().unwrap().resources.is_empty());
    }

    #[tokio::test]
    async fn test_locked_state_is_refused() {
        let fx = fixture();
        let config = config(CONFIG);
        fx.store.acquire_lock("someone", "apply").await.unwrap();

        let err = Reconciler::new(&config, &fx.registry, &fx.store, &fx.dispatcher)
            .reconcile()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("someone"));
        assert!(fx.api.object(URL).is_none());
    }
}
