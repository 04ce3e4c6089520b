//! Planning module for sync operations.
//!
//! This module resolves the configuration against the schema registry,
//! compares it with the recorded and observed state, and turns the
//! difference into an executable plan.

mod desired;
mod diff;
mod plan;
mod executor;

pub use desired::{find_desired, resolve_all, DesiredResource};
pub use diff::{DiffDetail, DiffEngine, DiffResult, DiffType, ObservedResources, ResourceDiff};
pub use plan::{ActionType, PlannedAction, SyncPlan};
pub use executor::{ActionResult, ExecutionResult, PlanExecutor};
