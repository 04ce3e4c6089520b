// ============================================================================
// Linting
// ============================================================================

#![warn(missing_docs)]                // Public items should be documented
#![warn(unused_must_use)]             // Handle Result and Option explicitly
#![warn(nonstandard_style)]           // Standard naming conventions
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # fortisync
//!
//! Declarative, idempotent configuration management for FortiManager.
//!
//! ## Overview
//!
//! fortisync keeps FortiManager configuration objects (SNMP communities,
//! address objects, Fabric VPN settings, switch locations, ...) in line with
//! a YAML file:
//!
//! - Describe the objects you want in `fortisync.yaml`
//! - See what would change with `fortisync plan`
//! - Push the changes with `fortisync apply`
//! - Detect changes made on FortiManager with `fortisync drift`
//!
//! ## Architecture
//!
//! Every resource type is described by a [`schema::ResourceDescriptor`]: its
//! URL path, its identity and a tree of field descriptors. One recursive
//! transcoder converts between the flat local shape and the hyphenated wire
//! shape of the FortiManager JSON-RPC API for every type.
//!
//! 1. **Desired state**: `fortisync.yaml`, normalized against the descriptors
//! 2. **Recorded state**: `.fortisync/state.json`, what was last applied and read
//! 3. **Observed state**: objects read back from FortiManager
//! 4. **Reconciler**: diffs the three and drives the CRUD dispatcher
//!
//! ## Modules
//!
//! - [`schema`]: Field and resource descriptors, built-in resource table
//! - [`transcode`]: Flatten and expand between local and wire shapes
//! - [`client`]: FortiManager JSON-RPC client
//! - [`resource`]: Path resolution and the CRUD dispatcher
//! - [`config`]: Configuration parsing and validation
//! - [`state`]: Local state storage and locking
//! - [`planner`]: Diff computation and plan execution
//! - [`reconciler`]: Apply, refresh, drift, import and destroy
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! provider:
//!   url: https://fortimanager.example.com
//!
//! defaults:
//!   device: fgt-branch-01
//!
//! resources:
//!   - name: monitoring
//!     type: system_snmp_community
//!     attributes:
//!       fosid: 1
//!       name: monitoring
//!       hosts:
//!         - fosid: 1
//!           ip: 10.0.0.10 255.255.255.255
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod planner;
pub mod reconciler;
pub mod resource;
pub mod schema;
pub mod state;
pub mod transcode;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use client::{ConfigApi, FortiManagerClient, RequestOptions};
pub use config::{ConfigHasher, ConfigParser, ConfigValidator, SyncConfig};
pub use error::{FortiSyncError, Result};
pub use planner::{DiffEngine, PlanExecutor, SyncPlan};
pub use reconciler::{DriftReport, ReconciliationResult, Reconciler};
pub use resource::{ResourceDispatcher, ResourceState};
pub use schema::{FieldDescriptor, ResourceDescriptor, SchemaRegistry};
pub use state::{LocalStateStore, StateStore, SyncState};
pub use transcode::{expand_object, flatten_object, FieldSelection};
