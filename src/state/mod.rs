//! State management module for fortisync.
//!
//! This module persists what fortisync manages on FortiManager: object ids,
//! path parameters, the last applied configuration and the last observed
//! server object of every resource, plus a short operation history.

mod store;
mod local;
mod lock;
mod types;

pub use store::StateStore;
pub use local::{LocalStateStore, DEFAULT_STATE_PATH};
pub use lock::{generate_holder_id, LockInfo, LOCK_EXPIRY_SECS};
pub use types::{HistoryEntry, ResourceRecord, SyncOperation, SyncState, STATE_VERSION};
