//! FortiManager API client.
//!
//! This module provides:
//! - The [`ConfigApi`] trait the resource dispatcher talks to
//! - Per-call [`RequestOptions`]
//! - The reqwest-backed JSON-RPC [`FortiManagerClient`]

mod api;
mod fortimanager;
mod jsonrpc;

pub use api::{ConfigApi, JsonMap, RequestOptions};
pub use fortimanager::{Credentials, FortiManagerClient, DEFAULT_TIMEOUT_SECS};

#[cfg(test)]
pub use api::MockConfigApi;
