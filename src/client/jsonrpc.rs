//! FortiManager JSON-RPC envelope types.

use serde::{Deserialize, Serialize};

/// Status code returned when the target object does not exist.
pub const OBJECT_NOT_FOUND: i64 = -3;

/// JSON-RPC request body.
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Vec<RpcParams<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<&'a str>,
    /// Ask for option values as names rather than numeric enums.
    pub verbose: u8,
}

/// One parameter block of a request.
#[derive(Debug, Serialize)]
pub struct RpcParams<'a> {
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<&'a serde_json::Value>,
}

/// JSON-RPC response body.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Vec<RpcResult>,
    #[serde(default)]
    pub session: Option<String>,
}

/// One result block of a response.
#[derive(Debug, Deserialize)]
pub struct RpcResult {
    pub status: RpcStatus,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Status of a result block.
#[derive(Debug, Deserialize)]
pub struct RpcStatus {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl RpcStatus {
    pub const fn is_ok(&self) -> bool {
        self.code == 0
    }
}
