//! The configuration API seam used by the resource dispatcher.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// A JSON object as sent to or returned by FortiManager.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Per-call request options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Total attempts for retryable failures. Values below 1 mean 1.
    pub max_attempts: u32,
    /// Timeout for a single attempt. `None` uses the client default.
    pub timeout: Option<Duration>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            timeout: None,
        }
    }
}

impl RequestOptions {
    /// Sets the number of attempts.
    #[must_use]
    pub const fn with_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Sets the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Object-level operations against a configuration endpoint.
///
/// `url` is a full object or collection URL such as
/// `/pm/config/device/fgt1/global/system/snmp/community/1`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConfigApi: Send + Sync {
    /// Adds an entry to a collection. Returns the response data.
    async fn add(&self, url: &str, data: &JsonMap, options: &RequestOptions) -> Result<JsonMap>;

    /// Reads an object. Returns `None` if the object does not exist.
    async fn get(&self, url: &str, options: &RequestOptions) -> Result<Option<JsonMap>>;

    /// Updates the given fields of an object. Returns the response data.
    async fn update(&self, url: &str, data: &JsonMap, options: &RequestOptions) -> Result<JsonMap>;

    /// Deletes an object.
    async fn delete(&self, url: &str, options: &RequestOptions) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options_single_attempt() {
        let options = RequestOptions::default();
        assert_eq!(options.max_attempts, 1);
        assert!(options.timeout.is_none());

        let options = options.with_attempts(3).with_timeout(Duration::from_secs(5));
        assert_eq!(options.max_attempts, 3);
        assert_eq!(options.timeout, Some(Duration::from_secs(5)));
    }
}
