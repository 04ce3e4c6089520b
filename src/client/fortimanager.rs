//! FortiManager JSON-RPC client implementation.

use async_trait::async_trait;
use reqwest::{header, Client};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::error::{ApiError, FortiSyncError, Result};

use super::api::{ConfigApi, JsonMap, RequestOptions};
use super::jsonrpc::{RpcParams, RpcRequest, RpcResponse, RpcResult, OBJECT_NOT_FOUND};

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Credentials used to open a client.
#[derive(Clone)]
pub enum Credentials {
    /// API token sent as a bearer header.
    Token(String),
    /// Administrator login exchanged for a session.
    Password {
        /// Administrator name.
        username: String,
        /// Administrator password.
        password: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Password { username, .. } => write!(f, "Password({username}, ***)"),
        }
    }
}

#[derive(Clone, Default)]
enum Auth {
    #[default]
    Anonymous,
    Token(String),
    Session(String),
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Token(_) => f.write_str("Token(***)"),
            Self::Session(_) => f.write_str("Session(***)"),
        }
    }
}

/// FortiManager JSON-RPC client.
#[derive(Debug, Clone)]
pub struct FortiManagerClient {
    /// HTTP client.
    client: Client,
    /// JSON-RPC endpoint (`{base}/jsonrpc`).
    endpoint: String,
    /// How requests are authenticated.
    auth: Auth,
    /// Request id counter shared by clones.
    next_id: Arc<AtomicU64>,
}

impl FortiManagerClient {
    /// Creates an unauthenticated client.
    ///
    /// `insecure` disables TLS certificate verification.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str, timeout: Duration, insecure: bool) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(|e| ApiError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/jsonrpc", base_url.trim_end_matches('/')),
            auth: Auth::Anonymous,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Returns a client that authenticates with an API token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.auth = Auth::Token(token.into());
        self
    }

    /// Logs in and returns a client bound to the new session.
    ///
    /// # Errors
    ///
    /// Returns an error if the login is rejected.
    pub async fn login(self, username: &str, password: &str) -> Result<Self> {
        let data = serde_json::json!({ "user": username, "passwd": password });
        let response = self
            .send(
                "exec",
                "/sys/login/user",
                Some(&data),
                &RequestOptions::default(),
            )
            .await?;

        let result = first_result(response.result, "/sys/login/user")?;
        if !result.status.is_ok() {
            return Err(ApiError::AuthenticationFailed {
                message: result.status.message,
            }
            .into());
        }

        let session = response.session.ok_or_else(|| ApiError::AuthenticationFailed {
            message: String::from("login response carried no session"),
        })?;

        info!("Logged in to FortiManager as {username}");
        Ok(Self {
            auth: Auth::Session(session),
            ..self
        })
    }

    /// Creates a client and authenticates it with the given credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created or login fails.
    pub async fn connect(
        base_url: &str,
        timeout: Duration,
        insecure: bool,
        credentials: &Credentials,
    ) -> Result<Self> {
        let client = Self::new(base_url, timeout, insecure)?;
        match credentials {
            Credentials::Token(token) => Ok(client.with_token(token.clone())),
            Credentials::Password { username, password } => client.login(username, password).await,
        }
    }

    /// Ends a login session. Token clients have nothing to end.
    ///
    /// # Errors
    ///
    /// Returns an error if the logout call fails.
    pub async fn logout(&self) -> Result<()> {
        if !matches!(self.auth, Auth::Session(_)) {
            return Ok(());
        }
        let result = self
            .call("exec", "/sys/logout", None, &RequestOptions::default())
            .await?;
        check_status(&result, "/sys/logout")?;
        debug!("Logged out of FortiManager");
        Ok(())
    }

    /// Executes a call, retrying retryable failures.
    async fn call(
        &self,
        method: &str,
        url: &str,
        data: Option<&serde_json::Value>,
        options: &RequestOptions,
    ) -> Result<RpcResult> {
        let attempts = options.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {attempts} for {method} {url}");
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)))
                    .await;
            }

            match self.send(method, url, data, options).await {
                Ok(response) => return first_result(response.result, url),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ApiError::network("Max retries exceeded").into()))
    }

    /// Sends a single JSON-RPC request.
    async fn send(
        &self,
        method: &str,
        url: &str,
        data: Option<&serde_json::Value>,
        options: &RequestOptions,
    ) -> Result<RpcResponse> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            id,
            method,
            params: vec![RpcParams { url, data }],
            session: match &self.auth {
                Auth::Session(session) => Some(session.as_str()),
                Auth::Anonymous | Auth::Token(_) => None,
            },
            verbose: 1,
        };

        trace!("JSON-RPC {id}: {method} {url}");

        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request);
        if let Auth::Token(token) = &self.auth {
            builder = builder.bearer_auth(token);
        }
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ApiError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ApiError::AuthenticationFailed {
                message: String::from("Invalid credentials or session"),
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::request_failed(status.as_u16(), body).into());
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| ApiError::invalid_response(format!("Failed to parse response: {e}")))?;

        if rpc.id.is_some_and(|echoed| echoed != id) {
            debug!("JSON-RPC response id {:?} does not match request {id}", rpc.id);
        }

        Ok(rpc)
    }
}

fn first_result(results: Vec<RpcResult>, url: &str) -> Result<RpcResult> {
    results.into_iter().next().ok_or_else(|| {
        ApiError::invalid_response(format!("No result block in response for {url}")).into()
    })
}

fn check_status(result: &RpcResult, url: &str) -> Result<()> {
    if result.status.is_ok() {
        Ok(())
    } else {
        Err(FortiSyncError::Api(ApiError::Status {
            url: result.url.clone().unwrap_or_else(|| url.to_string()),
            code: result.status.code,
            message: result.status.message.clone(),
        }))
    }
}

/// Extracts the object carried in a result's `data`.
///
/// Null, an empty object and an array without objects carry nothing.
fn into_object(data: serde_json::Value) -> Option<JsonMap> {
    let map = match data {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Array(items) => items.into_iter().find_map(|item| match item {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })?,
        _ => return None,
    };
    (!map.is_empty()).then_some(map)
}

#[async_trait]
impl ConfigApi for FortiManagerClient {
    async fn add(&self, url: &str, data: &JsonMap, options: &RequestOptions) -> Result<JsonMap> {
        let body = serde_json::Value::Object(data.clone());
        let result = self.call("add", url, Some(&body), options).await?;
        check_status(&result, url)?;
        debug!("Added object at {url}");
        Ok(into_object(result.data).unwrap_or_default())
    }

    async fn get(&self, url: &str, options: &RequestOptions) -> Result<Option<JsonMap>> {
        let result = self.call("get", url, None, options).await?;
        if result.status.code == OBJECT_NOT_FOUND {
            debug!("Object not found at {url}");
            return Ok(None);
        }
        check_status(&result, url)?;
        let object = into_object(result.data);
        if object.is_none() {
            debug!("Empty result at {url}, treating object as absent");
        }
        Ok(object)
    }

    async fn update(&self, url: &str, data: &JsonMap, options: &RequestOptions) -> Result<JsonMap> {
        let body = serde_json::Value::Object(data.clone());
        let result = self.call("update", url, Some(&body), options).await?;
        check_status(&result, url)?;
        debug!("Updated object at {url}");
        Ok(into_object(result.data).unwrap_or_default())
    }

    async fn delete(&self, url: &str, options: &RequestOptions) -> Result<()> {
        let result = self.call("delete", url, None, options).await?;
        if result.status.code == OBJECT_NOT_FOUND {
            debug!("Object at {url} was already gone");
            return Ok(());
        }
        check_status(&result, url)?;
        debug!("Deleted object at {url}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client =
            FortiManagerClient::new("https://fmg.example.com/", Duration::from_secs(5), false)
                .unwrap();
        assert_eq!(client.endpoint, "https://fmg.example.com/jsonrpc");
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = Credentials::Password {
            username: "admin".into(),
            password: "hunter2".into(),
        };
        let shown = format!("{creds:?}");
        assert!(shown.contains("admin"));
        assert!(!shown.contains("hunter2"));
        assert!(!format!("{:?}", Credentials::Token("abc".into())).contains("abc"));
    }

    #[test]
    fn test_into_object_takes_first_array_entry() {
        let map = into_object(json!([{"name": "a"}, {"name": "b"}])).unwrap();
        assert_eq!(map["name"], json!("a"));
    }

    #[test]
    fn test_into_object_without_payload_is_none() {
        assert!(into_object(json!(null)).is_none());
        assert!(into_object(json!([])).is_none());
        assert!(into_object(json!({})).is_none());
        assert!(into_object(json!("ok")).is_none());
        assert!(into_object(json!([1, "a"])).is_none());
    }
}
