//! Integration tests for the FortiManager JSON-RPC client using wiremock.

use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fortisync::client::{ConfigApi, Credentials, FortiManagerClient, JsonMap, RequestOptions};
use fortisync::error::{ApiError, FortiSyncError};
use fortisync::resource::{PathParams, ResourceDispatcher};
use fortisync::schema::SchemaRegistry;
use std::sync::Arc;

const COMMUNITY_URL: &str = "/pm/config/device/fgt1/global/system/snmp/community";

fn token_client(server: &MockServer) -> FortiManagerClient {
    FortiManagerClient::new(&server.uri(), Duration::from_secs(5), false)
        .unwrap()
        .with_token("test-token")
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": 1,
        "result": [{"status": {"code": 0, "message": "OK"}, "url": COMMUNITY_URL, "data": data}]
    }))
}

fn status(code: i64, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": 1,
        "result": [{"status": {"code": code, "message": message}, "url": COMMUNITY_URL}]
    }))
}

#[tokio::test]
async fn test_add_sends_payload_with_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(bearer_token("test-token"))
        .and(body_partial_json(json!({
            "method": "add",
            "params": [{"url": COMMUNITY_URL, "data": {"id": 1, "name": "public"}}]
        })))
        .respond_with(ok(json!({"id": 1})))
        .expect(1)
        .mount(&server)
        .await;

    let mut data = JsonMap::new();
    data.insert("id".into(), json!(1));
    data.insert("name".into(), json!("public"));

    let response = token_client(&server)
        .add(COMMUNITY_URL, &data, &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(response["id"], json!(1));
}

#[tokio::test]
async fn test_get_returns_object_data() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({"method": "get"})))
        .respond_with(ok(json!({"id": 1, "name": "public", "status": "enable"})))
        .mount(&server)
        .await;

    let object = token_client(&server)
        .get(&format!("{COMMUNITY_URL}/1"), &RequestOptions::default())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(object["status"], json!("enable"));
}

#[tokio::test]
async fn test_get_missing_object_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .respond_with(status(-3, "Object does not exist"))
        .mount(&server)
        .await;

    let object = token_client(&server)
        .get(&format!("{COMMUNITY_URL}/9"), &RequestOptions::default())
        .await
        .unwrap();
    assert!(object.is_none());
}

async fn mount_get(server: &MockServer, data: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({"method": "get"})))
        .respond_with(ok(data))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_with_null_data_is_none() {
    let server = MockServer::start().await;
    mount_get(&server, json!(null)).await;

    let object = token_client(&server)
        .get(&format!("{COMMUNITY_URL}/1"), &RequestOptions::default())
        .await
        .unwrap();
    assert!(object.is_none());
}

#[tokio::test]
async fn test_get_with_empty_array_data_is_none() {
    let server = MockServer::start().await;
    mount_get(&server, json!([])).await;

    let object = token_client(&server)
        .get(&format!("{COMMUNITY_URL}/1"), &RequestOptions::default())
        .await
        .unwrap();
    assert!(object.is_none());
}

#[tokio::test]
async fn test_read_with_null_data_clears_id() {
    let server = MockServer::start().await;
    mount_get(&server, json!(null)).await;

    let registry = SchemaRegistry::with_builtins();
    let descriptor = registry.get("system_snmp_community").unwrap();
    let dispatcher = ResourceDispatcher::new(Arc::new(token_client(&server)), RequestOptions::default());
    let params = PathParams::from_pairs([("device", "fgt1")]);

    let state = dispatcher.read(descriptor, &params, "1").await.unwrap();
    assert_eq!(state.id, "");
    assert!(state.attributes.is_empty());
}

#[tokio::test]
async fn test_nonzero_status_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .respond_with(status(-10, "The data is invalid for selected url"))
        .mount(&server)
        .await;

    let err = token_client(&server)
        .update(COMMUNITY_URL, &JsonMap::new(), &RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FortiSyncError::Api(ApiError::Status { code: -10, .. })
    ));
}

#[tokio::test]
async fn test_401_is_authentication_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = token_client(&server)
        .delete(&format!("{COMMUNITY_URL}/1"), &RequestOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FortiSyncError::Api(ApiError::AuthenticationFailed { .. })
    ));
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;

    let err = token_client(&server)
        .get(COMMUNITY_URL, &RequestOptions::default().with_attempts(3))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FortiSyncError::Api(ApiError::RequestFailed { status: 500, .. })
    ));
}

#[tokio::test]
async fn test_delete_of_missing_object_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({"method": "delete"})))
        .respond_with(status(-3, "Object does not exist"))
        .mount(&server)
        .await;

    token_client(&server)
        .delete(&format!("{COMMUNITY_URL}/1"), &RequestOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_password_login_uses_session() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({
            "method": "exec",
            "params": [{"url": "/sys/login/user", "data": {"user": "admin", "passwd": "secret"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "result": [{"status": {"code": 0, "message": "OK"}, "url": "/sys/login/user"}],
            "session": "abc123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .and(body_partial_json(json!({"method": "get", "session": "abc123"})))
        .respond_with(ok(json!({"name": "public"})))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = Credentials::Password {
        username: "admin".into(),
        password: "secret".into(),
    };
    let client =
        FortiManagerClient::connect(&server.uri(), Duration::from_secs(5), false, &credentials)
            .await
            .unwrap();

    let object = client
        .get(COMMUNITY_URL, &RequestOptions::default())
        .await
        .unwrap();
    assert!(object.is_some());
}

#[tokio::test]
async fn test_rejected_login() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/jsonrpc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "result": [{"status": {"code": -22, "message": "Login fail"}, "url": "/sys/login/user"}]
        })))
        .mount(&server)
        .await;

    let err = FortiManagerClient::new(&server.uri(), Duration::from_secs(5), false)
        .unwrap()
        .login("admin", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        FortiSyncError::Api(ApiError::AuthenticationFailed { .. })
    ));
}
