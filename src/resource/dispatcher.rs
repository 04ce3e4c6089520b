//! CRUD dispatcher.
//!
//! Drives the create / read / update / delete lifecycle of one resource
//! instance: builds URLs from path parameters, transcodes attributes, calls
//! the [`ConfigApi`] and refreshes local state from the server after every
//! write.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::client::{ConfigApi, RequestOptions};
use crate::error::{FortiSyncError, ResourceError, Result};
use crate::schema::{Attributes, Identity, ResourceDescriptor};
use crate::transcode::{expand_object, flatten_object, FieldSelection};

use super::path::{collection_url, object_url, PathParams};

/// Local lifecycle state of one resource instance.
///
/// An empty `id` means the instance is absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
    /// Resource id: the singleton id or the primary key rendered as a string.
    pub id: String,
    /// Attributes as last read from the server.
    pub attributes: Attributes,
}

impl ResourceState {
    /// State of an absent resource.
    #[must_use]
    pub fn absent() -> Self {
        Self::default()
    }

    /// Returns true if the resource exists.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !self.id.is_empty()
    }
}

/// Executes CRUD operations against a configuration API.
#[derive(Clone)]
pub struct ResourceDispatcher {
    /// Configuration API.
    api: Arc<dyn ConfigApi>,
    /// Options passed with every call.
    options: RequestOptions,
}

impl ResourceDispatcher {
    /// Creates a dispatcher.
    #[must_use]
    pub fn new(api: Arc<dyn ConfigApi>, options: RequestOptions) -> Self {
        Self { api, options }
    }

    /// Creates the resource and reads it back.
    ///
    /// Fields equal to their declared default are not sent.
    ///
    /// # Errors
    ///
    /// Returns an error if a path parameter or the primary key is missing,
    /// or the API call fails.
    pub async fn create(
        &self,
        descriptor: &ResourceDescriptor,
        params: &PathParams,
        desired: &Attributes,
    ) -> Result<ResourceState> {
        let url = collection_url(descriptor, params)?;
        let payload = expand_object(&descriptor.fields, desired, &FieldSelection::NonDefault);

        info!("Creating {} at {url}", descriptor.name);

        let id = match &descriptor.identity {
            Identity::Singleton { id } => {
                self.api
                    .update(&url, &payload, &self.options)
                    .await
                    .map_err(|e| wrap("creating", descriptor, e))?;
                id.clone()
            }
            Identity::Key { field } => {
                let key = resource_id(descriptor, desired)?;
                let response = self
                    .api
                    .add(&url, &payload, &self.options)
                    .await
                    .map_err(|e| wrap("creating", descriptor, e))?;
                key.or_else(|| response_key(descriptor, &response))
                    .ok_or_else(|| ResourceError::MissingKey {
                        resource_type: descriptor.name.clone(),
                        field: field.clone(),
                    })?
            }
        };

        self.read(descriptor, params, &id).await
    }

    /// Reads the resource.
    ///
    /// An empty id or a missing server object yields an absent state.
    ///
    /// # Errors
    ///
    /// Returns an error if a path parameter is missing, the API call fails,
    /// or the response does not match the descriptor.
    pub async fn read(
        &self,
        descriptor: &ResourceDescriptor,
        params: &PathParams,
        id: &str,
    ) -> Result<ResourceState> {
        if id.is_empty() {
            return Ok(ResourceState::absent());
        }

        let url = object_url(descriptor, params, id)?;
        debug!("Reading {} at {url}", descriptor.name);

        let Some(object) = self
            .api
            .get(&url, &self.options)
            .await
            .map_err(|e| wrap("reading", descriptor, e))?
        else {
            warn!("{} '{id}' no longer exists, clearing id", descriptor.name);
            return Ok(ResourceState::absent());
        };

        let attributes = flatten_object(&descriptor.fields, &object)
            .map_err(|e| wrap("reading", descriptor, e.into()))?;

        Ok(ResourceState {
            id: id.to_string(),
            attributes,
        })
    }

    /// Updates the selected fields and reads the resource back.
    ///
    /// # Errors
    ///
    /// Returns an error if a path parameter is missing or the API call fails.
    pub async fn update(
        &self,
        descriptor: &ResourceDescriptor,
        params: &PathParams,
        id: &str,
        desired: &Attributes,
        selection: &FieldSelection,
    ) -> Result<ResourceState> {
        let url = object_url(descriptor, params, id)?;
        let payload = expand_object(&descriptor.fields, desired, selection);

        if payload.is_empty() {
            debug!("No fields to update for {} '{id}'", descriptor.name);
        } else {
            info!("Updating {} at {url} ({} fields)", descriptor.name, payload.len());
            self.api
                .update(&url, &payload, &self.options)
                .await
                .map_err(|e| wrap("updating", descriptor, e))?;
        }

        self.read(descriptor, params, id).await
    }

    /// Deletes the resource. The returned state is always absent.
    ///
    /// # Errors
    ///
    /// Returns an error if a path parameter is missing or the API call fails.
    pub async fn delete(
        &self,
        descriptor: &ResourceDescriptor,
        params: &PathParams,
        id: &str,
    ) -> Result<ResourceState> {
        if id.is_empty() {
            return Ok(ResourceState::absent());
        }

        let url = object_url(descriptor, params, id)?;
        info!("Deleting {} at {url}", descriptor.name);

        self.api
            .delete(&url, &self.options)
            .await
            .map_err(|e| wrap("deleting", descriptor, e))?;

        Ok(ResourceState::absent())
    }
}

/// Id of an instance from its desired attributes.
///
/// Singletons always have their fixed id. Keyed resources return `None`
/// when the key is not set.
///
/// # Errors
///
/// Returns an error if the key is set to a non-scalar value.
pub fn resource_id(descriptor: &ResourceDescriptor, attributes: &Attributes) -> Result<Option<String>> {
    match &descriptor.identity {
        Identity::Singleton { id } => Ok(Some(id.clone())),
        Identity::Key { field } => match attributes.get(field) {
            None => Ok(None),
            Some(value) => value.scalar_string().map(Some).ok_or_else(|| {
                ResourceError::MissingKey {
                    resource_type: descriptor.name.clone(),
                    field: field.clone(),
                }
                .into()
            }),
        },
    }
}

fn response_key(
    descriptor: &ResourceDescriptor,
    response: &serde_json::Map<String, serde_json::Value>,
) -> Option<String> {
    let key = descriptor.key_field()?;
    response
        .get(key.wire_name().as_ref())
        .and_then(crate::schema::scalar_to_string)
}

fn wrap(verb: &'static str, descriptor: &ResourceDescriptor, source: FortiSyncError) -> FortiSyncError {
    ResourceError::operation(verb, &descriptor.name, source).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{JsonMap, MockConfigApi};
    use crate::error::ApiError;
    use crate::schema::{normalize_object, SchemaRegistry, Value};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// A recorded API call: method, url, payload.
    type Call = (&'static str, String, Option<JsonMap>);

    /// In-memory FortiManager keyed by object URL.
    struct FakeApi {
        key_wire: &'static str,
        objects: Mutex<BTreeMap<String, JsonMap>>,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeApi {
        fn new(key_wire: &'static str) -> Self {
            Self {
                key_wire,
                objects: Mutex::new(BTreeMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, method: &'static str, url: &str, data: Option<&JsonMap>) {
            self.calls
                .lock()
                .unwrap()
                .push((method, url.to_string(), data.cloned()));
        }
    }

    #[async_trait]
    impl ConfigApi for FakeApi {
        async fn add(&self, url: &str, data: &JsonMap, _: &RequestOptions) -> Result<JsonMap> {
            self.record("add", url, Some(data));
            let key = data
                .get(self.key_wire)
                .and_then(crate::schema::scalar_to_string)
                .unwrap_or_default();
            self.objects
                .lock()
                .unwrap()
                .insert(format!("{url}/{key}"), data.clone());
            let mut response = JsonMap::new();
            response.insert(self.key_wire.to_string(), json!(key));
            Ok(response)
        }

        async fn get(&self, url: &str, _: &RequestOptions) -> Result<Option<JsonMap>> {
            self.record("get", url, None);
            Ok(self.objects.lock().unwrap().get(url).cloned())
        }

        async fn update(&self, url: &str, data: &JsonMap, _: &RequestOptions) -> Result<JsonMap> {
            self.record("update", url, Some(data));
            let mut objects = self.objects.lock().unwrap();
            let object = objects.entry(url.to_string()).or_default();
            for (k, v) in data {
                object.insert(k.clone(), v.clone());
            }
            Ok(JsonMap::new())
        }

        async fn delete(&self, url: &str, _: &RequestOptions) -> Result<()> {
            self.record("delete", url, None);
            self.objects.lock().unwrap().remove(url);
            Ok(())
        }
    }

    fn desired(desc: &ResourceDescriptor, config: serde_json::Value) -> Attributes {
        let serde_json::Value::Object(map) = config else {
            panic!("not an object");
        };
        normalize_object(&desc.fields, &map, "").unwrap()
    }

    fn vdom_params() -> PathParams {
        PathParams::from_pairs([("device", "fgt1"), ("vdom", "root")])
    }

    #[tokio::test]
    async fn test_create_nested_table_payload_and_id() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("firewall_internet_service_addition").unwrap();
        let api = Arc::new(FakeApi::new("id"));
        let dispatcher = ResourceDispatcher::new(api.clone(), RequestOptions::default());

        let attrs = desired(
            desc,
            json!({
                "fosid": 5,
                "entry": [
                    {"fosid": 1, "protocol": 6, "port_range": [{"fosid": 1, "start_port": 80, "end_port": 80}]},
                    {"fosid": 2, "protocol": 17, "port_range": [{"fosid": 1, "start_port": 53, "end_port": 53}]}
                ]
            }),
        );

        let state = dispatcher.create(desc, &vdom_params(), &attrs).await.unwrap();
        assert_eq!(state.id, "5");

        let calls = api.calls();
        let (method, url, payload) = &calls[0];
        assert_eq!(*method, "add");
        assert_eq!(
            url,
            "/pm/config/device/fgt1/vdom/root/firewall/internet-service-addition"
        );
        let entries = payload.as_ref().unwrap()["entry"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["port-range"][0]["end-port"], json!(80));
        assert!(entries[0].get("port_range").is_none());

        // read-after-write
        assert_eq!(calls[1].0, "get");
        assert_eq!(
            calls[1].1,
            "/pm/config/device/fgt1/vdom/root/firewall/internet-service-addition/5"
        );
    }

    #[tokio::test]
    async fn test_singleton_create_updates_fixed_url() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("system_fabric_vpn").unwrap();
        let api = Arc::new(FakeApi::new("id"));
        let dispatcher = ResourceDispatcher::new(api.clone(), RequestOptions::default());

        let params = PathParams::from_pairs([("device", "fgt1")]);
        let attrs = desired(desc, json!({"status": "enable", "branch_name": "b1"}));

        let state = dispatcher.create(desc, &params, &attrs).await.unwrap();
        assert_eq!(state.id, "SystemFabricVpn");
        assert_eq!(state.attributes["branch_name"], Value::String("b1".into()));
        assert_eq!(api.calls()[0].0, "update");
        assert_eq!(api.calls()[0].1, "/pm/config/device/fgt1/global/system/fabric-vpn");
    }

    #[tokio::test]
    async fn test_delete_then_read_leaves_empty_id() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("system_snmp_community").unwrap();
        let api = Arc::new(FakeApi::new("id"));
        let dispatcher = ResourceDispatcher::new(api.clone(), RequestOptions::default());
        let params = PathParams::from_pairs([("device", "fgt1")]);

        let attrs = desired(desc, json!({"fosid": 1, "name": "public"}));
        let created = dispatcher.create(desc, &params, &attrs).await.unwrap();
        assert!(created.is_present());

        let deleted = dispatcher.delete(desc, &params, &created.id).await.unwrap();
        assert!(deleted.id.is_empty());

        let read = dispatcher.read(desc, &params, &deleted.id).await.unwrap();
        assert!(read.id.is_empty());

        // a stale id reads as absent too
        let stale = dispatcher.read(desc, &params, &created.id).await.unwrap();
        assert!(!stale.is_present());
    }

    #[tokio::test]
    async fn test_update_sends_touched_fields_only() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("system_snmp_community").unwrap();
        let api = Arc::new(FakeApi::new("id"));
        let dispatcher = ResourceDispatcher::new(api.clone(), RequestOptions::default());
        let params = PathParams::from_pairs([("device", "fgt1")]);

        let attrs = desired(desc, json!({"fosid": 1, "name": "public", "hosts": [{"fosid": 1, "ip": "10.0.0.1"}]}));
        dispatcher.create(desc, &params, &attrs).await.unwrap();

        let changed = desired(desc, json!({"fosid": 1, "name": "private"}));
        let selection = FieldSelection::touched(["name", "hosts"]);
        let state = dispatcher
            .update(desc, &params, "1", &changed, &selection)
            .await
            .unwrap();

        let calls = api.calls();
        let (method, url, payload) = &calls[2];
        assert_eq!(*method, "update");
        assert_eq!(url, "/pm/config/device/fgt1/global/system/snmp/community/1");
        assert_eq!(
            serde_json::Value::Object(payload.clone().unwrap()),
            json!({"name": "private", "hosts": []})
        );
        assert_eq!(state.attributes["hosts"], Value::List(vec![]));
    }

    #[tokio::test]
    async fn test_missing_parameter_makes_no_call() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("report_layout_body_item").unwrap();
        let mut mock = MockConfigApi::new();
        mock.expect_add().never();
        let dispatcher = ResourceDispatcher::new(Arc::new(mock), RequestOptions::default());

        let attrs = desired(desc, json!({"fosid": 1}));
        let err = dispatcher.create(desc, &vdom_params(), &attrs).await.unwrap_err();
        assert!(matches!(
            err,
            FortiSyncError::Resource(ResourceError::MissingParameter { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_failure_is_wrapped() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("switch_controller_location").unwrap();
        let mut mock = MockConfigApi::new();
        mock.expect_add()
            .times(1)
            .returning(|_, _, _| Err(ApiError::network("connection refused").into()));
        let dispatcher = ResourceDispatcher::new(Arc::new(mock), RequestOptions::default());

        let attrs = desired(desc, json!({"name": "hq"}));
        let err = dispatcher.create(desc, &vdom_params(), &attrs).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Error creating switch_controller_location resource:"));
    }

    #[tokio::test]
    async fn test_nil_read_clears_id() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("switch_controller_location").unwrap();
        let mut mock = MockConfigApi::new();
        mock.expect_get()
            .withf(|url, _| url.ends_with("/vdom/root/switch-controller/location/hq"))
            .times(1)
            .returning(|_, _| Ok(None));
        let dispatcher = ResourceDispatcher::new(Arc::new(mock), RequestOptions::default());

        let state = dispatcher.read(desc, &vdom_params(), "hq").await.unwrap();
        assert_eq!(state.id, "");
        assert!(state.attributes.is_empty());
    }

    #[tokio::test]
    async fn test_empty_id_read_makes_no_call() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("switch_controller_location").unwrap();
        let mut mock = MockConfigApi::new();
        mock.expect_get().never();
        let dispatcher = ResourceDispatcher::new(Arc::new(mock), RequestOptions::default());

        let state = dispatcher.read(desc, &vdom_params(), "").await.unwrap();
        assert!(!state.is_present());
    }
}
