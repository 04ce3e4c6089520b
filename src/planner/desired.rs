//! Desired resources resolved against the schema registry.

use tracing::debug;

use crate::config::{ConfigHasher, ResourceConfig, SyncConfig};
use crate::error::{ConfigError, Result};
use crate::resource::{resolve_params, resource_id, PathParams};
use crate::schema::{normalize_object, Attributes, ResourceDescriptor, SchemaRegistry};

/// One configured resource, ready to be sent to FortiManager.
#[derive(Debug, Clone)]
pub struct DesiredResource<'a> {
    /// The resource as written in the configuration file.
    pub config: &'a ResourceConfig,
    /// Descriptor of the resource type.
    pub descriptor: &'a ResourceDescriptor,
    /// Normalized desired attributes.
    pub attributes: Attributes,
    /// Resolved path parameters.
    pub params: PathParams,
    /// Object id, when known before creation.
    pub id: Option<String>,
    /// Hash of the resource configuration.
    pub hash: String,
}

impl<'a> DesiredResource<'a> {
    /// Resolves one resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the type is unknown, the attributes do not match
    /// the descriptor or a path parameter cannot be resolved.
    pub fn resolve(
        resource: &'a ResourceConfig,
        config: &SyncConfig,
        registry: &'a SchemaRegistry,
    ) -> Result<Self> {
        let descriptor = registry.get(&resource.resource_type).ok_or_else(|| {
            ConfigError::UnknownResourceType {
                name: resource.name.clone(),
                resource_type: resource.resource_type.clone(),
            }
        })?;

        let attributes = normalize_object(&descriptor.fields, &resource.attributes, "")?;
        let params = resolve_params(
            descriptor,
            &resource.explicit_params(),
            &resource.import_options,
            &config.defaults.params(),
        )?;
        let id = resource_id(descriptor, &attributes)?;

        debug!("Resolved {} ({}) id={:?}", resource.name, descriptor.name, id);

        Ok(Self {
            config: resource,
            descriptor,
            attributes,
            params,
            id,
            hash: ConfigHasher::new().hash_resource(resource),
        })
    }

    /// Resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// Resolves every resource of a configuration, in file order.
///
/// # Errors
///
/// Returns the first resolution error.
pub fn resolve_all<'a>(
    config: &'a SyncConfig,
    registry: &'a SchemaRegistry,
) -> Result<Vec<DesiredResource<'a>>> {
    config
        .resources
        .iter()
        .map(|resource| DesiredResource::resolve(resource, config, registry))
        .collect()
}

/// Finds a resolved resource by name.
#[must_use]
pub fn find_desired<'r, 'a>(
    desired: &'r [DesiredResource<'a>],
    name: &str,
) -> Option<&'r DesiredResource<'a>> {
    desired.iter().find(|d| d.name() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;
    use crate::error::{FortiSyncError, ResourceError};

    fn config(yaml: &str) -> SyncConfig {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    #[test]
    fn test_resolve_keyed_resource() {
        let config = config(
            r"
provider:
  url: https://fmg
defaults:
  device: fgt1
resources:
  - name: public
    type: system_snmp_community
    attributes:
      fosid: 5
      name: public
",
        );
        let registry = SchemaRegistry::with_builtins();
        let desired = resolve_all(&config, &registry).unwrap();

        assert_eq!(desired.len(), 1);
        assert_eq!(desired[0].id.as_deref(), Some("5"));
        assert_eq!(desired[0].params.get("device"), Some("fgt1"));
        assert_eq!(desired[0].hash.len(), 64);
        assert!(find_desired(&desired, "public").is_some());
        assert!(find_desired(&desired, "other").is_none());
    }

    #[test]
    fn test_resolve_singleton_has_fixed_id() {
        let config = config(
            r"
provider:
  url: https://fmg
defaults:
  device: fgt1
resources:
  - name: fabric
    type: system_fabric_vpn
    attributes:
      status: enable
",
        );
        let registry = SchemaRegistry::with_builtins();
        let desired = resolve_all(&config, &registry).unwrap();
        assert_eq!(desired[0].id.as_deref(), Some("SystemFabricVpn"));
    }

    #[test]
    fn test_resolve_missing_parameter() {
        let config = config(
            r"
provider:
  url: https://fmg
resources:
  - name: public
    type: system_snmp_community
    attributes:
      fosid: 5
      name: public
",
        );
        let registry = SchemaRegistry::with_builtins();
        let err = resolve_all(&config, &registry).unwrap_err();
        assert!(matches!(
            err,
            FortiSyncError::Resource(ResourceError::MissingParameter { ref parameter, .. }) if parameter == "device"
        ));
    }
}
