//! Configuration specification types for fortisync.
//!
//! This module defines all the structs that map to the `fortisync.yaml` file.
//! The file declares the FortiManager endpoint, parameter defaults and the
//! desired configuration objects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::resource::ParamMap;

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfig {
    /// FortiManager endpoint configuration.
    pub provider: ProviderConfig,
    /// Path parameter defaults shared by all resources.
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// State backend configuration.
    #[serde(default)]
    pub state: StateConfig,
    /// Extra resource descriptor files.
    #[serde(default)]
    pub schemas: Vec<PathBuf>,
    /// Desired configuration objects.
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

/// FortiManager endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL (e.g., `https://fmg.example.com`).
    pub url: String,
    /// Skip TLS certificate verification.
    #[serde(default)]
    pub insecure: bool,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts per call for transport failures.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Path parameter defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DefaultsConfig {
    /// Managed device name.
    #[serde(default)]
    pub device: Option<String>,
    /// Virtual domain.
    #[serde(default)]
    pub vdom: Option<String>,
    /// Administrative domain.
    #[serde(default)]
    pub adom: Option<String>,
}

/// State backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateConfig {
    /// Local state file path.
    #[serde(default = "default_state_path")]
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

/// Configuration of one managed object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceConfig {
    /// Unique name of this resource within the configuration.
    pub name: String,
    /// Resource type (a descriptor name such as `system_snmp_community`).
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Device override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// VDOM override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vdom: Option<String>,
    /// ADOM override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adom: Option<String>,
    /// Parent path parameters (e.g., `layout: weekly`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parents: BTreeMap<String, String>,
    /// Fallback parameters as `key=value` strings.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub import_options: Vec<String>,
    /// Desired field values, keyed by local field name.
    #[serde(default)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl DefaultsConfig {
    /// Returns the set defaults as a parameter map.
    #[must_use]
    pub fn params(&self) -> ParamMap {
        scope_params(self.device.as_ref(), self.vdom.as_ref(), self.adom.as_ref())
    }
}

impl ResourceConfig {
    /// Returns the explicitly configured path parameters.
    #[must_use]
    pub fn explicit_params(&self) -> ParamMap {
        let mut params = scope_params(self.device.as_ref(), self.vdom.as_ref(), self.adom.as_ref());
        params.extend(self.parents.iter().map(|(k, v)| (k.clone(), v.clone())));
        params
    }
}

fn scope_params(
    device: Option<&String>,
    vdom: Option<&String>,
    adom: Option<&String>,
) -> ParamMap {
    [("device", device), ("vdom", vdom), ("adom", adom)]
        .into_iter()
        .filter_map(|(k, v)| v.map(|v| (k.to_string(), v.clone())))
        .collect()
}

const fn default_timeout_secs() -> u64 {
    crate::client::DEFAULT_TIMEOUT_SECS
}

const fn default_max_attempts() -> u32 {
    1
}

fn default_state_path() -> PathBuf {
    PathBuf::from(".fortisync/state.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_params_merge_parents() {
        let yaml = r"
name: weekly-title
type: report_layout_body_item
vdom: dmz
parents:
  layout: weekly
attributes:
  fosid: 1
  title: Weekly report
";
        let resource: ResourceConfig = serde_yaml::from_str(yaml).unwrap();
        let params = resource.explicit_params();
        assert_eq!(params.get("vdom").map(String::as_str), Some("dmz"));
        assert_eq!(params.get("layout").map(String::as_str), Some("weekly"));
        assert!(!params.contains_key("device"));
        assert_eq!(resource.attributes["fosid"], serde_json::json!(1));
    }

    #[test]
    fn test_defaults() {
        let yaml = "provider:\n  url: https://fmg.example.com\n";
        let config: SyncConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider.max_attempts, 1);
        assert_eq!(config.provider.timeout_secs, 60);
        assert_eq!(config.state.path, PathBuf::from(".fortisync/state.json"));
        assert!(config.resources.is_empty());
        assert!(config.defaults.params().is_empty());
    }
}
