//! Path parameter resolution and object URL construction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

use crate::error::{ResourceError, Result};
use crate::schema::{ResourceDescriptor, Scope};

/// Named parameter values from one source.
pub type ParamMap = BTreeMap<String, String>;

/// Resolved path parameters of one resource instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathParams {
    values: ParamMap,
}

impl PathParams {
    /// Creates path parameters from name/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// Gets a parameter value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Iterates over parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn require(&self, descriptor: &ResourceDescriptor, name: &str) -> Result<String> {
        self.get(name).map(escape_segment).ok_or_else(|| {
            ResourceError::MissingParameter {
                resource_type: descriptor.name.clone(),
                parameter: name.to_string(),
            }
            .into()
        })
    }
}

/// Parses `key=value` import options.
///
/// # Errors
///
/// Returns an error for options without `=` or with an empty key.
pub fn parse_import_options(options: &[String]) -> Result<ParamMap> {
    options
        .iter()
        .map(|option| match option.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                Ok((key.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(ResourceError::InvalidImportOption {
                option: option.clone(),
            }
            .into()),
        })
        .collect()
}

/// Resolves every parameter the descriptor needs.
///
/// Each parameter is taken from the explicit values first, then the import
/// options, then the defaults. Empty strings count as unset.
///
/// # Errors
///
/// Returns an error if an import option is malformed or a parameter is not
/// set anywhere.
pub fn resolve_params(
    descriptor: &ResourceDescriptor,
    explicit: &ParamMap,
    import_options: &[String],
    defaults: &ParamMap,
) -> Result<PathParams> {
    let imported = parse_import_options(import_options)?;
    let mut values = ParamMap::new();

    for name in descriptor.required_params() {
        let value = [explicit, &imported, defaults]
            .into_iter()
            .find_map(|source| source.get(name).filter(|v| !v.is_empty()))
            .ok_or_else(|| ResourceError::MissingParameter {
                resource_type: descriptor.name.clone(),
                parameter: name.to_string(),
            })?;
        trace!("{}: {name} = {value}", descriptor.name);
        values.insert(name.to_string(), value.clone());
    }

    Ok(PathParams { values })
}

/// Builds the collection URL of a resource (the object URL of a singleton).
///
/// # Errors
///
/// Returns an error if a needed parameter is missing.
pub fn collection_url(descriptor: &ResourceDescriptor, params: &PathParams) -> Result<String> {
    let root = match descriptor.scope {
        Scope::Vdom => format!(
            "/pm/config/device/{}/vdom/{}",
            params.require(descriptor, "device")?,
            params.require(descriptor, "vdom")?
        ),
        Scope::Global => format!(
            "/pm/config/device/{}/global",
            params.require(descriptor, "device")?
        ),
        Scope::Adom => format!("/pm/config/adom/{}/obj", params.require(descriptor, "adom")?),
    };

    let mut path = descriptor.path.trim_matches('/').to_string();
    for parent in &descriptor.parents {
        path = path.replace(&format!("{{{parent}}}"), &params.require(descriptor, parent)?);
    }

    Ok(format!("{root}/{path}"))
}

/// Builds the URL of one object. Singletons live at their collection URL.
///
/// # Errors
///
/// Returns an error if a needed parameter is missing.
pub fn object_url(descriptor: &ResourceDescriptor, params: &PathParams, id: &str) -> Result<String> {
    let collection = collection_url(descriptor, params)?;
    if descriptor.is_singleton() {
        Ok(collection)
    } else {
        Ok(format!("{collection}/{}", escape_segment(id)))
    }
}

/// Escapes `/` inside a URL segment the way FortiManager expects.
fn escape_segment(segment: &str) -> String {
    segment.replace('/', "\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FortiSyncError;
    use crate::schema::SchemaRegistry;

    fn map(pairs: &[(&str, &str)]) -> ParamMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_resolution_order() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("report_layout_body_item").unwrap();

        let params = resolve_params(
            desc,
            &map(&[("vdom", "dmz")]),
            &["layout=weekly".to_string(), "vdom=ignored".to_string()],
            &map(&[("device", "fgt1"), ("vdom", "root"), ("layout", "default")]),
        )
        .unwrap();

        assert_eq!(params.get("device"), Some("fgt1"));
        assert_eq!(params.get("vdom"), Some("dmz"));
        assert_eq!(params.get("layout"), Some("weekly"));
        assert_eq!(
            object_url(desc, &params, "3").unwrap(),
            "/pm/config/device/fgt1/vdom/dmz/report/layout/weekly/body-item/3"
        );
    }

    #[test]
    fn test_missing_parent_fails() {
        let registry = SchemaRegistry::with_builtins();
        let desc = registry.get("report_layout_body_item").unwrap();

        let err = resolve_params(desc, &map(&[("device", "fgt1"), ("vdom", "root")]), &[], &ParamMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            FortiSyncError::Resource(ResourceError::MissingParameter { ref parameter, .. })
                if parameter == "layout"
        ));
        assert!(err.to_string().starts_with("Error resolving layout for report_layout_body_item"));
    }

    #[test]
    fn test_malformed_import_option() {
        assert!(parse_import_options(&["layout".to_string()]).is_err());
        assert!(parse_import_options(&["=x".to_string()]).is_err());
        assert_eq!(
            parse_import_options(&[" device = fgt1 ".to_string()]).unwrap(),
            map(&[("device", "fgt1")])
        );
    }

    #[test]
    fn test_scope_roots() {
        let registry = SchemaRegistry::with_builtins();
        let params = PathParams::from_pairs([("device", "fgt1"), ("adom", "root")]);

        let global = registry.get("system_fabric_vpn").unwrap();
        assert_eq!(
            object_url(global, &params, "SystemFabricVpn").unwrap(),
            "/pm/config/device/fgt1/global/system/fabric-vpn"
        );

        let adom = registry.get("firewall_address").unwrap();
        assert_eq!(
            object_url(adom, &params, "lan/24").unwrap(),
            "/pm/config/adom/root/obj/firewall/address/lan\\/24"
        );
    }
}
