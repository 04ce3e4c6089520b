//! Configuration validation.
//!
//! This module checks a configuration against the schema registry before
//! anything is sent to FortiManager: resource types must be known, attribute
//! values must match their descriptors and every path parameter must resolve.

use crate::error::{ConfigError, FortiSyncError, Result};
use crate::resource::{resolve_params, ParamMap};
use crate::schema::{check_required, normalize_object, SchemaRegistry};
use std::collections::HashSet;
use tracing::debug;

use super::spec::{ProviderConfig, ResourceConfig, SyncConfig};

/// Validator for sync configurations.
#[derive(Debug)]
pub struct ConfigValidator<'a> {
    /// Registry used to look up resource types.
    registry: &'a SchemaRegistry,
}

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ValidationResult {
    fn error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }
}

impl<'a> ConfigValidator<'a> {
    /// Creates a validator backed by the given registry.
    #[must_use]
    pub const fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error found. Use [`Self::check`] to get all of them.
    pub fn validate(&self, config: &SyncConfig) -> Result<ValidationResult> {
        let result = self.check(config);

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(FortiSyncError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Runs every check and collects all errors and warnings.
    #[must_use]
    pub fn check(&self, config: &SyncConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_provider(&config.provider, &mut result);
        self.validate_resources(config, &mut result);

        result
    }

    /// Validates provider configuration.
    fn validate_provider(provider: &ProviderConfig, result: &mut ValidationResult) {
        if provider.url.is_empty() {
            result.error("provider.url", "FortiManager URL cannot be empty");
        } else if !provider.url.starts_with("https://") && !provider.url.starts_with("http://") {
            result.error(
                "provider.url",
                format!("URL '{}' must start with http:// or https://", provider.url),
            );
        } else if provider.url.starts_with("http://") {
            result
                .warnings
                .push(String::from("FortiManager URL uses plain HTTP"));
        }

        if provider.timeout_secs == 0 {
            result.error("provider.timeout_secs", "Timeout must be greater than zero");
        }

        if provider.max_attempts == 0 {
            result.error("provider.max_attempts", "At least one attempt is required");
        }

        if provider.insecure {
            result
                .warnings
                .push(String::from("TLS certificate verification is disabled"));
        }
    }

    /// Validates all resource configurations.
    fn validate_resources(&self, config: &SyncConfig, result: &mut ValidationResult) {
        if config.resources.is_empty() {
            result
                .warnings
                .push(String::from("No resources defined in configuration"));
            return;
        }

        let defaults = config.defaults.params();
        let mut seen_names = HashSet::new();

        for (i, resource) in config.resources.iter().enumerate() {
            let prefix = format!("resources[{i}]");

            if !seen_names.insert(resource.name.as_str()) {
                result.error(
                    format!("{prefix}.name"),
                    format!("Duplicate resource name: {}", resource.name),
                );
            }

            if !is_valid_name(&resource.name) {
                result.error(
                    format!("{prefix}.name"),
                    format!(
                        "Resource name '{}' is invalid. Must be alphanumeric with hyphens or underscores.",
                        resource.name
                    ),
                );
            }

            self.validate_resource(resource, &prefix, &defaults, result);
        }
    }

    /// Validates one resource against its descriptor.
    fn validate_resource(
        &self,
        resource: &ResourceConfig,
        prefix: &str,
        defaults: &ParamMap,
        result: &mut ValidationResult,
    ) {
        let Some(descriptor) = self.registry.get(&resource.resource_type) else {
            result.error(
                format!("{prefix}.type"),
                ConfigError::UnknownResourceType {
                    name: resource.name.clone(),
                    resource_type: resource.resource_type.clone(),
                }
                .to_string(),
            );
            return;
        };

        let attributes_path = format!("{prefix}.attributes");
        match normalize_object(&descriptor.fields, &resource.attributes, "") {
            Ok(attributes) => {
                if let Err(e) = check_required(&descriptor.fields, &attributes, "") {
                    result.error(attributes_path.clone(), e.to_string());
                }
            }
            Err(e) => result.error(attributes_path.clone(), e.to_string()),
        }

        for parent in resource.parents.keys() {
            if !descriptor.parents.contains(parent) {
                result.error(
                    format!("{prefix}.parents.{parent}"),
                    format!("{} has no parent parameter '{parent}'", descriptor.name),
                );
            }
        }

        if let Err(e) = resolve_params(
            descriptor,
            &resource.explicit_params(),
            &resource.import_options,
            defaults,
        ) {
            result.error(prefix.to_string(), e.to_string());
        }
    }
}

/// Checks if a name is valid: alphanumeric with hyphens or underscores,
/// not starting with a separator.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !name.starts_with(['-', '_'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigParser;

    fn parse(yaml: &str) -> SyncConfig {
        ConfigParser::new().parse_yaml(yaml, None).unwrap()
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("public-community"));
        assert!(is_valid_name("fabric_vpn"));
        assert!(is_valid_name("a1"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("-leading"));
        assert!(!is_valid_name("has space"));
    }

    #[test]
    fn test_init_template_is_valid() {
        let config = parse(include_str!("../../templates/fortisync.yaml"));
        let registry = SchemaRegistry::with_builtins();
        let result = ConfigValidator::new(&registry).check(&config);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(config.resources.len(), 3);
    }

    #[test]
    fn test_valid_config() {
        let config = parse(
            r"
provider:
  url: https://fmg.example.com
defaults:
  device: fgt1
  vdom: root
resources:
  - name: public
    type: system_snmp_community
    attributes:
      fosid: 1
      name: public
",
        );
        let registry = SchemaRegistry::with_builtins();
        let result = ConfigValidator::new(&registry).validate(&config).unwrap();
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_collects_all_errors() {
        let config = parse(
            r"
provider:
  url: fmg.example.com
  max_attempts: 0
resources:
  - name: dup
    type: system_snmp_community
    attributes:
      fosid: 1
      name: public
      bogus: 1
  - name: dup
    type: not_a_type
",
        );
        let registry = SchemaRegistry::with_builtins();
        let result = ConfigValidator::new(&registry).check(&config);
        let fields: Vec<&str> = result.errors.iter().map(|e| e.field.as_str()).collect();

        assert!(fields.contains(&"provider.url"));
        assert!(fields.contains(&"provider.max_attempts"));
        assert!(fields.contains(&"resources[0].attributes"));
        // missing device
        assert!(fields.contains(&"resources[0]"));
        assert!(fields.contains(&"resources[1].name"));
        assert!(fields.contains(&"resources[1].type"));
    }

    #[test]
    fn test_missing_required_field() {
        let config = parse(
            r"
provider:
  url: https://fmg.example.com
defaults:
  device: fgt1
resources:
  - name: public
    type: system_snmp_community
    attributes:
      fosid: 1
",
        );
        let registry = SchemaRegistry::with_builtins();
        let err = ConfigValidator::new(&registry).validate(&config).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn test_unknown_parent() {
        let config = parse(
            r"
provider:
  url: https://fmg.example.com
defaults:
  device: fgt1
  vdom: root
resources:
  - name: loc
    type: switch_controller_location
    parents:
      layout: x
    attributes:
      name: hq
",
        );
        let registry = SchemaRegistry::with_builtins();
        let result = ConfigValidator::new(&registry).check(&config);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "resources[0].parents.layout");
    }
}
