//! Configuration hashing for change detection.
//!
//! This module provides deterministic hashing of resource configurations
//! to detect changes between runs and enable idempotent operations.

use sha2::{Digest, Sha256};

use super::spec::{ResourceConfig, SyncConfig};

/// Hasher for computing configuration hashes.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of all resources in the configuration.
    ///
    /// Resource order does not matter.
    #[must_use]
    pub fn hash_config(&self, config: &SyncConfig) -> String {
        let mut hashes: Vec<(&str, String)> = config
            .resources
            .iter()
            .map(|r| (r.name.as_str(), self.hash_resource(r)))
            .collect();
        hashes.sort_unstable();

        let mut hasher = Sha256::new();
        for (name, hash) in hashes {
            hasher.update(name.as_bytes());
            hasher.update(hash.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single resource configuration.
    ///
    /// Covers the type, path parameters and attributes. JSON object keys
    /// serialize sorted, so key order in the file does not matter.
    #[must_use]
    pub fn hash_resource(&self, resource: &ResourceConfig) -> String {
        let mut hasher = Sha256::new();

        hasher.update(resource.resource_type.as_bytes());
        for (key, value) in resource.explicit_params() {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        for option in &resource.import_options {
            hasher.update(option.as_bytes());
        }

        let attributes = serde_json::Value::Object(resource.attributes.clone());
        hasher.update(attributes.to_string().as_bytes());

        hex::encode(hasher.finalize())
    }

    /// Returns a short form of a hash for display.
    #[must_use]
    pub fn short_hash(hash: &str) -> &str {
        hash.get(..12).unwrap_or(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(yaml: &str) -> ResourceConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_hash_is_deterministic_and_order_independent() {
        let a = resource("name: a\ntype: t\nattributes:\n  x: 1\n  y: [1, 2]\n");
        let b = resource("name: a\ntype: t\nattributes:\n  y: [1, 2]\n  x: 1\n");
        let hasher = ConfigHasher::new();
        assert_eq!(hasher.hash_resource(&a), hasher.hash_resource(&b));
        assert_eq!(hasher.hash_resource(&a).len(), 64);
    }

    #[test]
    fn test_hash_changes_with_attributes_and_params() {
        let hasher = ConfigHasher::new();
        let base = resource("name: a\ntype: t\nattributes:\n  x: 1\n");
        let changed = resource("name: a\ntype: t\nattributes:\n  x: 2\n");
        let moved = resource("name: a\ntype: t\nvdom: dmz\nattributes:\n  x: 1\n");

        let h = hasher.hash_resource(&base);
        assert_ne!(h, hasher.hash_resource(&changed));
        assert_ne!(h, hasher.hash_resource(&moved));
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(ConfigHasher::short_hash("0123456789abcdef"), "0123456789ab");
        assert_eq!(ConfigHasher::short_hash("abc"), "abc");
    }
}
