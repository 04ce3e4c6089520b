//! Registry of resource descriptors.
//!
//! The registry starts from the built-in descriptor table and can be
//! extended with descriptor files (YAML, one descriptor or a list).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::error::SchemaError;

use super::builtin;
use super::resource::ResourceDescriptor;

/// Registry of known resource types.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    /// Descriptors by resource type name.
    descriptors: BTreeMap<String, ResourceDescriptor>,
}

/// Contents of a descriptor file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DescriptorFile {
    Many(Vec<ResourceDescriptor>),
    One(Box<ResourceDescriptor>),
}

impl SchemaRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            descriptors: BTreeMap::new(),
        }
    }

    /// Creates a registry holding the built-in descriptors.
    #[must_use]
    pub fn with_builtins() -> Self {
        let descriptors = builtin::descriptors()
            .into_iter()
            .map(|d| (d.name.clone(), d))
            .collect();
        Self { descriptors }
    }

    /// Registers a descriptor, replacing any existing one with the same name.
    ///
    /// # Errors
    ///
    /// Returns an error if the descriptor is inconsistent.
    pub fn register(&mut self, descriptor: ResourceDescriptor) -> Result<(), SchemaError> {
        descriptor.validate()?;
        if self.descriptors.contains_key(&descriptor.name) {
            warn!("Replacing resource descriptor: {}", descriptor.name);
        } else {
            debug!("Registering resource descriptor: {}", descriptor.name);
        }
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Loads descriptors from a YAML file.
    ///
    /// Returns the number of descriptors registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or a
    /// descriptor is inconsistent.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, SchemaError> {
        let path = path.as_ref();
        info!("Loading resource descriptors from: {}", path.display());

        let load_failed = |message: String| SchemaError::LoadFailed {
            path: path.display().to_string(),
            message,
        };

        let content = std::fs::read_to_string(path).map_err(|e| load_failed(e.to_string()))?;
        let parsed: DescriptorFile =
            serde_yaml::from_str(&content).map_err(|e| load_failed(e.to_string()))?;

        let descriptors = match parsed {
            DescriptorFile::Many(many) => many,
            DescriptorFile::One(one) => vec![*one],
        };

        let count = descriptors.len();
        for descriptor in descriptors {
            self.register(descriptor)?;
        }
        Ok(count)
    }

    /// Gets a descriptor by resource type name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.descriptors.get(name)
    }

    /// Returns all descriptors, sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = &ResourceDescriptor> {
        self.descriptors.values()
    }

    /// Returns the number of registered descriptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if no descriptors are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
