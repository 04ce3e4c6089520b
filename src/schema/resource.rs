//! Resource descriptors.
//!
//! A [`ResourceDescriptor`] is the schema table of one configuration object
//! type: where it lives in the FortiManager URL space, how it is identified,
//! and which fields it carries.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::SchemaError;

use super::case;
use super::field::{find_field, FieldDescriptor, FieldKind};

/// Descriptor of a resource type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Resource type name (e.g., `system_snmp_community`).
    pub name: String,
    /// API path below the scope root, with `{parent}` placeholders.
    pub path: String,
    /// URL scope of the object.
    #[serde(default)]
    pub scope: Scope,
    /// Parent path parameters, in path order.
    #[serde(default)]
    pub parents: Vec<String>,
    /// How instances are identified.
    pub identity: Identity,
    /// Fields of the object.
    pub fields: Vec<FieldDescriptor>,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// URL scope of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// `/pm/config/device/{device}/vdom/{vdom}/...`
    #[default]
    Vdom,
    /// `/pm/config/device/{device}/global/...`
    Global,
    /// `/pm/config/adom/{adom}/obj/...`
    Adom,
}

/// Identity of resource instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Identity {
    /// A settings object with exactly one instance and a fixed id.
    Singleton {
        /// Synthetic id (e.g., `SystemFabricVpn`).
        id: String,
    },
    /// A table entry identified by a primary key field.
    Key {
        /// Local name of the primary key field.
        field: String,
    },
}

impl ResourceDescriptor {
    /// Creates a new keyed resource descriptor.
    #[must_use]
    pub fn keyed(name: impl Into<String>, path: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            scope: Scope::Vdom,
            parents: Vec::new(),
            identity: Identity::Key { field: key.into() },
            fields: Vec::new(),
            description: None,
        }
    }

    /// Creates a new singleton resource descriptor.
    #[must_use]
    pub fn singleton(name: impl Into<String>, path: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            scope: Scope::Vdom,
            parents: Vec::new(),
            identity: Identity::Singleton { id: id.into() },
            fields: Vec::new(),
            description: None,
        }
    }

    /// Creates a singleton whose id is the CamelCase form of its name.
    /// e.g., `"system_fabric_vpn"` -> id `"SystemFabricVpn"`
    #[must_use]
    pub fn settings(name: impl Into<String>, path: impl Into<String>) -> Self {
        let name: String = name.into();
        let id = case::to_camel_case(&name);
        Self::singleton(name, path, id)
    }

    /// Sets the URL scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Adds a parent path parameter.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Finds a top-level field by local name.
    #[must_use]
    pub fn get_field(&self, name: &str) -> Option<&FieldDescriptor> {
        find_field(&self.fields, name)
    }

    /// Returns the primary key field for keyed resources.
    #[must_use]
    pub fn key_field(&self) -> Option<&FieldDescriptor> {
        match &self.identity {
            Identity::Key { field } => self.get_field(field),
            Identity::Singleton { .. } => None,
        }
    }

    /// Returns true for singleton settings objects.
    #[must_use]
    pub const fn is_singleton(&self) -> bool {
        matches!(self.identity, Identity::Singleton { .. })
    }

    /// Names of the path parameters this resource needs, in resolution order.
    #[must_use]
    pub fn required_params(&self) -> Vec<&str> {
        let mut params = match self.scope {
            Scope::Vdom => vec!["device", "vdom"],
            Scope::Global => vec!["device"],
            Scope::Adom => vec!["adom"],
        };
        params.extend(self.parents.iter().map(String::as_str));
        params
    }

    /// Checks the descriptor for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns an error if the key field is missing or not a scalar, a parent
    /// has no placeholder in the path, or field names repeat.
    pub fn validate(&self) -> Result<(), SchemaError> {
        let invalid = |message: String| SchemaError::InvalidDescriptor {
            resource_type: self.name.clone(),
            message,
        };

        if let Identity::Key { field } = &self.identity {
            match self.get_field(field) {
                Some(f) if f.kind == FieldKind::Scalar => {}
                Some(_) => return Err(invalid(format!("key field '{field}' must be a scalar"))),
                None => return Err(invalid(format!("key field '{field}' is not declared"))),
            }
        }

        for parent in &self.parents {
            if !self.path.contains(&format!("{{{parent}}}")) {
                return Err(invalid(format!("parent '{parent}' has no placeholder in path")));
            }
        }

        check_unique(&self.fields).map_err(|name| invalid(format!("field '{name}' is declared twice")))
    }
}

fn check_unique(fields: &[FieldDescriptor]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(field.name.clone());
        }
        if let Some(nested) = field.nested_fields() {
            check_unique(nested)?;
        }
    }
    Ok(())
}
