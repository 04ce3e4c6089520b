//! Schema module for fortisync.
//!
//! This module holds the declarative description of configuration objects:
//! - Field and resource descriptors
//! - The local value model
//! - Normalization of untyped JSON against a descriptor
//! - The built-in descriptor table and the registry

mod builtin;
mod case;
mod field;
mod normalize;
mod registry;
mod resource;
mod value;

pub use case::{to_camel_case, to_local, to_wire};
pub use field::{find_field, FieldDescriptor, FieldKind, ListOrder};
pub use normalize::{check_required, join_path, json_kind, normalize_object, normalize_value, scalar_to_string};
pub use registry::SchemaRegistry;
pub use resource::{Identity, ResourceDescriptor, Scope};
pub use value::{attributes_to_json, Attributes, Value};
