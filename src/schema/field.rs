//! Field descriptors.
//!
//! A [`FieldDescriptor`] describes one attribute of a schema-described
//! object: its local and wire names, its kind, and an optional default.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use super::case;

/// Descriptor of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Local (underscore) name.
    pub name: String,
    /// Explicit wire name, when it does not follow the hyphen rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wire: Option<String>,
    /// Field kind.
    #[serde(flatten)]
    pub kind: FieldKind,
    /// Value used when the API response omits the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Whether configuration must set this field.
    #[serde(default)]
    pub required: bool,
    /// Human readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Kind of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    /// String, number or boolean passthrough.
    Scalar,
    /// List of strings.
    List {
        /// Whether element order is significant.
        #[serde(default)]
        order: ListOrder,
    },
    /// Cardinality-1 nested object.
    Block {
        /// Sub-fields of the block.
        fields: Vec<FieldDescriptor>,
    },
    /// Cardinality-N repeated nested object.
    Table {
        /// Sub-fields of each table entry.
        fields: Vec<FieldDescriptor>,
    },
}

/// Ordering semantics of a string list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListOrder {
    /// Order is preserved.
    #[default]
    Ordered,
    /// Order is irrelevant; duplicates collapse.
    Set,
}

impl FieldDescriptor {
    fn with_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            wire: None,
            kind,
            default: None,
            required: false,
            description: None,
        }
    }

    /// Creates a scalar field.
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::Scalar)
    }

    /// Creates an ordered string list field.
    #[must_use]
    pub fn list(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::List { order: ListOrder::Ordered })
    }

    /// Creates an unordered string set field.
    #[must_use]
    pub fn set(name: impl Into<String>) -> Self {
        Self::with_kind(name, FieldKind::List { order: ListOrder::Set })
    }

    /// Creates a cardinality-1 block field.
    #[must_use]
    pub fn block(name: impl Into<String>, fields: Vec<Self>) -> Self {
        Self::with_kind(name, FieldKind::Block { fields })
    }

    /// Creates a cardinality-N table field.
    #[must_use]
    pub fn table(name: impl Into<String>, fields: Vec<Self>) -> Self {
        Self::with_kind(name, FieldKind::Table { fields })
    }

    /// Overrides the wire name.
    #[must_use]
    pub fn with_wire(mut self, wire: impl Into<String>) -> Self {
        self.wire = Some(wire.into());
        self
    }

    /// Sets the declared default.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the field as required.
    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Returns the name used on the wire.
    #[must_use]
    pub fn wire_name(&self) -> Cow<'_, str> {
        self.wire
            .as_deref()
            .map_or_else(|| Cow::Owned(case::to_wire(&self.name)), Cow::Borrowed)
    }

    /// Returns the nested fields of a block or table.
    #[must_use]
    pub fn nested_fields(&self) -> Option<&[Self]> {
        match &self.kind {
            FieldKind::Block { fields } | FieldKind::Table { fields } => Some(fields),
            FieldKind::Scalar | FieldKind::List { .. } => None,
        }
    }

    /// Returns true for list and table fields, which are cleared with `[]`.
    #[must_use]
    pub const fn is_clearable(&self) -> bool {
        matches!(self.kind, FieldKind::List { .. } | FieldKind::Table { .. })
    }

    /// Short kind name used in output.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match &self.kind {
            FieldKind::Scalar => "scalar",
            FieldKind::List { order: ListOrder::Ordered } => "list",
            FieldKind::List { order: ListOrder::Set } => "set",
            FieldKind::Block { .. } => "block",
            FieldKind::Table { .. } => "table",
        }
    }
}

/// Finds a field by local name.
#[must_use]
pub fn find_field<'a>(fields: &'a [FieldDescriptor], name: &str) -> Option<&'a FieldDescriptor> {
    fields.iter().find(|f| f.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_name_defaults_to_hyphen_form() {
        assert_eq!(FieldDescriptor::scalar("end_port").wire_name(), "end-port");
        assert_eq!(FieldDescriptor::scalar("fosid").with_wire("id").wire_name(), "id");
    }

    #[test]
    fn test_deserialize_nested_descriptor() {
        let yaml = r"
name: port_range
kind: table
fields:
  - name: fosid
    wire: id
    kind: scalar
  - name: start_port
    kind: scalar
    default: 1
  - name: tags
    kind: list
    order: set
";
        let field: FieldDescriptor = serde_yaml::from_str(yaml).unwrap();
        let nested = field.nested_fields().unwrap();
        assert_eq!(nested.len(), 3);
        assert_eq!(nested[0].wire_name(), "id");
        assert_eq!(nested[1].default, Some(serde_json::json!(1)));
        assert_eq!(nested[2].kind, FieldKind::List { order: ListOrder::Set });
    }
}
