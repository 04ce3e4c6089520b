//! Flatten: FortiManager wire objects to local attributes.
//!
//! One recursive walk over the field descriptors replaces the per-field
//! conversion functions. Wire keys that no descriptor names are ignored.

use tracing::trace;

use crate::error::SchemaError;
use crate::schema::{
    join_path, json_kind, scalar_to_string, Attributes, FieldDescriptor, FieldKind, ListOrder, Value,
};

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Flattens an API response object.
///
/// Absent fields take their declared default, or stay unset. A `null`
/// table flattens to an empty list.
///
/// # Errors
///
/// Returns an error if a block or table entry is not an object.
pub fn flatten_object(fields: &[FieldDescriptor], wire: &JsonMap) -> Result<Attributes, SchemaError> {
    flatten_fields(fields, wire, "")
}

fn flatten_fields(
    fields: &[FieldDescriptor],
    wire: &JsonMap,
    path: &str,
) -> Result<Attributes, SchemaError> {
    let mut attributes = Attributes::new();

    for field in fields {
        let field_path = join_path(path, &field.name);
        match wire.get(field.wire_name().as_ref()) {
            Some(value) if !value.is_null() => {
                attributes.insert(field.name.clone(), flatten_value(field, value, &field_path)?);
            }
            Some(_) if matches!(field.kind, FieldKind::Table { .. }) => {
                attributes.insert(field.name.clone(), Value::List(Vec::new()));
            }
            _ => {
                if let Some(default) = &field.default {
                    trace!("{field_path}: absent, using default {default}");
                    attributes.insert(field.name.clone(), Value::from_json(default));
                }
            }
        }
    }

    Ok(attributes)
}

/// Flattens a single wire value against its descriptor.
///
/// # Errors
///
/// Returns an error if a block or table entry is not an object.
pub fn flatten_value(
    field: &FieldDescriptor,
    wire: &serde_json::Value,
    path: &str,
) -> Result<Value, SchemaError> {
    match &field.kind {
        FieldKind::Scalar => Ok(Value::from_json(wire)),
        FieldKind::List { order } => {
            let items: Vec<String> = match wire {
                serde_json::Value::Array(items) => items.iter().filter_map(scalar_to_string).collect(),
                other => scalar_to_string(other).into_iter().collect(),
            };
            Ok(match order {
                ListOrder::Ordered => Value::List(items.into_iter().map(Value::String).collect()),
                ListOrder::Set => Value::Set(items.into_iter().collect()),
            })
        }
        FieldKind::Block { fields } => match wire {
            serde_json::Value::Object(map) => {
                Ok(Value::List(vec![Value::Object(flatten_fields(fields, map, path)?)]))
            }
            serde_json::Value::Array(items) if items.len() <= 1 => items
                .first()
                .map(|entry| flatten_entry(fields, entry, path))
                .transpose()
                .map(|entry| Value::List(entry.into_iter().collect())),
            other => Err(SchemaError::mismatch(path, "object", json_kind(other))),
        },
        FieldKind::Table { fields } => match wire {
            serde_json::Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, entry)| flatten_entry(fields, entry, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            serde_json::Value::Object(_) => flatten_entry(fields, wire, &format!("{path}[0]"))
                .map(|entry| Value::List(vec![entry])),
            other => Err(SchemaError::mismatch(path, "list of objects", json_kind(other))),
        },
    }
}

fn flatten_entry(
    fields: &[FieldDescriptor],
    entry: &serde_json::Value,
    path: &str,
) -> Result<Value, SchemaError> {
    match entry {
        serde_json::Value::Object(map) => flatten_fields(fields, map, path).map(Value::Object),
        other => Err(SchemaError::mismatch(path, "object", json_kind(other))),
    }
}
