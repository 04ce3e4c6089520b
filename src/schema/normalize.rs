//! Conversion of untyped JSON into typed local attributes.
//!
//! Configuration files and the state file carry plain JSON keyed by local
//! names. Normalizing walks that JSON against the field descriptors and
//! produces [`Attributes`], rejecting shapes the schema does not allow.
//! Keys may also be given in wire form, either hyphenated (`end-port`) or
//! as an explicit wire name (`id` for `fosid`).

use std::collections::BTreeSet;

use crate::error::SchemaError;

use super::case;
use super::field::{find_field, FieldDescriptor, FieldKind, ListOrder};
use super::value::{Attributes, Value};

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Normalizes a JSON object against a list of field descriptors.
///
/// `null` values are treated as absent.
///
/// # Errors
///
/// Returns an error on unknown fields or values of the wrong shape.
pub fn normalize_object(
    fields: &[FieldDescriptor],
    raw: &JsonMap,
    path: &str,
) -> Result<Attributes, SchemaError> {
    let mut attributes = Attributes::new();

    for (key, value) in raw {
        let local = case::to_local(key);
        let field = find_field(fields, &local)
            .or_else(|| fields.iter().find(|f| f.wire_name() == key.as_str()))
            .ok_or_else(|| SchemaError::UnknownField { path: join_path(path, &local) })?;
        let field_path = join_path(path, &field.name);

        if value.is_null() {
            continue;
        }

        attributes.insert(field.name.clone(), normalize_value(field, value, &field_path)?);
    }

    Ok(attributes)
}

/// Normalizes a single value against its descriptor.
///
/// # Errors
///
/// Returns an error if the value has the wrong shape.
pub fn normalize_value(
    field: &FieldDescriptor,
    value: &serde_json::Value,
    path: &str,
) -> Result<Value, SchemaError> {
    match &field.kind {
        FieldKind::Scalar => match value {
            serde_json::Value::Bool(_)
            | serde_json::Value::Number(_)
            | serde_json::Value::String(_) => Ok(Value::from_json(value)),
            other => Err(SchemaError::mismatch(path, "scalar", json_kind(other))),
        },
        FieldKind::List { order } => {
            let items = string_items(value, path)?;
            Ok(match order {
                ListOrder::Ordered => Value::List(items.into_iter().map(Value::String).collect()),
                ListOrder::Set => Value::Set(items.into_iter().collect::<BTreeSet<_>>()),
            })
        }
        FieldKind::Block { fields } => {
            let entries: Vec<&serde_json::Value> = match value {
                serde_json::Value::Object(_) => vec![value],
                serde_json::Value::Array(items) => items.iter().collect(),
                other => return Err(SchemaError::mismatch(path, "object", json_kind(other))),
            };
            if entries.len() > 1 {
                return Err(SchemaError::BlockCardinality {
                    path: path.to_string(),
                    count: entries.len(),
                });
            }
            entries
                .into_iter()
                .map(|entry| normalize_entry(fields, entry, path))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        FieldKind::Table { fields } => match value {
            serde_json::Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, entry)| normalize_entry(fields, entry, &format!("{path}[{i}]")))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            other => Err(SchemaError::mismatch(path, "list of objects", json_kind(other))),
        },
    }
}

/// Checks that every required field is present, recursing into blocks and
/// tables.
///
/// # Errors
///
/// Returns the first missing required field.
pub fn check_required(
    fields: &[FieldDescriptor],
    attributes: &Attributes,
    path: &str,
) -> Result<(), SchemaError> {
    for field in fields {
        let field_path = join_path(path, &field.name);
        match attributes.get(&field.name) {
            None if field.required && field.default.is_none() => {
                return Err(SchemaError::MissingRequired { path: field_path });
            }
            Some(Value::List(entries)) => {
                if let Some(nested) = field.nested_fields() {
                    for (i, entry) in entries.iter().enumerate() {
                        if let Value::Object(map) = entry {
                            check_required(nested, map, &format!("{field_path}[{i}]"))?;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn normalize_entry(
    fields: &[FieldDescriptor],
    entry: &serde_json::Value,
    path: &str,
) -> Result<Value, SchemaError> {
    match entry {
        serde_json::Value::Object(map) => normalize_object(fields, map, path).map(Value::Object),
        other => Err(SchemaError::mismatch(path, "object", json_kind(other))),
    }
}

fn string_items(value: &serde_json::Value, path: &str) -> Result<Vec<String>, SchemaError> {
    match value {
        serde_json::Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                scalar_to_string(item)
                    .ok_or_else(|| SchemaError::mismatch(&format!("{path}[{i}]"), "string", json_kind(item)))
            })
            .collect(),
        other => scalar_to_string(other)
            .map(|s| vec![s])
            .ok_or_else(|| SchemaError::mismatch(path, "list of strings", json_kind(other))),
    }
}

/// Renders a JSON scalar as a string.
#[must_use]
pub fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}

/// Short shape name of a JSON value.
#[must_use]
pub const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "object",
    }
}

/// Joins a parent path and a field name with a dot.
#[must_use]
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
