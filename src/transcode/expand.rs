//! Expand: local attributes to FortiManager request payloads.

use crate::schema::{Attributes, FieldDescriptor, FieldKind, Value};

use super::selection::FieldSelection;

type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Builds a request payload from local attributes.
///
/// Keys use wire names. Nested blocks and table entries always carry every
/// present sub-field; the selection only applies at the top level. An empty
/// table is sent as `[]`, an empty block is left out.
#[must_use]
pub fn expand_object(
    fields: &[FieldDescriptor],
    attributes: &Attributes,
    selection: &FieldSelection,
) -> JsonMap {
    let mut payload = JsonMap::new();

    for field in fields {
        match attributes.get(&field.name) {
            Some(value) if selection.includes(field, value) => {
                if let Some(json) = expand_value(field, value) {
                    payload.insert(field.wire_name().into_owned(), json);
                }
            }
            Some(_) => {}
            None if selection.clears(field) => {
                payload.insert(field.wire_name().into_owned(), serde_json::Value::Array(Vec::new()));
            }
            None => {}
        }
    }

    payload
}

/// Expands one local value. Returns `None` when nothing should be sent.
#[must_use]
pub fn expand_value(field: &FieldDescriptor, value: &Value) -> Option<serde_json::Value> {
    match &field.kind {
        FieldKind::Scalar => Some(value.to_json()),
        FieldKind::List { .. } => Some(match value {
            Value::List(_) | Value::Set(_) => value.to_json(),
            Value::Null => serde_json::Value::Array(Vec::new()),
            scalar => serde_json::Value::Array(vec![scalar.to_json()]),
        }),
        FieldKind::Block { fields } => match value {
            Value::List(items) => items.first().and_then(|entry| expand_entry(fields, entry)),
            Value::Object(_) => expand_entry(fields, value),
            _ => None,
        },
        FieldKind::Table { fields } => match value {
            Value::List(items) => Some(serde_json::Value::Array(
                items.iter().filter_map(|entry| expand_entry(fields, entry)).collect(),
            )),
            _ => Some(serde_json::Value::Array(Vec::new())),
        },
    }
}

fn expand_entry(fields: &[FieldDescriptor], entry: &Value) -> Option<serde_json::Value> {
    match entry {
        Value::Object(attributes) => Some(serde_json::Value::Object(expand_object(
            fields,
            attributes,
            &FieldSelection::All,
        ))),
        _ => None,
    }
}
