//! Field selection for partial writes.

use std::collections::BTreeSet;

use crate::schema::{Attributes, FieldDescriptor, Value};

/// Which top-level fields an expand emits.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldSelection {
    /// Every field present in the attributes.
    #[default]
    All,
    /// Present fields whose value differs from the declared default (create).
    NonDefault,
    /// Only the named fields (update). A touched field missing from the
    /// attributes is cleared when it is a list or table.
    Touched(BTreeSet<String>),
}

impl FieldSelection {
    /// Builds a touched selection from field names.
    #[must_use]
    pub fn touched<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Touched(names.into_iter().map(Into::into).collect())
    }

    /// Returns true if a present field should be emitted.
    #[must_use]
    pub fn includes(&self, field: &FieldDescriptor, value: &Value) -> bool {
        match self {
            Self::All => true,
            Self::NonDefault => field
                .default
                .as_ref()
                .is_none_or(|default| !Value::from_json(default).is_satisfied_by(value)),
            Self::Touched(names) => names.contains(&field.name),
        }
    }

    /// Returns true if an absent field should be emitted as an explicit clear.
    #[must_use]
    pub fn clears(&self, field: &FieldDescriptor) -> bool {
        match self {
            Self::Touched(names) => names.contains(&field.name) && field.is_clearable(),
            Self::All | Self::NonDefault => false,
        }
    }

    /// Returns true if nothing would be emitted for an update.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Touched(names) if names.is_empty())
    }
}

/// Top-level fields whose configured value changed since the last apply.
///
/// Added, changed and removed fields all count.
#[must_use]
pub fn touched_fields(
    fields: &[FieldDescriptor],
    desired: &Attributes,
    last_applied: &Attributes,
) -> BTreeSet<String> {
    fields
        .iter()
        .filter(|field| desired.get(&field.name) != last_applied.get(&field.name))
        .map(|field| field.name.clone())
        .collect()
}

/// Top-level desired fields the observed object does not satisfy.
#[must_use]
pub fn drifted_fields(
    fields: &[FieldDescriptor],
    desired: &Attributes,
    observed: &Attributes,
) -> BTreeSet<String> {
    fields
        .iter()
        .filter(|field| match (desired.get(&field.name), observed.get(&field.name)) {
            (Some(want), Some(have)) => !want.is_satisfied_by(have),
            (Some(want), None) => !want.is_empty(),
            (None, _) => false,
        })
        .map(|field| field.name.clone())
        .collect()
}
