//! Transcoding between FortiManager wire objects and local attributes.
//!
//! Both directions are driven by the field descriptors of a resource:
//! - [`flatten_object`] turns an API response into local attributes
//! - [`expand_object`] turns local attributes into a request payload,
//!   restricted by a [`FieldSelection`]

mod expand;
mod flatten;
mod selection;

pub use expand::{expand_object, expand_value};
pub use flatten::{flatten_object, flatten_value};
pub use selection::{drifted_fields, touched_fields, FieldSelection};
