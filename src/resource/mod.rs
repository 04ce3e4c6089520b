//! Resource lifecycle.
//!
//! This module provides:
//! - Path parameter resolution and URL construction
//! - The CRUD dispatcher and per-instance lifecycle state

mod dispatcher;
mod path;

pub use dispatcher::{resource_id, ResourceDispatcher, ResourceState};
pub use path::{collection_url, object_url, parse_import_options, resolve_params, ParamMap, PathParams};
