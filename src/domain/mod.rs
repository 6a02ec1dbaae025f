//! Domain Layer
//!
//! Entity abstractions shared by the cache and the optimistic mutation layer.

mod entity;
mod temp_id;

pub use entity::{DomainError, DomainResult, Entity, Patchable};
pub use temp_id::{is_temp_id, new_temp_id, TEMP_ID_PREFIX};
