//! Domain Layer - Core Entity Trait
//!
//! Every cached record has a string identifier. Server ids are opaque; client
//! placeholders use the `temp-` prefix until the server acknowledges them.

use serde::{Deserialize, Serialize};

/// Core trait for all cached entities
pub trait Entity: Sized + Send + Sync + Clone + 'static {
    /// Returns the entity's identifier
    fn id(&self) -> &str;

    /// Replaces the identifier (used to stamp a temporary id on a draft)
    fn set_id(&mut self, id: String);
}

/// Entities that accept a partial update
pub trait Patchable: Entity {
    type Patch: Clone + Send + Sync;

    /// Shallow-merge the set fields of `patch` into `self`
    fn apply_patch(&mut self, patch: &Self::Patch);
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainError {
    InvalidInput(String),
    Conflict(String),
}

impl std::fmt::Display for DomainError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            DomainError::Conflict(msg) => write!(f, "Conflict: {}", msg),
        }
    }
}

impl std::error::Error for DomainError {}
