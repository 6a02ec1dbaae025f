//! Questline Client Core
//!
//! Layered architecture:
//! - domain: Entity trait, temporary ids, domain errors
//! - models: wire models for the HTTP collaborator
//! - api: request wrapper and per-resource endpoint bindings
//! - cache / mutation: query cache with optimistic create, update and delete
//! - validation: schema registry, debounced field validator, availability probes
//! - progress: pure quest progress calculation
//! - polling / carousel: background timers built on `tasks`
//! - app: wires the above into one state object for a UI shell

use std::path::PathBuf;

pub mod api;
pub mod app;
pub mod cache;
pub mod carousel;
pub mod config;
pub mod domain;
pub mod models;
pub mod mutation;
pub mod polling;
pub mod progress;
pub mod storage;
pub mod tasks;
pub mod validation;

pub use api::{ApiClient, ApiError, ApiResult};
pub use app::AppState;
pub use cache::{QueryCache, QueryKey};
pub use config::{ApiConfig, ClientConfig};
pub use mutation::{MutationState, OptimisticCollection};
pub use progress::{calculate_progress, ProgressInput, ProgressStatus, QuestProgress};
pub use storage::LocalStore;
pub use validation::{FieldValidator, SchemaRegistry};

/// Install the rolling file logger for the process.
pub fn init_logging(log_dir: impl Into<PathBuf>, app_name: &str) -> Result<(), rolling_logger::LoggerError> {
    rolling_logger::init_logger(log_dir, app_name)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "questline logging initialized");
    Ok(())
}
