//! Form Validation
//!
//! Per-field schemas, a debounced validator that owns per-field state, and
//! remote availability probes for uniqueness checks.

mod availability;
mod messages;
mod schema;
mod validator;

pub use availability::{
    Availability, AvailabilityCheck, AvailabilityProbe, EmailAvailability, NicknameAvailability,
};
pub use messages::{Language, ValidationMessages};
pub use schema::{FieldSchema, SchemaRegistry, EMAIL_PATTERN, NICKNAME_PATTERN};
pub use validator::{
    FieldValidationState, FieldValidator, UnregisteredPolicy, ValidatorConfig,
    DEFAULT_DEBOUNCE_MS,
};
