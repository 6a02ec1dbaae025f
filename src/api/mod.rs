//! HTTP Collaborator Bindings
//!
//! A thin request wrapper plus endpoint bindings organized by domain.

mod client;
mod error;
mod response;

mod auth;
mod collaboration;
mod goals;
mod guilds;
mod quests;
mod subscriptions;
mod templates;

pub use client::{ApiClient, RequestOptions, API_KEY_HEADER};
pub use error::{classify_form_error, ApiError, ApiResult, FormErrorTarget};
pub use response::{decode_response, Payload};
