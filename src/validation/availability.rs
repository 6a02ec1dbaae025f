//! Remote availability checks (email / nickname uniqueness).
//!
//! The result is advisory: the server re-checks uniqueness on submit, so a
//! failed probe leaves the field usable with an `Unknown` signal.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::messages::ValidationMessages;
use crate::api::{ApiClient, ApiResult};

/// Outcome of the remote check for one field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Availability {
    /// No remote check configured, or local rules failed first
    #[default]
    NotChecked,
    Checking,
    Available,
    Taken,
    /// The probe failed; submission may proceed
    Unknown,
}

#[async_trait]
pub trait AvailabilityProbe: Send + Sync {
    /// `Ok(true)` when the value is free to use
    async fn is_available(&self, value: &str) -> ApiResult<bool>;
}

/// A probe plus the message shown when the value is taken
#[derive(Clone)]
pub struct AvailabilityCheck {
    probe: Arc<dyn AvailabilityProbe>,
    taken_message: String,
}

impl AvailabilityCheck {
    pub fn new(probe: Arc<dyn AvailabilityProbe>, taken_message: impl Into<String>) -> Self {
        Self {
            probe,
            taken_message: taken_message.into(),
        }
    }

    pub fn email(client: ApiClient, messages: &ValidationMessages) -> Self {
        Self::new(Arc::new(EmailAvailability::new(client)), messages.email_taken)
    }

    pub fn nickname(client: ApiClient, messages: &ValidationMessages) -> Self {
        Self::new(
            Arc::new(NicknameAvailability::new(client)),
            messages.nickname_taken,
        )
    }

    pub fn probe(&self) -> Arc<dyn AvailabilityProbe> {
        self.probe.clone()
    }

    pub fn taken_message(&self) -> &str {
        &self.taken_message
    }
}

impl fmt::Debug for AvailabilityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailabilityCheck")
            .field("taken_message", &self.taken_message)
            .finish_non_exhaustive()
    }
}

pub struct EmailAvailability {
    client: ApiClient,
}

impl EmailAvailability {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AvailabilityProbe for EmailAvailability {
    async fn is_available(&self, value: &str) -> ApiResult<bool> {
        self.client.is_email_available(value.trim()).await
    }
}

pub struct NicknameAvailability {
    client: ApiClient,
}

impl NicknameAvailability {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AvailabilityProbe for NicknameAvailability {
    async fn is_available(&self, value: &str) -> ApiResult<bool> {
        self.client.is_nickname_available(value.trim()).await
    }
}
