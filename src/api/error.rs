//! API error type and user-facing message mapping.

use crate::config::ConfigError;
use crate::domain::DomainError;
use crate::storage::StorageError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-2xx response; `message` comes from the body's `detail` field
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("network request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to decode response body (HTTP {status}): {source}")]
    Decode {
        status: u16,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("expected a response body but the server returned none")]
    EmptyResponse,

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status for server-reported errors
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } | ApiError::Decode { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// Human-readable text safe to show in the UI
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { status: 403, .. } => {
                "You don't have permission to do that.".to_string()
            }
            ApiError::Http { message, .. } if !message.trim().is_empty() => message.clone(),
            ApiError::Http { status: 404, .. } => "We couldn't find what you were looking for.".to_string(),
            ApiError::Transport(_) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Domain(e) => e.to_string(),
            _ => "Something went wrong. Please try again.".to_string(),
        }
    }
}

/// Where a failed submission should surface its message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormErrorTarget {
    Field { name: String, message: String },
    Form(String),
}

/// Route an error to a field (404 on a lookup field) or the form banner.
pub fn classify_form_error(error: &ApiError, not_found_field: Option<&str>) -> FormErrorTarget {
    match (error.is_not_found(), not_found_field) {
        (true, Some(field)) => FormErrorTarget::Field {
            name: field.to_string(),
            message: error.user_message(),
        },
        _ => FormErrorTarget::Form(error.user_message()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_gets_permission_message() {
        let err = ApiError::http(403, "Forbidden");
        assert!(err.is_forbidden());
        assert_eq!(err.user_message(), "You don't have permission to do that.");
    }

    #[test]
    fn test_detail_message_is_preferred() {
        let err = ApiError::http(404, "User not found");
        assert_eq!(err.to_string(), "User not found");
        assert_eq!(err.user_message(), "User not found");
        assert_eq!(ApiError::http(404, "").user_message(), "We couldn't find what you were looking for.");
    }

    #[test]
    fn test_not_found_routes_to_field() {
        let err = ApiError::http(404, "User not found");
        assert_eq!(
            classify_form_error(&err, Some("invitee")),
            FormErrorTarget::Field {
                name: "invitee".into(),
                message: "User not found".into()
            }
        );
        assert_eq!(
            classify_form_error(&ApiError::http(500, "boom"), Some("invitee")),
            FormErrorTarget::Form("boom".into())
        );
    }
}
