//! Response normalization shared by every request.

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ApiError, ApiResult};

/// Successful response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload<T> {
    Json(T),
    /// 2xx with an empty or non-JSON body
    NoContent,
}

impl<T> Payload<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Payload::Json(value) => Some(value),
            Payload::NoContent => None,
        }
    }

    /// The body, or `EmptyResponse` where one is mandatory
    pub fn into_json(self) -> ApiResult<T> {
        self.into_option().ok_or(ApiError::EmptyResponse)
    }

    pub fn is_no_content(&self) -> bool {
        matches!(self, Payload::NoContent)
    }
}

/// Turn a raw response into a payload or a typed error.
pub fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    content_type: Option<&str>,
    body: &[u8],
) -> ApiResult<Payload<T>> {
    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            message: error_message(status, body),
        });
    }

    let is_empty = body.iter().all(u8::is_ascii_whitespace);
    if is_empty || !is_json(content_type) {
        return Ok(Payload::NoContent);
    }

    serde_json::from_slice(body)
        .map(Payload::Json)
        .map_err(|source| ApiError::Decode {
            status: status.as_u16(),
            source,
        })
}

fn is_json(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Best-effort message from an error body, falling back to the status text.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|value| detail_from(&value))
        .unwrap_or_else(|| status_text(status))
}

fn detail_from(value: &Value) -> Option<String> {
    match value.get("detail") {
        Some(Value::String(detail)) => Some(detail.clone()),
        // Validation errors arrive as a list of `{loc, msg}` objects
        Some(Value::Array(items)) => items
            .iter()
            .find_map(|item| item.get("msg").and_then(Value::as_str))
            .map(str::to_string),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => value
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
