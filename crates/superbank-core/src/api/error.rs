use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server answered 401. The session has already been cleared.
    #[error("Unauthorized - please log in again")]
    Unauthorized {
        /// The backend's `detail` field, e.g. why a password was refused.
        detail: Option<String>,
    },

    /// Any other non-success status, passed through as the server sent it.
    #[error("Request failed ({status}): {message}")]
    Status {
        status: StatusCode,
        /// The backend's `detail` field, when the body carried one.
        detail: Option<String>,
        /// Response body, truncated.
        message: String,
    },

    /// No response was received.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Pull a human-readable `detail` out of an error body.
    ///
    /// Handles both `{"detail": "text"}` and validation lists of the form
    /// `{"detail": [{"msg": "text", ...}]}`.
    fn extract_detail(body: &str) -> Option<String> {
        let value: Value = serde_json::from_str(body).ok()?;
        match value.get("detail")? {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items
                .iter()
                .find_map(|item| item.get("msg").and_then(Value::as_str))
                .map(str::to_string),
            _ => None,
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            return ApiError::Unauthorized {
                detail: Self::extract_detail(body),
            };
        }
        ApiError::Status {
            status,
            detail: Self::extract_detail(body),
            message: Self::truncate_body(body),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status(),
            ApiError::InvalidResponse(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// Text to show the user: the server's own explanation when there is
    /// one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Status {
                detail: Some(detail),
                ..
            }
            | ApiError::Unauthorized {
                detail: Some(detail),
            } => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}
