//! GitLab API error types.

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when interacting with the GitLab package API.
#[derive(Debug, Error)]
pub enum GitLabError {
    #[error("GitLab API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Missing {header} header in response from {url}")]
    MissingHeader { header: &'static str, url: String },

    #[error("Invalid {header} header value {value:?}")]
    InvalidHeader { header: &'static str, value: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] HttpError),

    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GitLabError {
    /// Classify an HTTP status code and response body into a typed error.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = short_body(body);
        match status {
            401 | 403 => Self::Auth { status, message },
            404 => Self::NotFound(message),
            _ => Self::Api { status, message },
        }
    }
}

/// Pull a readable message out of a GitLab error body.
///
/// GitLab answers with `{"message": ...}` or `{"error": ...}`; anything else
/// is returned trimmed.
pub(crate) fn short_body(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error_description", "error"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return s.clone(),
                Some(other) if !other.is_null() => return other.to_string(),
                _ => {}
            }
        }
    }
    body.trim().to_string()
}
