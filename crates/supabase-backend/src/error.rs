//! Backend error types.

use reqwest::StatusCode;
use thiserror::Error;

/// Error type for backend operations.
#[derive(Error, Debug)]
pub enum BackendError {
    /// Error reported by the Supabase API; the message is preserved verbatim
    /// so callers can surface it to the user unchanged.
    #[error("{0}")]
    Api(String),

    /// Unique-key violation on insert (profile row already exists).
    #[error("Duplicate row: {0}")]
    Duplicate(String),

    /// Session storage error
    #[error("Session storage error: {0}")]
    Storage(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parse error
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Result type alias using BackendError.
pub type BackendResult<T> = Result<T, BackendError>;

/// Map a non-success Supabase response body to a `BackendError`.
///
/// Supabase error bodies are inconsistent across endpoints (`msg`,
/// `error_description`, `message`, `error`); whichever field is present is
/// surfaced verbatim. A 409 becomes `Duplicate` so check-then-insert callers
/// can treat it as "row already exists".
pub(crate) fn error_from_body(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(|v| v.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| format!("HTTP {}: {}", status, body));

    if status == StatusCode::CONFLICT {
        BackendError::Duplicate(message)
    } else {
        BackendError::Api(message)
    }
}
