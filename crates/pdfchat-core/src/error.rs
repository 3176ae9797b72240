use serde_json::Value;
use thiserror::Error;

use crate::state::QUERY_FAILED_MESSAGE;

/// Failure talking to the document QA backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {}", .detail.as_deref().unwrap_or("no detail"))]
    Status { status: u16, detail: Option<String> },

    /// Transport failure or an undecodable response body.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A selected file could not be read for upload.
    #[error("could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Build a status error from a response body, pulling out `detail` when
    /// the body is a JSON object carrying one. Empty, false and zero details
    /// count as missing.
    pub fn from_status_body(status: u16, body: &str) -> Self {
        let detail = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| value.get("detail").cloned())
            .and_then(|detail| match detail {
                Value::Null | Value::Bool(false) => None,
                Value::String(s) if s.is_empty() => None,
                Value::Number(n) if n.as_f64() == Some(0.0) => None,
                Value::String(s) => Some(s),
                other => Some(other.to_string()),
            });

        BackendError::Status { status, detail }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text shown in place of an answer when a query fails.
    pub fn answer_message(&self) -> String {
        match self {
            BackendError::Status { status, detail } => format!(
                "Error: {} - {}",
                status,
                detail.as_deref().unwrap_or("Unknown error")
            ),
            _ => QUERY_FAILED_MESSAGE.to_string(),
        }
    }
}
