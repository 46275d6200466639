use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error body returned by the analysis service on non-success responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorDetail {
    /// Extracts a usable `detail` message from a raw error body. Bodies that
    /// are not JSON, or whose `detail` is missing, blank or not a string,
    /// yield `None`.
    pub fn from_body(body: &[u8]) -> Option<String> {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        let detail = value.get("detail")?.as_str()?.trim();
        if detail.is_empty() {
            None
        } else {
            Some(detail.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseShapeError {
    #[error("Invalid response format")]
    NotAnObject,
    #[error("Missing required fields in response: {0}")]
    MissingField(&'static str),
}
