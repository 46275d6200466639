use std::path::PathBuf;

use shared::{domain::DocumentSlot, error::ResponseShapeError};
use thiserror::Error;

/// Why the last analysis submission failed. `Display` is the message shown to
/// the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("An analysis is already in progress. Please wait for it to finish.")]
    Busy,
    #[error("Could not read the {slot} file '{}': {reason}", .path.display())]
    ReadDocument {
        slot: DocumentSlot,
        path: PathBuf,
        reason: String,
    },
    #[error("Unable to reach the analysis service. Please check your connection and try again.")]
    Transport { reason: String },
    #[error("{}", rejection_message(.status, .detail))]
    Rejected { status: u16, detail: Option<String> },
    #[error("Invalid response format")]
    InvalidFormat,
    #[error("Missing required fields in response")]
    MissingFields { field: &'static str },
}

fn rejection_message(status: &u16, detail: &Option<String>) -> String {
    match detail {
        Some(detail) => detail.clone(),
        None => format!(
            "The analysis service could not process your documents (HTTP {status}). Please try again."
        ),
    }
}

impl From<ResponseShapeError> for SubmissionError {
    fn from(value: ResponseShapeError) -> Self {
        match value {
            ResponseShapeError::NotAnObject => SubmissionError::InvalidFormat,
            ResponseShapeError::MissingField(field) => SubmissionError::MissingFields { field },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("Failed to download resume. Please try again.")]
    Transport { reason: String },
    #[error("Failed to download resume (HTTP {status}). Please try again.")]
    Status { status: u16 },
    #[error("Failed to save resume to '{}': {reason}", .path.display())]
    Write { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid backend url '{value}': {reason}")]
    InvalidBaseUrl { value: String, reason: String },
    #[error("backend url '{value}' must use http or https, not '{scheme}'")]
    UnsupportedScheme { value: String, scheme: String },
    #[error("invalid request timeout '{value}': expected a positive number of seconds")]
    InvalidTimeout { value: String },
    #[error("failed to parse settings file '{}': {reason}", .path.display())]
    File { path: PathBuf, reason: String },
    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
