//! Turns a submission outcome into display data and saves retrieved artifacts.

use std::path::{Path, PathBuf};

use shared::protocol::IMPROVED_RESUME_FILENAME;
use tracing::info;

use crate::{error::ArtifactError, wizard::Outcome};

pub const RETRY_LABEL: &str = "Try again";

#[derive(Debug, Clone, PartialEq)]
pub enum ResultView {
    Analysis(AnalysisView),
    Failure(FailureView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    pub score_label: String,
    pub statement: String,
    /// 1-based position paired with the suggestion text.
    pub suggestions: Vec<(usize, String)>,
    pub download_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureView {
    pub message: String,
    pub retry_label: &'static str,
}

/// Progress of the optional improved-resume download. Independent of the
/// analysis outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArtifactStatus {
    #[default]
    Idle,
    Downloading,
    Saved(PathBuf),
    Failed(String),
}

impl ArtifactStatus {
    pub fn notice(&self) -> Option<String> {
        match self {
            ArtifactStatus::Idle => None,
            ArtifactStatus::Downloading => Some("Downloading improved resume...".to_string()),
            ArtifactStatus::Saved(path) => {
                Some(format!("Saved improved resume to {}", path.display()))
            }
            ArtifactStatus::Failed(message) => Some(message.clone()),
        }
    }
}

pub fn present(outcome: &Outcome) -> ResultView {
    match outcome {
        Ok(result) => ResultView::Analysis(AnalysisView {
            score_label: format_score(result.score),
            statement: result.statement.clone(),
            suggestions: result
                .suggestions
                .iter()
                .cloned()
                .enumerate()
                .map(|(index, text)| (index + 1, text))
                .collect(),
            download_available: result.improved_document_ref.is_some(),
        }),
        Err(err) => ResultView::Failure(FailureView {
            message: err.to_string(),
            retry_label: RETRY_LABEL,
        }),
    }
}

pub fn format_score(score: f64) -> String {
    format!("{score}/10")
}

/// Writes the retrieved document into `dir` as `improved_resume.pdf`,
/// replacing an earlier download.
pub async fn save_artifact(bytes: &[u8], dir: &Path) -> Result<PathBuf, ArtifactError> {
    save_artifact_as(bytes, dir.join(IMPROVED_RESUME_FILENAME)).await
}

/// Writes the retrieved document to `path`, creating missing parent directories.
pub async fn save_artifact_as(bytes: &[u8], path: PathBuf) -> Result<PathBuf, ArtifactError> {
    let write_error = |err: std::io::Error| ArtifactError::Write {
        path: path.clone(),
        reason: err.to_string(),
    };
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_error)?;
    }
    tokio::fs::write(&path, bytes).await.map_err(write_error)?;
    info!(path = %path.display(), size_bytes = bytes.len(), "artifact: saved improved resume");
    Ok(path)
}
