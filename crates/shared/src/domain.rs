use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSlot {
    Resume,
    JobDescription,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 2] = [DocumentSlot::Resume, DocumentSlot::JobDescription];

    /// Multipart part name expected by the analysis service.
    pub fn field_name(self) -> &'static str {
        match self {
            DocumentSlot::Resume => "resume",
            DocumentSlot::JobDescription => "job_description",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentSlot::Resume => "Resume",
            DocumentSlot::JobDescription => "Job Description",
        }
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A user-selected local file waiting to be submitted. Contents are read at
/// submission time, not at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedDocument {
    pub path: PathBuf,
    pub file_name: String,
}

impl StagedDocument {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Self { path, file_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
