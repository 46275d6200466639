//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

use client_core::SubmissionRequest;

#[derive(Debug)]
pub enum BackendCommand {
    Analyze {
        epoch: u64,
        request: SubmissionRequest,
    },
    DownloadArtifact {
        reference: String,
        target: PathBuf,
    },
    ProbeHealth,
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::Analyze { .. } => "analyze",
            BackendCommand::DownloadArtifact { .. } => "download_artifact",
            BackendCommand::ProbeHealth => "probe_health",
        }
    }
}
