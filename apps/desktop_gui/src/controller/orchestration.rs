//! Command orchestration helpers from wizard effects to backend command queue.

use std::path::Path;

use client_core::{SubmissionError, WizardAction, WizardEffect};
use crossbeam_channel::{Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;

/// `artifact_path` is where a fetched artifact gets written; unused for submissions.
pub fn command_for_effect(effect: WizardEffect, artifact_path: &Path) -> BackendCommand {
    match effect {
        WizardEffect::Submit { epoch, request } => BackendCommand::Analyze { epoch, request },
        WizardEffect::FetchArtifact { reference } => BackendCommand::DownloadArtifact {
            reference,
            target: artifact_path.to_path_buf(),
        },
    }
}

/// Queues `cmd` for the backend worker. When it cannot be queued, returns the
/// action that settles the wizard state the command was started from.
pub fn dispatch_backend_command(
    cmd_tx: &Sender<BackendCommand>,
    cmd: BackendCommand,
    status: &mut Option<String>,
) -> Option<WizardAction> {
    let cmd_name = cmd.name();
    let (cmd, reason) = match cmd_tx.try_send(cmd) {
        Ok(()) => {
            tracing::debug!(command = cmd_name, "queued ui->backend command");
            return None;
        }
        Err(TrySendError::Full(cmd)) => (cmd, "UI command queue is full; please retry"),
        Err(TrySendError::Disconnected(cmd)) => (
            cmd,
            "Backend worker is not running (possible startup failure); restart the application",
        ),
    };
    tracing::warn!(command = cmd_name, reason, "failed to queue backend command");
    *status = Some(reason.to_string());

    match cmd {
        BackendCommand::Analyze { epoch, .. } => Some(WizardAction::SubmissionFinished {
            epoch,
            outcome: Err(SubmissionError::Transport {
                reason: reason.to_string(),
            }),
        }),
        BackendCommand::DownloadArtifact { .. } => {
            Some(WizardAction::DownloadFinished(Err(reason.to_string())))
        }
        BackendCommand::ProbeHealth => None,
    }
}
