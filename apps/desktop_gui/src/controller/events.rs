//! Backend-to-UI events and error modeling for desktop GUI controller.

use std::{fmt, path::PathBuf};

use client_core::{AdvisoryStatus, Outcome, WizardAction};

#[derive(Debug)]
pub enum UiEvent {
    BackendReady { base_url: String },
    Status(AdvisoryStatus),
    AnalysisFinished { epoch: u64, outcome: Outcome },
    DownloadFinished(Result<PathBuf, String>),
    Error(UiError),
}

impl UiEvent {
    /// Events that feed the wizard become actions; the rest are handled by the shell.
    pub fn into_wizard_action(self) -> Option<WizardAction> {
        match self {
            UiEvent::Status(status) => Some(WizardAction::StatusUpdate(status)),
            UiEvent::AnalysisFinished { epoch, outcome } => {
                Some(WizardAction::SubmissionFinished { epoch, outcome })
            }
            UiEvent::DownloadFinished(result) => Some(WizardAction::DownloadFinished(result)),
            UiEvent::BackendReady { .. } | UiEvent::Error(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Settings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiError {
    pub context: UiErrorContext,
    pub message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        Self {
            context,
            message: message.into(),
        }
    }
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.context {
            UiErrorContext::BackendStartup => "Backend worker startup failure",
            UiErrorContext::Settings => "Settings problem",
        };
        write!(f, "{prefix}: {}", self.message)
    }
}
