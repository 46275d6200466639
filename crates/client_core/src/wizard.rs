//! Step controller for the analysis form.
//!
//! [`Wizard::apply`] is the only way to mutate the form. It validates the
//! action against the current [`WizardStep`], updates state, and hands back a
//! [`WizardEffect`] when the caller has network work to do. Results of that work
//! come back in as further actions.

use std::{fmt, path::PathBuf};

use shared::{
    domain::{DocumentSlot, StagedDocument},
    protocol::AnalysisResult,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::SubmissionError,
    presenter::ArtifactStatus,
    staging::{StagedFiles, SubmissionRequest},
    status::AdvisoryStatus,
};

/// Either the analysis or the reason it failed; never both.
pub type Outcome = Result<AnalysisResult, SubmissionError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardStep {
    Landing,
    Upload,
    AskAdditionalInfo,
    EnterAdditionalInfo,
    Loading,
    Result,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Start,
    Continue,
    WantsMoreInfo,
    SkipMoreInfo,
    SubmitMoreInfo,
    Succeeded,
    Failed,
    Back,
    Reset,
}

impl WizardStep {
    /// The transition table. `None` means the trigger is not allowed here.
    pub fn transition(self, trigger: Trigger) -> Option<WizardStep> {
        use Trigger as T;
        use WizardStep as S;

        match (self, trigger) {
            (S::Landing, T::Start) => Some(S::Upload),
            (S::Upload, T::Continue) => Some(S::AskAdditionalInfo),
            (S::AskAdditionalInfo, T::WantsMoreInfo) => Some(S::EnterAdditionalInfo),
            (S::AskAdditionalInfo, T::SkipMoreInfo) => Some(S::Loading),
            (S::EnterAdditionalInfo, T::SubmitMoreInfo) => Some(S::Loading),
            (S::Loading, T::Succeeded) => Some(S::Result),
            (S::Loading, T::Failed) => Some(S::Upload),
            (S::Upload, T::Back) => Some(S::Landing),
            (S::AskAdditionalInfo, T::Back) => Some(S::Upload),
            (S::EnterAdditionalInfo, T::Back) => Some(S::AskAdditionalInfo),
            (S::Loading, T::Reset) => None,
            (_, T::Reset) => Some(S::Upload),
            _ => None,
        }
    }

    /// Position in the 1-2-3 progress indicator, for the form steps only.
    pub fn form_position(self) -> Option<u8> {
        match self {
            WizardStep::Upload => Some(1),
            WizardStep::AskAdditionalInfo => Some(2),
            WizardStep::EnterAdditionalInfo => Some(3),
            _ => None,
        }
    }

    pub fn accepts_input(self) -> bool {
        self != WizardStep::Loading
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardStep::Landing => "landing",
            WizardStep::Upload => "upload",
            WizardStep::AskAdditionalInfo => "ask-additional-info",
            WizardStep::EnterAdditionalInfo => "enter-additional-info",
            WizardStep::Loading => "loading",
            WizardStep::Result => "result",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub enum WizardAction {
    Start,
    SelectFile {
        slot: DocumentSlot,
        document: StagedDocument,
    },
    Continue,
    WantMoreInfo,
    SkipMoreInfo,
    EditAdditionalInfo(String),
    SubmitAdditionalInfo,
    Back,
    Reset,
    SubmissionFinished {
        epoch: u64,
        outcome: Outcome,
    },
    StatusUpdate(AdvisoryStatus),
    RequestDownload,
    DownloadFinished(Result<PathBuf, String>),
}

impl WizardAction {
    fn name(&self) -> &'static str {
        match self {
            WizardAction::Start => "start",
            WizardAction::SelectFile { .. } => "select a file",
            WizardAction::Continue => "continue",
            WizardAction::WantMoreInfo => "add more information",
            WizardAction::SkipMoreInfo => "skip additional information",
            WizardAction::EditAdditionalInfo(_) => "edit additional information",
            WizardAction::SubmitAdditionalInfo => "submit",
            WizardAction::Back => "go back",
            WizardAction::Reset => "reset",
            WizardAction::SubmissionFinished { .. } => "finish submission",
            WizardAction::StatusUpdate(_) => "update status",
            WizardAction::RequestDownload => "download",
            WizardAction::DownloadFinished(_) => "finish download",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardEffect {
    Submit {
        epoch: u64,
        request: SubmissionRequest,
    },
    FetchArtifact {
        reference: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("an analysis is in progress; input is disabled until it finishes")]
    Busy,
    #[error("select both the resume and the job description before continuing")]
    Incomplete { missing: Vec<DocumentSlot> },
    #[error("cannot {action} from the {step} step")]
    IllegalTransition {
        step: WizardStep,
        action: &'static str,
    },
    #[error("no improved resume is available to download")]
    NoArtifact,
    #[error("the improved resume is already downloading")]
    DownloadInProgress,
}

#[derive(Debug, Clone)]
pub struct Wizard {
    step: WizardStep,
    staged: StagedFiles,
    additional_info: String,
    outcome: Option<Outcome>,
    artifact: ArtifactStatus,
    advisory: Option<String>,
    loading_epoch: u64,
}

impl Default for Wizard {
    fn default() -> Self {
        Self::new()
    }
}

impl Wizard {
    pub fn new() -> Self {
        Self {
            step: WizardStep::Landing,
            staged: StagedFiles::default(),
            additional_info: String::new(),
            outcome: None,
            artifact: ArtifactStatus::Idle,
            advisory: None,
            loading_epoch: 0,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn staged(&self) -> &StagedFiles {
        &self.staged
    }

    pub fn additional_info(&self) -> &str {
        &self.additional_info
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().ok())
    }

    pub fn error(&self) -> Option<&SubmissionError> {
        self.outcome.as_ref().and_then(|outcome| outcome.as_ref().err())
    }

    pub fn artifact(&self) -> &ArtifactStatus {
        &self.artifact
    }

    /// Latest advisory message for the current Loading period.
    pub fn advisory(&self) -> Option<&str> {
        self.advisory.as_deref()
    }

    pub fn loading_epoch(&self) -> u64 {
        self.loading_epoch
    }

    pub fn is_busy(&self) -> bool {
        self.step == WizardStep::Loading
    }

    pub fn can_continue(&self) -> bool {
        self.step == WizardStep::Upload && self.staged.is_complete()
    }

    pub fn can_submit(&self) -> bool {
        matches!(
            self.step,
            WizardStep::AskAdditionalInfo | WizardStep::EnterAdditionalInfo
        ) && self.staged.is_complete()
    }

    pub fn can_download(&self) -> bool {
        self.step == WizardStep::Result
            && self.artifact != ArtifactStatus::Downloading
            && self
                .result()
                .is_some_and(|result| result.improved_document_ref.is_some())
    }

    pub fn apply(&mut self, action: WizardAction) -> Result<Option<WizardEffect>, WizardError> {
        if self.is_busy()
            && !matches!(
                action,
                WizardAction::SubmissionFinished { .. } | WizardAction::StatusUpdate(_)
            )
        {
            debug!(action = action.name(), "wizard: input ignored while loading");
            return Err(WizardError::Busy);
        }

        let action_name = action.name();
        match action {
            WizardAction::Start => self.advance(Trigger::Start, action_name).map(|_| None),
            WizardAction::SelectFile { slot, document } => {
                self.require_step(WizardStep::Upload, action_name)?;
                debug!(slot = slot.field_name(), file = %document.file_name, "wizard: file staged");
                self.staged.set_file(slot, document);
                Ok(None)
            }
            WizardAction::Continue => {
                self.check(Trigger::Continue, action_name)?;
                if !self.staged.is_complete() {
                    return Err(WizardError::Incomplete {
                        missing: self.staged.missing(),
                    });
                }
                self.advance(Trigger::Continue, action_name)?;
                // A failure shown on Upload belongs to the previous attempt.
                self.outcome = None;
                Ok(None)
            }
            WizardAction::WantMoreInfo => self
                .advance(Trigger::WantsMoreInfo, action_name)
                .map(|_| None),
            WizardAction::SkipMoreInfo => {
                self.check(Trigger::SkipMoreInfo, action_name)?;
                self.begin_submission(Trigger::SkipMoreInfo, String::new())
                    .map(Some)
            }
            WizardAction::EditAdditionalInfo(text) => {
                self.require_step(WizardStep::EnterAdditionalInfo, action_name)?;
                self.additional_info = text;
                Ok(None)
            }
            WizardAction::SubmitAdditionalInfo => {
                self.check(Trigger::SubmitMoreInfo, action_name)?;
                let text = self.additional_info.clone();
                self.begin_submission(Trigger::SubmitMoreInfo, text)
                    .map(Some)
            }
            WizardAction::Back => self.advance(Trigger::Back, action_name).map(|_| None),
            WizardAction::Reset => {
                self.advance(Trigger::Reset, action_name)?;
                self.clear_inputs();
                self.outcome = None;
                info!("wizard: reset");
                Ok(None)
            }
            WizardAction::SubmissionFinished { epoch, outcome } => {
                self.finish_submission(epoch, outcome);
                Ok(None)
            }
            WizardAction::StatusUpdate(status) => {
                if self.is_busy() && status.epoch == self.loading_epoch {
                    self.advisory = Some(status.message);
                } else {
                    debug!(
                        epoch = status.epoch,
                        current_epoch = self.loading_epoch,
                        step = %self.step,
                        "wizard: stale advisory status dropped"
                    );
                }
                Ok(None)
            }
            WizardAction::RequestDownload => {
                self.require_step(WizardStep::Result, action_name)?;
                let reference = self
                    .result()
                    .and_then(|result| result.improved_document_ref.clone())
                    .ok_or(WizardError::NoArtifact)?;
                if self.artifact == ArtifactStatus::Downloading {
                    return Err(WizardError::DownloadInProgress);
                }
                self.artifact = ArtifactStatus::Downloading;
                Ok(Some(WizardEffect::FetchArtifact { reference }))
            }
            WizardAction::DownloadFinished(result) => {
                if self.step != WizardStep::Result || self.artifact != ArtifactStatus::Downloading
                {
                    debug!(step = %self.step, "wizard: stale download result dropped");
                    return Ok(None);
                }
                self.artifact = match result {
                    Ok(path) => ArtifactStatus::Saved(path),
                    Err(message) => {
                        warn!(%message, "wizard: improved resume download failed");
                        ArtifactStatus::Failed(message)
                    }
                };
                Ok(None)
            }
        }
    }

    fn check(&self, trigger: Trigger, action: &'static str) -> Result<WizardStep, WizardError> {
        self.step
            .transition(trigger)
            .ok_or(WizardError::IllegalTransition {
                step: self.step,
                action,
            })
    }

    fn advance(&mut self, trigger: Trigger, action: &'static str) -> Result<(), WizardError> {
        let next = self.check(trigger, action)?;
        debug!(from = %self.step, to = %next, ?trigger, "wizard: transition");
        self.step = next;
        Ok(())
    }

    fn require_step(&self, step: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WizardError::IllegalTransition {
                step: self.step,
                action,
            })
        }
    }

    fn begin_submission(
        &mut self,
        trigger: Trigger,
        additional_info: String,
    ) -> Result<WizardEffect, WizardError> {
        let request = self
            .staged
            .to_request(additional_info)
            .ok_or_else(|| WizardError::Incomplete {
                missing: self.staged.missing(),
            })?;
        self.advance(trigger, "submit")?;
        self.loading_epoch += 1;
        self.outcome = None;
        self.artifact = ArtifactStatus::Idle;
        self.advisory = None;
        info!(epoch = self.loading_epoch, "wizard: submission started");
        Ok(WizardEffect::Submit {
            epoch: self.loading_epoch,
            request,
        })
    }

    fn finish_submission(&mut self, epoch: u64, outcome: Outcome) {
        if !self.is_busy() || epoch != self.loading_epoch {
            debug!(
                epoch,
                current_epoch = self.loading_epoch,
                step = %self.step,
                "wizard: stale submission outcome dropped"
            );
            return;
        }

        let trigger = if outcome.is_ok() {
            Trigger::Succeeded
        } else {
            Trigger::Failed
        };
        if let Err(err) = self.advance(trigger, "finish submission") {
            warn!(epoch, error = %err, "wizard: submission outcome rejected");
            return;
        }

        self.advisory = None;
        match outcome {
            Ok(result) => {
                info!(epoch, score = result.score, "wizard: analysis ready");
                self.outcome = Some(Ok(result));
            }
            Err(err) => {
                // Failure lands back on the first form step with the inputs cleared.
                self.clear_inputs();
                warn!(epoch, error = %err, "wizard: submission failed");
                self.outcome = Some(Err(err));
            }
        }
    }

    fn clear_inputs(&mut self) {
        self.staged.reset();
        self.additional_info.clear();
        self.artifact = ArtifactStatus::Idle;
        self.advisory = None;
    }
}

#[cfg(test)]
#[path = "tests/wizard_tests.rs"]
mod tests;
