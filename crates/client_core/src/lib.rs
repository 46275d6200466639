use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::{DocumentSlot, StagedDocument},
    error::ErrorDetail,
    protocol::{AnalysisResult, ADDITIONAL_INFO_FIELD, ANALYZE_PATH, HEALTH_PATH},
};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub mod config;
pub mod error;
pub mod presenter;
pub mod staging;
pub mod status;
pub mod wizard;

pub use config::{load_settings, ClientSettings};
pub use error::{ArtifactError, ConfigError, SubmissionError};
pub use presenter::{present, save_artifact, save_artifact_as, ArtifactStatus, ResultView};
pub use staging::{StagedFiles, SubmissionRequest};
pub use status::{AdvisoryStatus, StatusSchedule, StatusTicker};
pub use wizard::{Outcome, Wizard, WizardAction, WizardEffect, WizardError, WizardStep};

const PDF_MIME: &str = "application/pdf";

/// The remote side of the form: analysis submission and artifact retrieval.
#[async_trait]
pub trait AnalysisService: Send + Sync {
    async fn submit(&self, request: &SubmissionRequest) -> Result<AnalysisResult, SubmissionError>;
    async fn fetch_artifact(&self, reference: &str) -> Result<Vec<u8>, ArtifactError>;
}

pub struct AnalysisClient {
    http: Client,
    base_url: String,
    in_flight: AtomicBool,
}

impl AnalysisClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, ConfigError> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()?;
        Ok(Self::with_http(http, settings.backend_base_url.clone()))
    }

    pub fn with_http(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http,
            base_url,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Calls `GET /health`. The body is returned as JSON when it parses,
    /// otherwise as a JSON string.
    pub async fn probe_health(&self) -> Result<serde_json::Value> {
        let body = self
            .http
            .get(self.endpoint(HEALTH_PATH))
            .send()
            .await
            .context("health probe request failed")?
            .error_for_status()
            .context("health probe returned an error status")?
            .text()
            .await
            .context("failed to read health probe body")?;
        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body)))
    }

    async fn submit_documents(
        &self,
        request: &SubmissionRequest,
    ) -> Result<AnalysisResult, SubmissionError> {
        let form = build_form(request).await?;
        let started = Instant::now();
        info!(
            resume = %request.resume.file_name,
            job_description = %request.job_description.file_name,
            additional_info_len = request.additional_info.len(),
            "analysis: submitting documents"
        );

        let response = self
            .http
            .post(self.endpoint(ANALYZE_PATH))
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "analysis: request failed");
                SubmissionError::Transport {
                    reason: err.to_string(),
                }
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|err| {
            warn!(error = %err, "analysis: failed to read response body");
            SubmissionError::Transport {
                reason: err.to_string(),
            }
        })?;

        if !status.is_success() {
            let detail = ErrorDetail::from_body(&body);
            warn!(status = status.as_u16(), ?detail, "analysis: service rejected submission");
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let result = AnalysisResult::from_slice(&body).map_err(|err| {
            warn!(error = %err, "analysis: response failed validation");
            SubmissionError::from(err)
        })?;
        info!(
            score = result.score,
            suggestions = result.suggestions.len(),
            has_improved_resume = result.improved_document_ref.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis: completed"
        );
        Ok(result)
    }
}

#[async_trait]
impl AnalysisService for AnalysisClient {
    async fn submit(&self, request: &SubmissionRequest) -> Result<AnalysisResult, SubmissionError> {
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            warn!("analysis: submission refused, another one is in flight");
            return Err(SubmissionError::Busy);
        };
        self.submit_documents(request).await
    }

    async fn fetch_artifact(&self, reference: &str) -> Result<Vec<u8>, ArtifactError> {
        let url = self.endpoint(reference);
        debug!(%url, "artifact: fetching improved resume");
        let response = self.http.get(&url).send().await.map_err(|err| {
            warn!(error = %err, "artifact: request failed");
            ArtifactError::Transport {
                reason: err.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "artifact: service returned an error");
            return Err(ArtifactError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|err| ArtifactError::Transport {
            reason: err.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}

struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

async fn document_part(
    slot: DocumentSlot,
    document: &StagedDocument,
) -> Result<Part, SubmissionError> {
    let read_error = |reason: String| SubmissionError::ReadDocument {
        slot,
        path: document.path.clone(),
        reason,
    };
    let bytes = tokio::fs::read(document.path())
        .await
        .map_err(|err| read_error(err.to_string()))?;
    Part::bytes(bytes)
        .file_name(document.file_name.clone())
        .mime_str(PDF_MIME)
        .map_err(|err| read_error(err.to_string()))
}

async fn build_form(request: &SubmissionRequest) -> Result<Form, SubmissionError> {
    let resume = document_part(DocumentSlot::Resume, &request.resume).await?;
    let job_description =
        document_part(DocumentSlot::JobDescription, &request.job_description).await?;
    Ok(Form::new()
        .part(DocumentSlot::Resume.field_name(), resume)
        .part(DocumentSlot::JobDescription.field_name(), job_description)
        .text(ADDITIONAL_INFO_FIELD, request.additional_info.clone()))
}

/// Runs one submission with its advisory timers. The timers are cancelled
/// before this returns, whatever the outcome, and also if the future is
/// dropped early.
pub async fn run_submission<F>(
    service: &dyn AnalysisService,
    request: &SubmissionRequest,
    schedule: &StatusSchedule,
    epoch: u64,
    sink: F,
) -> Outcome
where
    F: Fn(AdvisoryStatus) + Send + Sync + 'static,
{
    let mut ticker = StatusTicker::start(schedule, epoch, sink);
    let outcome = service.submit(request).await;
    ticker.cancel();
    outcome
}

/// Fire-and-forget health check; the result is only logged.
pub fn spawn_health_probe(client: Arc<AnalysisClient>) -> JoinHandle<()> {
    tokio::spawn(async move {
        match client.probe_health().await {
            Ok(body) => info!(base_url = client.base_url(), %body, "health: backend reachable"),
            Err(err) => warn!(base_url = client.base_url(), "health: backend check failed: {err:#}"),
        }
    })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
