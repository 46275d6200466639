use super::*;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::time::Duration;
use tokio::{
    net::TcpListener,
    sync::{mpsc::unbounded_channel, Mutex},
};

#[derive(Debug, Clone)]
struct CapturedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Clone)]
struct MockServiceState {
    status: StatusCode,
    body: String,
    delay: Duration,
    captured: Arc<Mutex<Vec<CapturedPart>>>,
}

async fn handle_analyze(
    State(state): State<MockServiceState>,
    mut multipart: Multipart,
) -> (StatusCode, String) {
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.expect("field bytes").to_vec();
        parts.push(CapturedPart {
            name,
            file_name,
            content_type,
            data,
        });
    }
    *state.captured.lock().await = parts;
    if !state.delay.is_zero() {
        tokio::time::sleep(state.delay).await;
    }
    (state.status, state.body.clone())
}

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn handle_artifact() -> Vec<u8> {
    b"%PDF-1.7 improved".to_vec()
}

struct MockService {
    url: String,
    captured: Arc<Mutex<Vec<CapturedPart>>>,
}

async fn spawn_mock_service(status: StatusCode, body: &str, delay: Duration) -> MockService {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = MockServiceState {
        status,
        body: body.to_string(),
        delay,
        captured: Arc::clone(&captured),
    };
    let app = Router::new()
        .route("/analyze", post(handle_analyze))
        .route("/health", get(handle_health))
        .route("/output/improved_resume.pdf", get(handle_artifact))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    MockService {
        url: format!("http://{addr}"),
        captured,
    }
}

struct StagedPdfs {
    _dir: tempfile::TempDir,
    request: SubmissionRequest,
}

fn staged_pdfs(additional_info: &str) -> StagedPdfs {
    let dir = tempfile::tempdir().expect("tempdir");
    let resume = dir.path().join("resume.pdf");
    let jd = dir.path().join("job.pdf");
    std::fs::write(&resume, b"%PDF-1.4 resume").expect("write resume");
    std::fs::write(&jd, b"%PDF-1.4 job").expect("write job description");
    StagedPdfs {
        request: SubmissionRequest {
            resume: StagedDocument::from_path(resume),
            job_description: StagedDocument::from_path(jd),
            additional_info: additional_info.to_string(),
        },
        _dir: dir,
    }
}

fn client_for(url: &str) -> AnalysisClient {
    AnalysisClient::with_http(Client::new(), url)
}

const SAMPLE_BODY: &str = r#"{"Evaluating Score": 8, "Evaluating Statement": "Good match", "Suggestions": ["Add metrics", "Shorten summary"]}"#;

#[tokio::test]
async fn submit_sends_three_named_parts() {
    let service = spawn_mock_service(StatusCode::OK, SAMPLE_BODY, Duration::ZERO).await;
    let staged = staged_pdfs("Led migration to Rust");

    client_for(&service.url)
        .submit(&staged.request)
        .await
        .expect("submit");

    let parts = service.captured.lock().await.clone();
    let names: Vec<&str> = parts.iter().map(|part| part.name.as_str()).collect();
    assert_eq!(names, vec!["resume", "job_description", "additional_info"]);

    assert_eq!(parts[0].file_name.as_deref(), Some("resume.pdf"));
    assert_eq!(parts[0].content_type.as_deref(), Some("application/pdf"));
    assert_eq!(parts[0].data, b"%PDF-1.4 resume");
    assert_eq!(parts[1].file_name.as_deref(), Some("job.pdf"));
    assert_eq!(parts[1].data, b"%PDF-1.4 job");
    assert_eq!(parts[2].data, b"Led migration to Rust");
}

#[tokio::test]
async fn empty_additional_info_is_still_sent() {
    let service = spawn_mock_service(StatusCode::OK, SAMPLE_BODY, Duration::ZERO).await;
    let staged = staged_pdfs("");

    client_for(&service.url)
        .submit(&staged.request)
        .await
        .expect("submit");

    let parts = service.captured.lock().await.clone();
    let info = parts
        .iter()
        .find(|part| part.name == "additional_info")
        .expect("additional_info part");
    assert!(info.data.is_empty());
}

#[tokio::test]
async fn sample_response_becomes_analysis_result() {
    let service = spawn_mock_service(StatusCode::OK, SAMPLE_BODY, Duration::ZERO).await;
    let staged = staged_pdfs("");

    let result = client_for(&service.url)
        .submit(&staged.request)
        .await
        .expect("submit");

    assert_eq!(result.score, 8.0);
    assert_eq!(result.statement, "Good match");
    assert_eq!(result.suggestions, vec!["Add metrics", "Shorten summary"]);
    assert_eq!(result.improved_document_ref, None);
}

#[tokio::test]
async fn missing_score_is_reported_as_missing_fields() {
    let body = r#"{"Evaluating Statement": "Good match", "Suggestions": ["Add metrics"]}"#;
    let service = spawn_mock_service(StatusCode::OK, body, Duration::ZERO).await;
    let staged = staged_pdfs("");

    let err = client_for(&service.url)
        .submit(&staged.request)
        .await
        .expect_err("must fail");
    assert!(matches!(err, SubmissionError::MissingFields { .. }));
    assert_eq!(err.to_string(), "Missing required fields in response");
}

#[tokio::test]
async fn non_object_body_is_invalid_format() {
    let service = spawn_mock_service(StatusCode::OK, "[1, 2, 3]", Duration::ZERO).await;
    let staged = staged_pdfs("");

    let err = client_for(&service.url)
        .submit(&staged.request)
        .await
        .expect_err("must fail");
    assert_eq!(err, SubmissionError::InvalidFormat);
}

#[tokio::test]
async fn error_status_surfaces_detail() {
    let service = spawn_mock_service(
        StatusCode::PAYLOAD_TOO_LARGE,
        r#"{"detail": "file too large"}"#,
        Duration::ZERO,
    )
    .await;
    let staged = staged_pdfs("");

    let err = client_for(&service.url)
        .submit(&staged.request)
        .await
        .expect_err("must fail");
    assert_eq!(err.to_string(), "file too large");
}

#[tokio::test]
async fn error_status_without_detail_uses_fallback() {
    let service =
        spawn_mock_service(StatusCode::INTERNAL_SERVER_ERROR, "{}", Duration::ZERO).await;
    let staged = staged_pdfs("");

    let err = client_for(&service.url)
        .submit(&staged.request)
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        SubmissionError::Rejected {
            status: 500,
            detail: None
        }
    );
    assert!(!err.to_string().trim().is_empty());
}

#[tokio::test]
async fn unreachable_service_is_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let staged = staged_pdfs("");

    let err = client_for(&format!("http://{addr}"))
        .submit(&staged.request)
        .await
        .expect_err("must fail");
    assert!(matches!(err, SubmissionError::Transport { .. }));
    assert!(err.to_string().contains("try again"));
}

#[tokio::test]
async fn unreadable_document_fails_before_any_request() {
    let service = spawn_mock_service(StatusCode::OK, SAMPLE_BODY, Duration::ZERO).await;
    let mut staged = staged_pdfs("");
    staged.request.job_description = StagedDocument::from_path("/nonexistent/dir/job.pdf");

    let err = client_for(&service.url)
        .submit(&staged.request)
        .await
        .expect_err("must fail");
    assert!(matches!(
        err,
        SubmissionError::ReadDocument {
            slot: DocumentSlot::JobDescription,
            ..
        }
    ));
    assert!(service.captured.lock().await.is_empty());
}

#[tokio::test]
async fn second_submission_is_refused_while_first_in_flight() {
    let service =
        spawn_mock_service(StatusCode::OK, SAMPLE_BODY, Duration::from_millis(200)).await;
    let staged = staged_pdfs("");
    let client = client_for(&service.url);

    let (first, second) = tokio::join!(client.submit(&staged.request), async {
        tokio::task::yield_now().await;
        client.submit(&staged.request).await
    });

    assert!(first.is_ok(), "first submission failed: {first:?}");
    assert_eq!(second, Err(SubmissionError::Busy));
    assert!(!client.is_submitting());

    client
        .submit(&staged.request)
        .await
        .expect("flag released after completion");
}

#[tokio::test]
async fn health_probe_returns_json_body() {
    let service = spawn_mock_service(StatusCode::OK, SAMPLE_BODY, Duration::ZERO).await;
    let body = client_for(&service.url)
        .probe_health()
        .await
        .expect("health");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn artifact_is_fetched_relative_to_base_url() {
    let service = spawn_mock_service(StatusCode::OK, SAMPLE_BODY, Duration::ZERO).await;
    let client = client_for(&format!("{}/", service.url));

    let bytes = client
        .fetch_artifact("/output/improved_resume.pdf")
        .await
        .expect("artifact");
    assert_eq!(bytes, b"%PDF-1.7 improved");

    let err = client
        .fetch_artifact("output/missing.pdf")
        .await
        .expect_err("missing artifact");
    assert_eq!(err, ArtifactError::Status { status: 404 });
}

#[test]
fn endpoint_joins_without_double_slashes() {
    let client = client_for("http://localhost:5000/");
    assert_eq!(client.base_url(), "http://localhost:5000");
    assert_eq!(client.endpoint("analyze"), "http://localhost:5000/analyze");
    assert_eq!(
        client.endpoint("/output/improved_resume.pdf"),
        "http://localhost:5000/output/improved_resume.pdf"
    );
}

struct DelayedService {
    delay: Duration,
    outcome: Outcome,
}

#[async_trait]
impl AnalysisService for DelayedService {
    async fn submit(
        &self,
        _request: &SubmissionRequest,
    ) -> Result<AnalysisResult, SubmissionError> {
        tokio::time::sleep(self.delay).await;
        self.outcome.clone()
    }

    async fn fetch_artifact(&self, _reference: &str) -> Result<Vec<u8>, ArtifactError> {
        Err(ArtifactError::Status { status: 404 })
    }
}

fn sample_result() -> AnalysisResult {
    AnalysisResult {
        score: 8.0,
        statement: "Good match".to_string(),
        suggestions: vec!["Add metrics".to_string()],
        improved_document_ref: None,
    }
}

#[tokio::test(start_paused = true)]
async fn advisory_timer_after_response_never_applies() {
    let mut wizard = Wizard::new();
    wizard.apply(WizardAction::Start).expect("start");
    for (slot, name) in [
        (DocumentSlot::Resume, "cv.pdf"),
        (DocumentSlot::JobDescription, "jd.pdf"),
    ] {
        wizard
            .apply(WizardAction::SelectFile {
                slot,
                document: StagedDocument::from_path(name),
            })
            .expect("select");
    }
    wizard.apply(WizardAction::Continue).expect("continue");
    let Some(WizardEffect::Submit { epoch, request }) =
        wizard.apply(WizardAction::SkipMoreInfo).expect("skip")
    else {
        panic!("expected submit effect");
    };

    let service = DelayedService {
        delay: Duration::from_secs(2),
        outcome: Ok(sample_result()),
    };
    let schedule = StatusSchedule::new([
        (Duration::ZERO, "Analyzing your resume"),
        (Duration::from_secs(1), "Scoring the match"),
        (Duration::from_secs(5), "Generating your improved resume"),
    ]);
    let (tx, mut rx) = unbounded_channel();

    let outcome = run_submission(&service, &request, &schedule, epoch, move |status| {
        let _ = tx.send(status);
    })
    .await;

    let mut before_response = Vec::new();
    while let Ok(status) = rx.try_recv() {
        before_response.push(status.message.clone());
        wizard
            .apply(WizardAction::StatusUpdate(status))
            .expect("status");
    }
    assert_eq!(before_response, vec!["Analyzing your resume", "Scoring the match"]);
    assert_eq!(wizard.advisory(), Some("Scoring the match"));

    wizard
        .apply(WizardAction::SubmissionFinished { epoch, outcome })
        .expect("finish");
    assert_eq!(wizard.step(), WizardStep::Result);

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(rx.try_recv().is_err(), "cancelled timer fired");
    assert_eq!(wizard.advisory(), None);
    assert_eq!(wizard.result(), Some(&sample_result()));
}

#[tokio::test(start_paused = true)]
async fn failed_submission_also_cancels_timers() {
    let staged = StagedFiles::default();
    assert!(staged.to_request("").is_none());

    let request = SubmissionRequest {
        resume: StagedDocument::from_path("cv.pdf"),
        job_description: StagedDocument::from_path("jd.pdf"),
        additional_info: String::new(),
    };
    let service = DelayedService {
        delay: Duration::from_secs(1),
        outcome: Err(SubmissionError::Transport {
            reason: "connection reset".to_string(),
        }),
    };
    let schedule = StatusSchedule::new([(Duration::from_secs(3), "late")]);
    let (tx, mut rx) = unbounded_channel();

    let outcome = run_submission(&service, &request, &schedule, 1, move |status| {
        let _ = tx.send(status);
    })
    .await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(rx.try_recv().is_err());
}
