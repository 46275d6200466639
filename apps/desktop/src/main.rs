use std::{fmt::Write as _, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    load_settings, present, run_submission, save_artifact, spawn_health_probe, AnalysisClient,
    AnalysisService, ResultView, StatusSchedule, SubmissionRequest, Wizard, WizardAction,
    WizardEffect,
};
use shared::domain::{DocumentSlot, StagedDocument};
use tokio::sync::mpsc::unbounded_channel;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Score a resume against a job description")]
struct Args {
    #[arg(long)]
    resume: PathBuf,
    #[arg(long)]
    job_description: PathBuf,
    /// Extra context not mentioned in the resume.
    #[arg(long)]
    additional_info: Option<String>,
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long)]
    download_dir: Option<PathBuf>,
    /// Save the improved resume when the service generated one.
    #[arg(long)]
    download: bool,
    /// Print the analysis as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let settings = load_settings()
        .context("failed to load settings")?
        .with_overrides(args.backend_url.as_deref(), args.download_dir.clone())?;
    let client = Arc::new(AnalysisClient::new(&settings)?);
    spawn_health_probe(Arc::clone(&client));

    let mut wizard = Wizard::new();
    let (epoch, request) = match fill_form(&mut wizard, &args)? {
        WizardEffect::Submit { epoch, request } => (epoch, request),
        other => bail!("unexpected effect while filling the form: {other:?}"),
    };

    let schedule = StatusSchedule::default();
    submit_and_track(
        &mut wizard,
        client.as_ref(),
        &schedule,
        epoch,
        &request,
        |message| eprintln!("... {message}"),
    )
    .await?;

    let Some(outcome) = wizard.outcome() else {
        bail!("submission finished without an outcome");
    };
    match outcome {
        Ok(result) if args.json => println!("{}", serde_json::to_string_pretty(result)?),
        _ => {}
    }
    match present(outcome) {
        ResultView::Analysis(view) => {
            if !args.json {
                print!("{}", render_analysis(&view));
            }
        }
        ResultView::Failure(view) => bail!("{}", view.message),
    }

    if args.download {
        download_artifact(&mut wizard, client.as_ref(), &settings.download_dir).await?;
    }

    Ok(())
}

fn fill_form(wizard: &mut Wizard, args: &Args) -> Result<WizardEffect> {
    wizard.apply(WizardAction::Start)?;
    for (slot, path) in [
        (DocumentSlot::Resume, &args.resume),
        (DocumentSlot::JobDescription, &args.job_description),
    ] {
        if !has_pdf_extension(path) {
            warn!(slot = slot.field_name(), path = %path.display(), "input does not look like a PDF");
        }
        wizard.apply(WizardAction::SelectFile {
            slot,
            document: StagedDocument::from_path(path),
        })?;
    }
    wizard.apply(WizardAction::Continue)?;

    let effect = match args
        .additional_info
        .as_ref()
        .filter(|text| !text.trim().is_empty())
    {
        Some(text) => {
            wizard.apply(WizardAction::WantMoreInfo)?;
            wizard.apply(WizardAction::EditAdditionalInfo(text.clone()))?;
            wizard.apply(WizardAction::SubmitAdditionalInfo)?
        }
        None => wizard.apply(WizardAction::SkipMoreInfo)?,
    };
    effect.context("form did not produce a submission")
}

/// Runs the submission while routing advisory messages through the wizard,
/// then records the outcome. Messages still queued afterwards are stale and
/// get dropped by the wizard.
async fn submit_and_track(
    wizard: &mut Wizard,
    service: &dyn AnalysisService,
    schedule: &StatusSchedule,
    epoch: u64,
    request: &SubmissionRequest,
    mut on_advisory: impl FnMut(&str),
) -> Result<()> {
    let (status_tx, mut status_rx) = unbounded_channel();
    let submission = run_submission(service, request, schedule, epoch, move |status| {
        let _ = status_tx.send(status);
    });
    tokio::pin!(submission);

    let outcome = loop {
        tokio::select! {
            outcome = &mut submission => break outcome,
            Some(status) = status_rx.recv() => {
                wizard.apply(WizardAction::StatusUpdate(status))?;
                if let Some(message) = wizard.advisory() {
                    on_advisory(message);
                }
            }
        }
    };
    wizard.apply(WizardAction::SubmissionFinished { epoch, outcome })?;
    while let Ok(status) = status_rx.try_recv() {
        wizard.apply(WizardAction::StatusUpdate(status))?;
    }
    Ok(())
}

fn has_pdf_extension(path: &std::path::Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn render_analysis(view: &client_core::presenter::AnalysisView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Overall Score: {}", view.score_label);
    let _ = writeln!(out);
    let _ = writeln!(out, "Evaluation Summary");
    let _ = writeln!(out, "{}", view.statement);
    let _ = writeln!(out);
    let _ = writeln!(out, "Improvement Suggestions");
    for (position, suggestion) in &view.suggestions {
        let _ = writeln!(out, "{position:>2}. {suggestion}");
    }
    if view.download_available {
        let _ = writeln!(out);
        let _ = writeln!(out, "An improved resume is available (use --download to save it).");
    }
    out
}

async fn download_artifact(
    wizard: &mut Wizard,
    service: &dyn AnalysisService,
    download_dir: &std::path::Path,
) -> Result<()> {
    if !wizard.can_download() {
        eprintln!("The service did not generate an improved resume.");
        return Ok(());
    }
    let Some(WizardEffect::FetchArtifact { reference }) =
        wizard.apply(WizardAction::RequestDownload)?
    else {
        bail!("download request produced no fetch");
    };

    let saved = match service.fetch_artifact(&reference).await {
        Ok(bytes) => save_artifact(&bytes, download_dir).await,
        Err(err) => Err(err),
    };
    wizard.apply(WizardAction::DownloadFinished(
        saved.map_err(|err| err.to_string()),
    ))?;
    if let Some(notice) = wizard.artifact().notice() {
        eprintln!("{notice}");
    }
    Ok(())
}
