//! Runtime bridge between UI command queue and backend event intake.

use std::{path::PathBuf, sync::Arc, thread};

use client_core::{
    run_submission, save_artifact_as, spawn_health_probe, AnalysisClient, AnalysisService,
    ClientSettings, StatusSchedule, SubmissionRequest,
};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};

pub fn launch(cmd_rx: Receiver<BackendCommand>, ui_tx: Sender<UiEvent>, settings: ClientSettings) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        let client = match AnalysisClient::new(&settings) {
            Ok(client) => Arc::new(client),
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    err.to_string(),
                )));
                tracing::error!("failed to build analysis client: {err}");
                return;
            }
        };
        let _ = ui_tx.try_send(UiEvent::BackendReady {
            base_url: client.base_url().to_string(),
        });

        let _enter = runtime.enter();
        let schedule = StatusSchedule::default();

        while let Ok(cmd) = cmd_rx.recv() {
            tracing::debug!(command = cmd.name(), "backend: handling command");
            match cmd {
                BackendCommand::Analyze { epoch, request } => {
                    runtime.spawn(analyze(
                        Arc::clone(&client),
                        schedule.clone(),
                        epoch,
                        request,
                        ui_tx.clone(),
                    ));
                }
                BackendCommand::DownloadArtifact { reference, target } => {
                    runtime.spawn(download(
                        Arc::clone(&client),
                        reference,
                        target,
                        ui_tx.clone(),
                    ));
                }
                BackendCommand::ProbeHealth => {
                    spawn_health_probe(Arc::clone(&client));
                }
            }
        }
        tracing::info!("backend: command queue closed, stopping worker");
    });
}

async fn analyze(
    client: Arc<AnalysisClient>,
    schedule: StatusSchedule,
    epoch: u64,
    request: SubmissionRequest,
    ui_tx: Sender<UiEvent>,
) {
    let status_tx = ui_tx.clone();
    let outcome = run_submission(client.as_ref(), &request, &schedule, epoch, move |status| {
        let _ = status_tx.try_send(UiEvent::Status(status));
    })
    .await;
    deliver(&ui_tx, UiEvent::AnalysisFinished { epoch, outcome });
}

async fn download(
    client: Arc<AnalysisClient>,
    reference: String,
    target: PathBuf,
    ui_tx: Sender<UiEvent>,
) {
    let saved = match client.fetch_artifact(&reference).await {
        Ok(bytes) => save_artifact_as(&bytes, target).await,
        Err(err) => Err(err),
    };
    deliver(
        &ui_tx,
        UiEvent::DownloadFinished(saved.map_err(|err| err.to_string())),
    );
}

/// Hands an event to the UI without blocking the runtime worker.
fn deliver(ui_tx: &Sender<UiEvent>, event: UiEvent) -> bool {
    match ui_tx.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(event)) => {
            tracing::warn!(?event, "ui event queue is full; dropping backend event");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            tracing::debug!("ui closed; dropping backend event");
            false
        }
    }
}
