use std::path::PathBuf;

mod backend_bridge;
mod controller;
mod ui;

use clap::Parser;
use client_core::{load_settings, ClientSettings};
use crossbeam_channel::bounded;
use eframe::egui;

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiErrorContext, UiEvent};
use crate::ui::{DesktopGuiApp, StartupConfig};

#[derive(Parser, Debug)]
#[command(about = "Resume analyzer desktop client")]
struct Args {
    /// Analysis service base URL; overrides analyzer.toml and the environment.
    #[arg(long)]
    backend_url: Option<String>,
    #[arg(long)]
    download_dir: Option<PathBuf>,
}

fn resolve_settings(args: &Args) -> (ClientSettings, Option<UiError>) {
    let loaded = load_settings().and_then(|settings| {
        settings.with_overrides(args.backend_url.as_deref(), args.download_dir.clone())
    });
    match loaded {
        Ok(settings) => (settings, None),
        Err(err) => {
            tracing::error!("invalid client settings, falling back to defaults: {err}");
            (
                ClientSettings::default(),
                Some(UiError::from_message(
                    UiErrorContext::Settings,
                    format!("{err}; using defaults"),
                )),
            )
        }
    }
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();
    let (settings, settings_warning) = resolve_settings(&args);
    tracing::info!(backend = %settings.backend_base_url, "starting desktop client");

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(64);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(256);
    backend_bridge::runtime::launch(cmd_rx, ui_tx, settings.clone());
    if cmd_tx.try_send(BackendCommand::ProbeHealth).is_err() {
        tracing::warn!("could not queue startup health probe");
    }

    let startup = StartupConfig {
        settings,
        settings_warning,
    };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Resume Analyzer")
            .with_inner_size([760.0, 640.0])
            .with_min_inner_size([560.0, 480.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Resume Analyzer",
        options,
        Box::new(move |_cc| Ok(Box::new(DesktopGuiApp::new(cmd_tx, ui_rx, startup)))),
    )
}
