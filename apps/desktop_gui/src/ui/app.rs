use std::{path::PathBuf, time::Duration};

use client_core::{
    present, presenter::AnalysisView, ArtifactStatus, ClientSettings, ResultView, Wizard,
    WizardAction, WizardError, WizardStep,
};
use crossbeam_channel::{Receiver, Sender};
use eframe::egui;
use shared::{
    domain::{DocumentSlot, StagedDocument},
    protocol::IMPROVED_RESUME_FILENAME,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::controller::events::{UiError, UiEvent};
use crate::controller::orchestration::{command_for_effect, dispatch_backend_command};

const FORM_STEPS: u8 = 3;

pub struct StartupConfig {
    pub settings: ClientSettings,
    pub settings_warning: Option<UiError>,
}

pub struct DesktopGuiApp {
    wizard: Wizard,
    settings: ClientSettings,
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,
    backend_url: Option<String>,
    status_banner: Option<String>,
    /// Save location picked for the next artifact download.
    download_target: Option<PathBuf>,
}

impl DesktopGuiApp {
    pub fn new(
        cmd_tx: Sender<BackendCommand>,
        ui_rx: Receiver<UiEvent>,
        startup: StartupConfig,
    ) -> Self {
        Self {
            wizard: Wizard::new(),
            settings: startup.settings,
            cmd_tx,
            ui_rx,
            backend_url: None,
            status_banner: startup.settings_warning.map(|err| err.to_string()),
            download_target: None,
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::BackendReady { base_url } => {
                    tracing::info!(%base_url, "backend worker ready");
                    self.backend_url = Some(base_url);
                }
                UiEvent::Error(err) => {
                    tracing::error!("{err}");
                    self.status_banner = Some(err.to_string());
                }
                other => {
                    if let Some(action) = other.into_wizard_action() {
                        self.apply(action);
                    }
                }
            }
        }
    }

    /// Feeds one action through the wizard, dispatching any resulting effect.
    /// A command that cannot be queued yields a follow-up action, applied in turn.
    fn apply(&mut self, action: WizardAction) {
        let mut next = Some(action);
        let mut follow_up = false;
        while let Some(action) = next.take() {
            let step_before = self.wizard.step();
            match self.wizard.apply(action) {
                Ok(effect) => {
                    if !follow_up && self.wizard.step() != step_before {
                        self.status_banner = None;
                    }
                    if let Some(effect) = effect {
                        let artifact_path = self.download_target.take().unwrap_or_else(|| {
                            self.settings.download_dir.join(IMPROVED_RESUME_FILENAME)
                        });
                        let cmd = command_for_effect(effect, &artifact_path);
                        next = dispatch_backend_command(&self.cmd_tx, cmd, &mut self.status_banner);
                    }
                }
                Err(WizardError::Busy) => {
                    tracing::debug!("ignored input while an analysis is running");
                }
                Err(err) => {
                    tracing::debug!(error = %err, step = %self.wizard.step(), "wizard rejected action");
                    self.status_banner = Some(err.to_string());
                }
            }
            follow_up = true;
        }
    }

    fn show_header(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Resume Analyzer");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                match &self.backend_url {
                    Some(url) => ui.weak(url.as_str()),
                    None => ui.weak("connecting..."),
                };
            });
        });

        if let Some(position) = self.wizard.step().form_position() {
            ui.horizontal(|ui| {
                for step in 1..=FORM_STEPS {
                    let text = egui::RichText::new(format!(" {step} "));
                    let text = if step <= position {
                        text.strong().color(ui.visuals().selection.stroke.color)
                    } else {
                        text.weak()
                    };
                    ui.label(text);
                    if step < FORM_STEPS {
                        ui.weak("-");
                    }
                }
                ui.weak(format!("Step {position} of {FORM_STEPS}"));
            });
        }
        ui.add_space(4.0);
    }

    fn show_status_banner(&mut self, ui: &mut egui::Ui) {
        if let Some(message) = self.status_banner.clone() {
            egui::Frame::NONE
                .fill(egui::Color32::from_rgb(111, 53, 53))
                .stroke(egui::Stroke::new(1.0, egui::Color32::from_rgb(175, 96, 96)))
                .corner_radius(8.0)
                .inner_margin(egui::Margin::symmetric(10, 8))
                .show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        ui.label(egui::RichText::new(&message).color(egui::Color32::WHITE));
                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.button("Dismiss").clicked() {
                                self.status_banner = None;
                            }
                        });
                    });
                });
            ui.add_space(6.0);
        }
    }

    fn show_step(&self, ui: &mut egui::Ui, actions: &mut Vec<WizardAction>) {
        match self.wizard.step() {
            WizardStep::Landing => self.show_landing(ui, actions),
            WizardStep::Upload => self.show_upload(ui, actions),
            WizardStep::AskAdditionalInfo => self.show_ask_additional_info(ui, actions),
            WizardStep::EnterAdditionalInfo => self.show_enter_additional_info(ui, actions),
            WizardStep::Loading => self.show_loading(ui),
            WizardStep::Result => self.show_result(ui, actions),
        }
    }

    fn show_landing(&self, ui: &mut egui::Ui, actions: &mut Vec<WizardAction>) {
        ui.vertical_centered(|ui| {
            ui.add_space(48.0);
            ui.label(egui::RichText::new("How well does your resume fit the job?").size(22.0));
            ui.add_space(8.0);
            ui.label(
                "Upload your resume and the job description as PDFs to get a match score, \
                 written feedback and suggestions for improvement.",
            );
            ui.add_space(20.0);
            if ui.button("Get started").clicked() {
                actions.push(WizardAction::Start);
            }
        });
    }

    fn show_upload(&self, ui: &mut egui::Ui, actions: &mut Vec<WizardAction>) {
        if let Some(ResultView::Failure(failure)) = self.wizard.outcome().map(present) {
            error_frame(ui, &failure.message);
            if ui.button(failure.retry_label).clicked() {
                actions.push(WizardAction::Reset);
            }
            ui.add_space(10.0);
        }

        ui.label(egui::RichText::new("Upload your documents").strong());
        ui.add_space(6.0);
        egui::Grid::new("upload_slots")
            .num_columns(3)
            .spacing([12.0, 10.0])
            .show(ui, |ui| {
                for slot in DocumentSlot::ALL {
                    ui.label(slot.label());
                    match self.wizard.staged().get(slot) {
                        Some(document) => ui.label(document.file_name.as_str()),
                        None => ui.weak("No file selected"),
                    };
                    if ui.button("Choose PDF...").clicked() {
                        if let Some(path) = pick_pdf(slot) {
                            actions.push(WizardAction::SelectFile {
                                slot,
                                document: StagedDocument::from_path(path),
                            });
                        }
                    }
                    ui.end_row();
                }
            });

        let missing = self.wizard.staged().missing();
        if !missing.is_empty() {
            ui.add_space(6.0);
            let names: Vec<&str> = missing.iter().map(|slot| slot.label()).collect();
            ui.weak(format!("Still needed: {}", names.join(", ")));
        }

        ui.add_space(14.0);
        ui.horizontal(|ui| {
            if ui.button("Back").clicked() {
                actions.push(WizardAction::Back);
            }
            if ui
                .add_enabled(self.wizard.can_continue(), egui::Button::new("Continue"))
                .clicked()
            {
                actions.push(WizardAction::Continue);
            }
        });
    }

    fn show_ask_additional_info(&self, ui: &mut egui::Ui, actions: &mut Vec<WizardAction>) {
        ui.label(
            egui::RichText::new(
                "Is there anything relevant to this job that your resume does not mention?",
            )
            .strong(),
        );
        ui.weak("Certifications, side projects or recent experience can all change the score.");
        ui.add_space(14.0);
        ui.horizontal(|ui| {
            if ui.button("Back").clicked() {
                actions.push(WizardAction::Back);
            }
            if ui.button("Yes, add details").clicked() {
                actions.push(WizardAction::WantMoreInfo);
            }
            if ui
                .add_enabled(self.wizard.can_submit(), egui::Button::new("No, analyze now"))
                .clicked()
            {
                actions.push(WizardAction::SkipMoreInfo);
            }
        });
    }

    fn show_enter_additional_info(&self, ui: &mut egui::Ui, actions: &mut Vec<WizardAction>) {
        ui.label(egui::RichText::new("Additional information").strong());
        ui.add_space(6.0);
        let mut text = self.wizard.additional_info().to_string();
        let response = ui.add(
            egui::TextEdit::multiline(&mut text)
                .desired_rows(8)
                .desired_width(f32::INFINITY)
                .hint_text("e.g. AWS Solutions Architect certification obtained last month"),
        );
        if response.changed() {
            actions.push(WizardAction::EditAdditionalInfo(text));
        }

        ui.add_space(14.0);
        ui.horizontal(|ui| {
            if ui.button("Back").clicked() {
                actions.push(WizardAction::Back);
            }
            if ui
                .add_enabled(self.wizard.can_submit(), egui::Button::new("Analyze"))
                .clicked()
            {
                actions.push(WizardAction::SubmitAdditionalInfo);
            }
        });
    }

    fn show_loading(&self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(60.0);
            ui.spinner();
            ui.add_space(12.0);
            ui.label(self.wizard.advisory().unwrap_or("Submitting your documents"));
            ui.add_space(4.0);
            ui.weak("This can take up to a minute.");
        });
    }

    fn show_result(&self, ui: &mut egui::Ui, actions: &mut Vec<WizardAction>) {
        match self.wizard.outcome().map(present) {
            Some(ResultView::Analysis(view)) => self.show_analysis(ui, &view, actions),
            Some(ResultView::Failure(failure)) => {
                error_frame(ui, &failure.message);
                if ui.button(failure.retry_label).clicked() {
                    actions.push(WizardAction::Reset);
                }
            }
            None => {
                ui.weak("No analysis available.");
            }
        }
    }

    fn show_analysis(
        &self,
        ui: &mut egui::Ui,
        view: &AnalysisView,
        actions: &mut Vec<WizardAction>,
    ) {
        ui.horizontal(|ui| {
            ui.label(egui::RichText::new("Overall Score").strong());
            ui.label(egui::RichText::new(&view.score_label).size(28.0).strong());
        });
        ui.add_space(10.0);

        ui.label(egui::RichText::new("Evaluation Summary").strong());
        ui.label(view.statement.as_str());
        ui.add_space(10.0);

        ui.label(egui::RichText::new("Improvement Suggestions").strong());
        for (position, suggestion) in &view.suggestions {
            ui.horizontal_wrapped(|ui| {
                ui.label(format!("{position}."));
                ui.label(suggestion.as_str());
            });
        }
        ui.add_space(14.0);

        ui.horizontal(|ui| {
            if view.download_available
                && ui
                    .add_enabled(
                        self.wizard.can_download(),
                        egui::Button::new("Download improved resume"),
                    )
                    .clicked()
            {
                actions.push(WizardAction::RequestDownload);
            }
            if ui.button("Back to home").clicked() {
                actions.push(WizardAction::Reset);
            }
        });

        if let Some(notice) = self.wizard.artifact().notice() {
            ui.add_space(6.0);
            match self.wizard.artifact() {
                ArtifactStatus::Failed(_) => {
                    let color = ui.visuals().error_fg_color;
                    ui.colored_label(color, notice);
                }
                _ => {
                    ui.weak(notice);
                }
            }
        }
    }
}

fn error_frame(ui: &mut egui::Ui, message: &str) {
    let color = ui.visuals().error_fg_color;
    egui::Frame::NONE
        .fill(ui.visuals().extreme_bg_color)
        .stroke(egui::Stroke::new(1.0, color))
        .corner_radius(8.0)
        .inner_margin(egui::Margin::symmetric(10, 8))
        .show(ui, |ui| {
            ui.colored_label(color, message);
        });
}

fn pick_save_path(download_dir: &std::path::Path) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Save improved resume")
        .set_directory(download_dir)
        .set_file_name(IMPROVED_RESUME_FILENAME)
        .add_filter("PDF document", &["pdf"])
        .save_file()
}

fn pick_pdf(slot: DocumentSlot) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title(format!("Select {}", slot.label()))
        .add_filter("PDF document", &["pdf", "PDF"])
        .pick_file()
}

impl eframe::App for DesktopGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();

        egui::TopBottomPanel::top("wizard_header").show(ctx, |ui| {
            ui.add_space(6.0);
            self.show_header(ui);
            self.show_status_banner(ui);
        });

        let mut actions = Vec::new();
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.show_step(ui, &mut actions);
            });
        });
        for action in actions {
            if matches!(action, WizardAction::RequestDownload) {
                match pick_save_path(&self.settings.download_dir) {
                    Some(path) => self.download_target = Some(path),
                    None => continue,
                }
            }
            self.apply(action);
        }

        if self.wizard.is_busy() || self.wizard.artifact() == &ArtifactStatus::Downloading {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(Duration::from_millis(250));
        }
    }
}
