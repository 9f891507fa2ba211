#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use eframe::egui;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use webpbatch::utils::panic_message;
use webpbatch::{BatchCore, ConversionOptions, ConversionReport, RunProgress, RunState};

/// Result slot filled by the background conversion thread
#[derive(Default)]
struct Finished {
    report: Option<ConversionReport>,
    error: Option<String>,
}

/// Directory picker + result window
pub struct WebpbatchGuiApp {
    input_dir: String,
    warning: Option<String>,

    // Shared with the worker thread
    progress: Option<Arc<RunProgress>>,
    finished: Arc<Mutex<Finished>>,

    last_report: Option<ConversionReport>,
    error_message: Option<String>,
}

impl Default for WebpbatchGuiApp {
    fn default() -> Self {
        Self {
            input_dir: String::new(),
            warning: None,
            progress: None,
            finished: Arc::new(Mutex::new(Finished::default())),
            last_report: None,
            error_message: None,
        }
    }
}

impl eframe::App for WebpbatchGuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.collect_finished_run();
        let busy = self.is_converting();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("JPEG/PNG to WebP Converter");
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                ui.label("Directory to convert (input):");
                ui.add_sized(
                    [360.0, 24.0],
                    egui::TextEdit::singleline(&mut self.input_dir)
                        .hint_text("Select the folder containing images"),
                );
                if ui
                    .add_enabled(!busy, egui::Button::new("Browse..."))
                    .clicked()
                {
                    if let Some(path) = webpbatch::select_directory() {
                        self.input_dir = path.display().to_string();
                    }
                }
            });

            ui.add_space(10.0);
            if ui
                .add_enabled(!busy, egui::Button::new("Start conversion"))
                .clicked()
            {
                self.start_conversion();
                ui.ctx().request_repaint();
            }

            if let Some(warning) = &self.warning {
                ui.colored_label(egui::Color32::ORANGE, warning.as_str());
            }

            ui.add_space(10.0);
            self.show_progress(ui);

            ui.separator();
            self.show_results(ui);
        });

        if busy {
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

impl WebpbatchGuiApp {
    fn is_converting(&self) -> bool {
        self.progress.is_some() && self.last_report.is_none() && self.error_message.is_none()
    }

    fn show_progress(&self, ui: &mut egui::Ui) {
        let Some(progress) = &self.progress else {
            return;
        };

        match progress.state() {
            RunState::NotStarted if self.error_message.is_none() => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Scanning...");
                });
            }
            RunState::NotStarted => {}
            RunState::Running | RunState::Completed => {
                let total = progress.total();
                let done = progress.completed();
                let fraction = if total > 0 { done as f32 / total as f32 } else { 1.0 };
                ui.add(
                    egui::ProgressBar::new(fraction)
                        .text(format!("Converted files: {done}/{total}")),
                );
                if progress.failed() > 0 {
                    ui.colored_label(
                        egui::Color32::RED,
                        format!("Failed so far: {}", progress.failed()),
                    );
                }
            }
        }
    }

    fn show_results(&self, ui: &mut egui::Ui) {
        if let Some(error) = &self.error_message {
            ui.colored_label(egui::Color32::RED, format!("Error: {error}"));
            return;
        }

        let Some(report) = &self.last_report else {
            return;
        };

        ui.label(egui::RichText::new("Conversion finished").strong());
        ui.label(format!("Output directory: {}", report.output_dir.display()));
        egui::ScrollArea::vertical().max_height(320.0).show(ui, |ui| {
            ui.monospace(report.summary.to_string());
        });
    }

    fn start_conversion(&mut self) {
        self.warning = None;

        let input_dir = self.input_dir.trim();
        if input_dir.is_empty() {
            self.warning = Some("Please select a directory.".to_string());
            return;
        }

        let input_path = PathBuf::from(input_dir);
        if !input_path.is_dir() {
            self.warning = Some("The selected path is not a directory.".to_string());
            return;
        }

        self.last_report = None;
        self.error_message = None;
        if let Ok(mut finished) = self.finished.lock() {
            *finished = Finished::default();
        }

        let core = BatchCore::new(ConversionOptions::new(input_path));
        self.progress = Some(core.progress());
        let finished = Arc::clone(&self.finished);

        thread::spawn(move || {
            // A panic must still fill the slot or the buttons stay disabled
            let result = panic::catch_unwind(AssertUnwindSafe(|| core.run()));
            if let Ok(mut slot) = finished.lock() {
                match result {
                    Ok(Ok(report)) => slot.report = Some(report),
                    Ok(Err(e)) => slot.error = Some(format!("{e:#}")),
                    Err(payload) => {
                        slot.error = Some(format!(
                            "Conversion crashed: {}",
                            panic_message(payload.as_ref())
                        ))
                    }
                }
            }
        });
    }

    fn collect_finished_run(&mut self) {
        let Ok(mut finished) = self.finished.lock() else {
            return;
        };
        if let Some(report) = finished.report.take() {
            log::info!("{}", report.summary);
            self.last_report = Some(report);
        }
        if let Some(error) = finished.error.take() {
            log::error!("{error}");
            self.error_message = Some(error);
        }
    }
}

fn main() -> Result<(), eframe::Error> {
    env_logger::init(); // Log to stderr (if you want to see logs)

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([640.0, 480.0])
            .with_min_inner_size([480.0, 320.0]),
        ..Default::default()
    };

    eframe::run_native(
        "JPEG/PNG to WebP Converter",
        options,
        Box::new(|_cc| Ok(Box::new(WebpbatchGuiApp::default()))),
    )
}
