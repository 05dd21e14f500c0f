//! The meshport window: input list, format/folder pickers, run button, and
//! the per-file log. Batches run on a worker thread so the UI stays live;
//! results come back over a channel and land in the log in one frame.

use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use eframe::egui;
use tracing::warn;

use crate::convert::{self, ConversionResult};
use crate::session::{BatchOutcome, OutputFormat, Session, INPUT_EXTENSIONS};

#[cfg(target_os = "macos")]
const REVEAL_COMMAND: &str = "open";
#[cfg(target_os = "windows")]
const REVEAL_COMMAND: &str = "explorer";
#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const REVEAL_COMMAND: &str = "xdg-open";

#[derive(Default)]
pub struct MeshportApp {
    session: Session,
    log: Vec<LogLine>,
    outcome: Option<BatchOutcome>,
    batch: Option<RunningBatch>,
    show_about: bool,
}

/// An in-flight batch. The output format is captured at dispatch time so
/// flipping the combo mid-run cannot mislabel the results.
struct RunningBatch {
    format: OutputFormat,
    rx: Receiver<Vec<ConversionResult>>,
}

struct LogLine {
    success: bool,
    text: String,
}

/// One log entry per finished conversion, in the original converter's
/// phrasing: PLY results report the size saving, STL results just confirm.
fn log_line(result: &ConversionResult, format: OutputFormat) -> LogLine {
    let name = result
        .input_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| result.input_path.display().to_string());
    if result.success {
        let text = match format {
            OutputFormat::Ply => format!(
                "\u{2705} {} \u{2192} .ply | Saved {:.1}%",
                name, result.size_delta_percent
            ),
            OutputFormat::Stl => format!("\u{2705} {} converted successfully.", name),
        };
        LogLine {
            success: true,
            text,
        }
    } else {
        LogLine {
            success: false,
            text: format!("\u{274c} {} failed: {}", name, result.error),
        }
    }
}

impl MeshportApp {
    fn batch_running(&self) -> bool {
        self.batch.is_some()
    }

    /// Pull finished batch results out of the channel, if any.
    fn poll_batch(&mut self) {
        let Some(batch) = &self.batch else { return };
        let format = batch.format;
        match batch.rx.try_recv() {
            Ok(results) => {
                self.log = results.iter().map(|r| log_line(r, format)).collect();
                self.outcome = Some(BatchOutcome::classify(&results));
                self.batch = None;
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => {}
            Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                warn!("batch worker went away without delivering results");
                self.batch = None;
            }
        }
    }

    fn run_clicked(&mut self) {
        let tasks = match self.session.build_tasks() {
            Ok(tasks) => tasks,
            Err(e) => {
                rfd::MessageDialog::new()
                    .set_level(rfd::MessageLevel::Warning)
                    .set_title("Cannot start batch")
                    .set_description(e.to_string())
                    .show();
                return;
            }
        };

        self.log.clear();
        self.outcome = None;

        let (tx, rx): (Sender<Vec<ConversionResult>>, _) = std::sync::mpsc::channel();
        self.batch = Some(RunningBatch {
            format: self.session.format,
            rx,
        });
        std::thread::spawn(move || {
            let results = convert::run_batch(&tasks);
            // The UI may have shut down; nothing to do about a send failure.
            let _ = tx.send(results);
        });
    }

    fn select_files_clicked(&mut self) {
        if let Some(files) = rfd::FileDialog::new()
            .add_filter("Mesh files", &INPUT_EXTENSIONS)
            .pick_files()
        {
            for file in files {
                self.session.add_file(file);
            }
        }
    }

    fn select_output_folder_clicked(&mut self) {
        if let Some(folder) = rfd::FileDialog::new().pick_folder() {
            self.session.output_dir = Some(folder);
        }
    }

    fn open_output_folder_clicked(&self) {
        let Some(dir) = &self.session.output_dir else {
            return;
        };
        if !dir.is_dir() {
            return;
        }
        if let Err(e) = std::process::Command::new(REVEAL_COMMAND).arg(dir).spawn() {
            warn!("failed to open {:?} with {}: {}", dir, REVEAL_COMMAND, e);
        }
    }

    fn collect_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        for file in dropped {
            if let Some(path) = file.path {
                self.session.add_file(path);
            }
        }
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::menu::bar(ui, |ui| {
            ui.menu_button("Help", |ui| {
                if ui.button("About Meshport").clicked() {
                    self.show_about = true;
                    ui.close_menu();
                }
            });
        });
    }

    fn about_window(&mut self, ctx: &egui::Context) {
        egui::Window::new("About Meshport")
            .open(&mut self.show_about)
            .resizable(false)
            .collapsible(false)
            .show(ctx, |ui| {
                ui.strong("Meshport");
                ui.label("A batch tool for converting 3D mesh files between STL, PLY, and OBJ.");
                ui.label("Supports drag-and-drop; conversions run on all CPU cores.");
                ui.add_space(8.0);
                ui.label(format!("Version: {}", env!("CARGO_PKG_VERSION")));
            });
    }

    fn central_panel(&mut self, ui: &mut egui::Ui) {
        ui.label("Input Files (Drag & Drop or Select):");
        egui::ScrollArea::vertical()
            .id_salt("input_files")
            .max_height(120.0)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for file in &self.session.input_files {
                    ui.monospace(file.display().to_string());
                }
            });

        ui.horizontal(|ui| {
            if ui.button("Select Files").clicked() {
                self.select_files_clicked();
            }
            if ui.button("Clear").clicked() {
                self.session.clear_files();
            }
        });

        ui.separator();

        ui.horizontal(|ui| {
            ui.label("Output Format:");
            egui::ComboBox::from_id_salt("output_format")
                .selected_text(self.session.format.label())
                .show_ui(ui, |ui| {
                    for format in [OutputFormat::Ply, OutputFormat::Stl] {
                        ui.selectable_value(&mut self.session.format, format, format.label());
                    }
                });
        });

        ui.horizontal(|ui| {
            if ui.button("Select Output Folder").clicked() {
                self.select_output_folder_clicked();
            }
            match &self.session.output_dir {
                Some(dir) => ui.monospace(dir.display().to_string()),
                None => ui.weak("(No folder selected)"),
            };
        });

        ui.separator();

        ui.horizontal(|ui| {
            let run = ui.add_enabled(!self.batch_running(), egui::Button::new("Run"));
            if run.clicked() {
                self.run_clicked();
            }
            if self.batch_running() {
                ui.spinner();
                ui.label("Converting...");
            }
            if ui.button("Open Output Folder").clicked() {
                self.open_output_folder_clicked();
            }
        });

        ui.separator();

        ui.label("Log:");
        egui::ScrollArea::vertical()
            .id_salt("log")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for line in &self.log {
                    if line.success {
                        ui.label(&line.text);
                    } else {
                        ui.colored_label(egui::Color32::LIGHT_RED, &line.text);
                    }
                }
                if let Some(outcome) = &self.outcome {
                    ui.separator();
                    let color = match outcome {
                        BatchOutcome::AllSucceeded(_) => egui::Color32::LIGHT_GREEN,
                        BatchOutcome::AllFailed(_) => egui::Color32::LIGHT_RED,
                        BatchOutcome::Partial { .. } => egui::Color32::YELLOW,
                    };
                    ui.colored_label(color, outcome.message());
                }
            });
    }
}

impl eframe::App for MeshportApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_batch();
        self.collect_dropped_files(ctx);

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            self.menu_bar(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| {
            self.central_panel(ui);
        });
        self.about_window(ctx);

        if self.batch_running() {
            // Keep polling for the worker's results.
            ctx.request_repaint_after(Duration::from_millis(100));
        }
    }
}

/// The platform's "reveal folder in the file manager" command.
pub fn reveal_command() -> &'static str {
    REVEAL_COMMAND
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use std::path::PathBuf;

    fn result(name: &str, success: bool, delta: f64) -> ConversionResult {
        ConversionResult {
            input_path: PathBuf::from(name),
            success,
            error: if success {
                String::new()
            } else {
                "failed to parse bad.obj: invalid geometry".to_string()
            },
            size_delta_percent: delta,
        }
    }

    #[test]
    fn log_line_ply_success_reports_saving() {
        let line = log_line(&result("/tmp/a.stl", true, 40.0), OutputFormat::Ply);
        assert!(line.success);
        assert_eq!(line.text, "\u{2705} a.stl \u{2192} .ply | Saved 40.0%");
    }

    #[test]
    fn log_line_stl_success_is_plain() {
        let line = log_line(&result("/tmp/b.ply", true, 12.5), OutputFormat::Stl);
        assert!(line.success);
        assert_eq!(line.text, "\u{2705} b.ply converted successfully.");
    }

    #[test]
    fn log_line_failure_includes_error_text() {
        let line = log_line(&result("/tmp/bad.obj", false, 0.0), OutputFormat::Ply);
        assert!(!line.success);
        assert_eq!(
            line.text,
            "\u{274c} bad.obj failed: failed to parse bad.obj: invalid geometry"
        );
    }

    #[test]
    fn poll_batch_uses_format_captured_at_dispatch() {
        let mut app = MeshportApp::default();
        let (tx, rx) = std::sync::mpsc::channel();
        app.batch = Some(RunningBatch {
            format: OutputFormat::Ply,
            rx,
        });
        // The user flips the combo while the batch is still running.
        app.session.format = OutputFormat::Stl;

        tx.send(vec![result("/tmp/a.stl", true, 40.0)]).unwrap();
        app.poll_batch();

        assert!(!app.batch_running());
        assert_eq!(app.log.len(), 1);
        assert_eq!(app.log[0].text, "\u{2705} a.stl \u{2192} .ply | Saved 40.0%");
        assert_eq!(app.outcome, Some(BatchOutcome::AllSucceeded(1)));
    }

    #[test]
    fn poll_batch_keeps_waiting_on_empty_channel() {
        let mut app = MeshportApp::default();
        let (tx, rx) = std::sync::mpsc::channel::<Vec<ConversionResult>>();
        app.batch = Some(RunningBatch {
            format: OutputFormat::Ply,
            rx,
        });

        app.poll_batch();
        assert!(app.batch_running());
        assert!(app.log.is_empty());
        drop(tx);
    }

    #[test]
    fn reveal_command_is_platform_specific() {
        let command = reveal_command();
        assert!(["xdg-open", "open", "explorer"].contains(&command));
    }
}
