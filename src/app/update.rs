//! Per-frame logic of [`ViewerApp`].
//!
//! Each frame:
//!
//! 1. applies events posted by the watch and render threads,
//! 2. polls open file dialogs and feeds their results into the workflow,
//! 3. turns dropped files into open intents,
//! 4. draws the menu bar, status bar and central image,
//! 5. applies the requests panels raised while drawing.

use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;

use crate::data::export::split_target;
use crate::data::formats::ExportFormat;
use crate::events::OpenIntent;
use crate::panels::{Panel, ViewerData};

use super::{DialogPoll, ViewerApp};

/// Repaint cadence while idle, so watch notifications are applied promptly.
const IDLE_REPAINT: Duration = Duration::from_millis(200);
const BUSY_REPAINT: Duration = Duration::from_millis(50);

impl ViewerApp {
    pub(crate) fn open_intent(&mut self, intent: OpenIntent) {
        log::info!("opening {:?}", intent);
        // Failures are recorded as notices by the workflow.
        if let Err(e) = self.workflow.open(intent) {
            log::debug!("open failed: {e}");
        }
    }

    fn poll_dialogs(&mut self) {
        match self.dialogs.poll_script() {
            DialogPoll::Chosen(path) => self.open_intent(OpenIntent::Render(path)),
            DialogPoll::Cancelled => self.workflow.selection_cancelled(),
            DialogPoll::Closed | DialogPoll::Pending => {}
        }
        match self.dialogs.poll_image() {
            DialogPoll::Chosen(path) => self.open_intent(OpenIntent::Display(path)),
            DialogPoll::Cancelled => self.workflow.selection_cancelled(),
            DialogPoll::Closed | DialogPoll::Pending => {}
        }
        match self.dialogs.poll_export() {
            DialogPoll::Chosen(path) if !self.workflow.accepts_export_target() => {
                log::info!("export was dropped while its dialog was open; not writing {}", path.display());
            }
            DialogPoll::Chosen(path) => match split_target(&path) {
                Some((dir, filename)) => {
                    if let Err(e) = self.workflow.export_target_chosen(&dir, &filename) {
                        log::debug!("export of {} not completed: {e}", path.display());
                    }
                }
                None => self.workflow.export_cancelled(),
            },
            DialogPoll::Cancelled => self.workflow.export_cancelled(),
            DialogPoll::Closed | DialogPoll::Pending => {}
        }
    }

    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|f| f.path.clone())
                .collect()
        });
        if dropped.len() > 1 {
            log::info!("{} files dropped, opening the first", dropped.len());
        }
        if let Some(path) = dropped.into_iter().next() {
            self.open_intent(OpenIntent::for_dropped_file(path));
        }
    }

    fn apply_requests(&mut self, ctx: &egui::Context) {
        let req = self.requests.take();

        if req.open_script && self.workflow.request_new_plot().is_ok() {
            let dir = self.dialog_start_dir();
            if !self.dialogs.open_script(dir) {
                self.workflow.selection_cancelled();
            }
        }
        if req.load_image && self.workflow.request_image_load().is_ok() {
            let dir = self.dialog_start_dir();
            if !self.dialogs.open_image(dir) {
                self.workflow.selection_cancelled();
            }
        }
        if req.reload {
            if let Err(e) = self.workflow.reload() {
                log::debug!("reload ignored: {e}");
            }
        }
        if let Some(format) = req.export {
            if self.workflow.export_format_chosen(format) {
                let name = self.default_export_name(&format);
                if !self.dialogs.open_export(format, name) {
                    self.workflow.export_cancelled();
                }
            }
        }
        if req.quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    /// `<script stem>.<ext>`, or a timestamped name when nothing was rendered.
    fn default_export_name(&self, format: &ExportFormat) -> String {
        let stem = self
            .workflow
            .source_path()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("plot_{}", chrono::Local::now().format("%Y%m%d_%H%M%S")));
        format!("{stem}.{}", format.extension)
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(intent) = self.initial_open.take() {
            self.open_intent(intent);
        }
        self.workflow.process_events();
        self.poll_dialogs();
        self.handle_dropped_files(ctx);
        let hovering_files = ctx.input(|i| !i.raw.hovered_files.is_empty());

        self.plot_view.sync_texture(ctx, &self.workflow);

        let mut data = ViewerData {
            workflow: &self.workflow,
            requests: &mut self.requests,
        };

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                ui.menu_button("File", |ui| {
                    self.file_panel.render_menu(ui, &mut data);
                    ui.separator();
                    self.export_panel.render_menu(ui, &mut data);
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        data.requests.quit = true;
                        ui.close();
                    }
                });
                ui.menu_button("Help", |ui| {
                    self.about_panel.render_menu(ui, &mut data);
                });
            });
        });

        if self.status_panel.state().visible {
            egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
                self.status_panel.render_bar(ui, &mut data);
            });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.plot_view
                .render_panel(ui, data.workflow, hovering_files);
        });

        self.about_panel.render_window(ctx, &mut data);

        self.apply_requests(ctx);

        let busy = !self.workflow.state().is_stable() || self.dialogs.any_open();
        ctx.request_repaint_after(if busy { BUSY_REPAINT } else { IDLE_REPAINT });
    }
}
