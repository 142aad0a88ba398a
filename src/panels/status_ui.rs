//! Bottom status bar: workflow state, loaded script and the latest notice.

use egui::{Color32, Ui};
use egui_phosphor::regular::WARNING;

use super::panel_trait::{Panel, PanelState, ViewerData};
use crate::workflow::{NoticeLevel, WorkflowState};

pub struct StatusPanel {
    pub state: PanelState,
}

impl Default for StatusPanel {
    fn default() -> Self {
        let mut state = PanelState::new("Status", WARNING);
        state.visible = true;
        Self { state }
    }
}

impl StatusPanel {
    pub fn render_bar(&mut self, ui: &mut Ui, data: &mut ViewerData<'_>) {
        let wf = data.workflow;
        ui.horizontal(|ui| {
            if wf.state() == WorkflowState::Rendering {
                ui.spinner();
            }
            ui.label(capitalize(&wf.state().to_string()));
            if let Some(script) = wf.source_path() {
                ui.separator();
                ui.label(script.display().to_string())
                    .on_hover_text("Re-rendered automatically when it changes");
            }
            if let Some((w, h)) = wf.image().map(|i| i.dimensions()) {
                ui.separator();
                ui.label(format!("{w} × {h}"));
            }
            if let Some(notice) = wf.latest_notice() {
                ui.separator();
                let text = format!("{} {}", notice.at.format("%H:%M:%S"), notice.message);
                match notice.level {
                    NoticeLevel::Error => {
                        ui.colored_label(Color32::LIGHT_RED, format!("{WARNING} {text}"));
                    }
                    NoticeLevel::Info => {
                        ui.label(text);
                    }
                }
            }
        });
    }
}

impl Panel for StatusPanel {
    fn state(&self) -> &PanelState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut PanelState {
        &mut self.state
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
