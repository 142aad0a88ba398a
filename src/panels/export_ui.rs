use egui::Ui;
use egui_phosphor::regular::EXPORT;

use super::panel_trait::{Panel, PanelState, ViewerData};
use crate::data::formats::EncoderFamily;
use crate::workflow::WorkflowState;

/// "Export plot as" submenu, one entry per installed bitmap encoder.
pub struct ExportPanel {
    pub state: PanelState,
}

impl Default for ExportPanel {
    fn default() -> Self {
        Self {
            state: PanelState::new("Export plot as", EXPORT),
        }
    }
}

impl Panel for ExportPanel {
    fn state(&self) -> &PanelState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut PanelState {
        &mut self.state
    }

    fn render_menu(&mut self, ui: &mut Ui, data: &mut ViewerData<'_>) {
        let enabled = data.workflow.state() == WorkflowState::Displaying
            && data.workflow.pending_export().is_none();
        let label = self.title_and_icon();
        let workflow = data.workflow;
        let requests = &mut *data.requests;
        ui.add_enabled_ui(enabled, |ui| {
            ui.menu_button(label, |ui| {
                let registry = workflow.registry();
                if registry.is_empty() {
                    ui.label("No encoders installed");
                    return;
                }
                for format in registry.formats_for(EncoderFamily::Bitmap) {
                    if ui
                        .button(format.name)
                        .on_hover_text(format.media_type)
                        .clicked()
                    {
                        requests.export = Some(*format);
                        ui.close();
                    }
                }
            });
        });
    }
}
