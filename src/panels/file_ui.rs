use egui::Ui;
use egui_phosphor::regular::{ARROW_CLOCKWISE, FOLDER_OPEN, IMAGE};

use super::panel_trait::{Panel, PanelState, ViewerData};

/// Entries of the File menu that pick what is displayed.
pub struct FilePanel {
    pub state: PanelState,
}

impl Default for FilePanel {
    fn default() -> Self {
        Self {
            state: PanelState::new("File", FOLDER_OPEN),
        }
    }
}

impl Panel for FilePanel {
    fn state(&self) -> &PanelState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut PanelState {
        &mut self.state
    }

    fn render_menu(&mut self, ui: &mut Ui, data: &mut ViewerData<'_>) {
        let stable = data.workflow.state().is_stable();
        if ui
            .add_enabled(stable, egui::Button::new(format!("{FOLDER_OPEN} Open script…")))
            .on_hover_text("Render a gnuplot script and watch it for changes")
            .clicked()
        {
            data.requests.open_script = true;
            ui.close();
        }
        if ui
            .add_enabled(stable, egui::Button::new(format!("{IMAGE} Load image…")))
            .on_hover_text("Show an already rendered image")
            .clicked()
        {
            data.requests.load_image = true;
            ui.close();
        }
        let can_reload = stable && data.workflow.source_path().is_some();
        if ui
            .add_enabled(can_reload, egui::Button::new(format!("{ARROW_CLOCKWISE} Reload")))
            .clicked()
        {
            data.requests.reload = true;
            ui.close();
        }
    }
}
