use egui::{Context, Ui};
use egui_phosphor::regular::INFO;

use super::panel_trait::{Panel, PanelState, ViewerData};

pub struct AboutPanel {
    pub state: PanelState,
}

impl Default for AboutPanel {
    fn default() -> Self {
        Self {
            state: PanelState::new("About", INFO),
        }
    }
}

impl Panel for AboutPanel {
    fn state(&self) -> &PanelState {
        &self.state
    }
    fn state_mut(&mut self) -> &mut PanelState {
        &mut self.state
    }

    fn render_menu(&mut self, ui: &mut Ui, _data: &mut ViewerData<'_>) {
        if ui.button(self.title_and_icon()).clicked() {
            self.state.visible = true;
            ui.close();
        }
    }

    fn render_window(&mut self, ctx: &Context, _data: &mut ViewerData<'_>) {
        egui::Window::new(self.state.title)
            .open(&mut self.state.visible)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading("gnuplot viewer");
                ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                ui.label("A graphical front end to the gnuplot command line plotting tool.");
                ui.label("Open a script to render it; the plot is redrawn whenever the script changes.");
            });
    }
}
