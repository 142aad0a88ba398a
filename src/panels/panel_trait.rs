use egui::{Context, Ui};

use crate::data::formats::ExportFormat;
use crate::workflow::PlotWorkflow;

#[derive(Debug, Clone, Copy)]
pub struct PanelState {
    pub title: &'static str,
    pub icon: Option<&'static str>,
    pub visible: bool,
}

impl PanelState {
    pub fn new(title: &'static str, icon: &'static str) -> Self {
        Self {
            title,
            icon: Some(icon),
            visible: false,
        }
    }
}

/// Actions requested by panels during one frame, applied by the app afterwards.
#[derive(Debug, Default, Clone)]
pub struct ViewerRequests {
    pub open_script: bool,
    pub load_image: bool,
    pub reload: bool,
    pub export: Option<ExportFormat>,
    pub quit: bool,
}

impl ViewerRequests {
    pub fn take(&mut self) -> ViewerRequests {
        std::mem::take(self)
    }
}

/// View handed to panels: read access to the workflow plus the request sink.
pub struct ViewerData<'a> {
    pub workflow: &'a PlotWorkflow,
    pub requests: &'a mut ViewerRequests,
}

pub trait Panel {
    fn state(&self) -> &PanelState;
    fn state_mut(&mut self) -> &mut PanelState;

    fn title(&self) -> &'static str {
        self.state().title
    }

    fn icon_only(&self) -> Option<&'static str> {
        self.state().icon
    }

    fn title_and_icon(&self) -> String {
        match self.icon_only() {
            Some(icon) => format!("{icon} {}", self.title()),
            None => self.title().to_string(),
        }
    }

    // Optional hooks with default empty impls
    fn render_menu(&mut self, _ui: &mut Ui, _data: &mut ViewerData<'_>) {}
    fn render_window(&mut self, _ctx: &Context, _data: &mut ViewerData<'_>) {}
}
