//! The native viewer application.
//!
//! | Sub-module  | Responsibility |
//! | ----------- | -------------- |
//! | [`update`]  | Per-frame event pumping, dialog polling, drops, menus and the central view |
//! | [`dialogs`] | File dialogs on helper threads |
//! | [`run`]     | Top-level [`run_viewer()`] entry point and icon loading |

mod dialogs;
mod run;
mod update;

pub use dialogs::{DialogPoll, FileDialogs};
pub use run::run_viewer;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ViewerConfig;
use crate::data::formats::EncoderRegistry;
use crate::events::OpenIntent;
use crate::panels::{AboutPanel, ExportPanel, FilePanel, PlotViewPanel, StatusPanel, ViewerRequests};
use crate::renderer::{GnuplotRenderer, Renderer};
use crate::workflow::PlotWorkflow;

/// Standalone viewer implementing [`eframe::App`].
pub struct ViewerApp {
    /// The state machine driving render, watch and export.
    pub workflow: PlotWorkflow,

    // ── Panels ───────────────────────────────────────────────────────────────
    pub file_panel: FilePanel,
    pub export_panel: ExportPanel,
    pub about_panel: AboutPanel,
    pub status_panel: StatusPanel,
    pub plot_view: PlotViewPanel,

    /// Requests raised by panels during the current frame.
    pub(crate) requests: ViewerRequests,
    pub(crate) dialogs: FileDialogs,

    /// Opened on the first frame, e.g. from the command line.
    pub(crate) initial_open: Option<OpenIntent>,
}

impl ViewerApp {
    pub fn new(config: &ViewerConfig) -> Self {
        let renderer: Arc<dyn Renderer> = Arc::new(GnuplotRenderer::new(config.renderer.clone()));
        Self::with_renderer(renderer, config)
    }

    pub fn with_renderer(renderer: Arc<dyn Renderer>, config: &ViewerConfig) -> Self {
        let workflow = PlotWorkflow::with_options(
            renderer,
            EncoderRegistry::installed().clone(),
            config.workflow_options(),
        );
        Self {
            workflow,
            file_panel: FilePanel::default(),
            export_panel: ExportPanel::default(),
            about_panel: AboutPanel::default(),
            status_panel: StatusPanel::default(),
            plot_view: PlotViewPanel::default(),
            requests: ViewerRequests::default(),
            dialogs: FileDialogs::default(),
            initial_open: None,
        }
    }

    /// Open something as soon as the window is up.
    pub fn open_on_start(mut self, intent: OpenIntent) -> Self {
        self.initial_open = Some(intent);
        self
    }

    /// Directory dialogs start in: next to the loaded script if any.
    pub(crate) fn dialog_start_dir(&self) -> Option<PathBuf> {
        self.workflow
            .source_path()
            .and_then(|p| p.parent())
            .map(|p| p.to_path_buf())
    }
}
