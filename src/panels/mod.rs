pub mod about_ui;
pub mod export_ui;
pub mod file_ui;
pub mod panel_trait;
pub mod plot_view_ui;
pub mod status_ui;

pub use about_ui::AboutPanel;
pub use export_ui::ExportPanel;
pub use file_ui::FilePanel;
pub use panel_trait::{Panel, PanelState, ViewerData, ViewerRequests};
pub use plot_view_ui::PlotViewPanel;
pub use status_ui::StatusPanel;
