//! gnuplot-viewer crate root: re-exports and module wiring.
//!
//! A desktop front end to the gnuplot command line tool. The modules split
//! into a UI independent core and the egui/eframe shell:
//! - `workflow`: the state machine tying render, watch and export together
//! - `renderer`: invoking the external plotting binary
//! - `watch`: change notification for the loaded script
//! - `data`: bitmap, encoder registry, export and source reference types
//! - `config`: persisted settings
//! - `app` / `panels`: the native window, menus and views

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod panels;
pub mod renderer;
pub mod watch;
pub mod workflow;

// Public re-exports for a compact external API
pub use app::{run_viewer, ViewerApp};
pub use config::{ConfigError, ViewerConfig};
pub use data::bitmap::RenderedImage;
pub use data::export::{export_image, ExportReceipt, ExportRequest};
pub use data::formats::{EncoderFamily, EncoderId, EncoderRegistry, ExportFormat, FormatId};
pub use error::{SubprocessError, WorkflowError};
pub use events::{OpenIntent, WatchOpcode, WatchToken, WorkflowEvent};
pub use renderer::{GnuplotRenderer, Renderer, RendererConfig};
pub use workflow::{PlotWorkflow, WorkflowOptions, WorkflowState};
