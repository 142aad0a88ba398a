//! Messages posted into the workflow inbox by background work.
//!
//! The workflow owns a single [`std::sync::mpsc`] inbox. Watch pollers and
//! render jobs hold clones of its sender and post [`WorkflowEvent`]s; the
//! dispatch thread drains them in
//! [`PlotWorkflow::process_events`](crate::workflow::PlotWorkflow::process_events).

use std::path::PathBuf;

use crate::error::WorkflowError;

/// Identifies one watch registration. A new token is issued per registration
/// so late notifications from a superseded watch can be told apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WatchToken(pub u64);

/// What happened to a watched file.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WatchOpcode {
    /// Content or metadata (mtime, size, permissions) changed.
    StatChanged,
    /// The file was deleted or moved away.
    Removed,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WatchNotification {
    pub token: WatchToken,
    pub opcode: WatchOpcode,
}

/// Sequence number of a render job.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RenderJobId(pub u64);

/// Result of one renderer run: the path of the produced image.
#[derive(Debug)]
pub struct RenderOutcome {
    pub job: RenderJobId,
    pub script: PathBuf,
    pub result: Result<PathBuf, WorkflowError>,
}

#[derive(Debug)]
pub enum WorkflowEvent {
    Watch(WatchNotification),
    RenderFinished(RenderOutcome),
}

/// Explicit intent attached to a chosen file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OpenIntent {
    /// Run the file through the renderer and display the output.
    Render(PathBuf),
    /// Decode and display the file as it is.
    Display(PathBuf),
}

impl OpenIntent {
    /// Classify a dropped file: readable image formats are displayed, anything
    /// else is treated as a script.
    pub fn for_dropped_file(path: PathBuf) -> Self {
        if crate::data::formats::readable_format_for_path(&path).is_some() {
            OpenIntent::Display(path)
        } else {
            OpenIntent::Render(path)
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            OpenIntent::Render(p) | OpenIntent::Display(p) => p,
        }
    }
}
