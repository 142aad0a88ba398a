//! The plot workflow state machine.
//!
//! [`PlotWorkflow`] coordinates picking a script, rendering it through the
//! external tool, displaying the result, re-rendering when the script changes
//! and exporting the displayed bitmap. It is UI independent: the GUI shell
//! calls the transition methods in response to menu actions, dialog results
//! and drops, and calls [`PlotWorkflow::process_events`] once per frame to
//! apply notifications posted by background work.
//!
//! | From                                   | Operation                 | To |
//! | -------------------------------------- | ------------------------- | -- |
//! | `Idle`, `Displaying`                   | `request_new_plot`        | `AwaitingScriptSelection` |
//! | `Idle`, `Displaying`                   | `request_image_load`      | `AwaitingImageSelection` |
//! | `AwaitingScriptSelection` (and drops)  | `script_chosen`           | `Rendering` |
//! | any                                    | `image_chosen`            | `Displaying` |
//! | `Rendering`                            | render finished           | `Displaying` / previous stable state |
//! | `Displaying`                           | source changed            | `Rendering` |
//! | `Displaying`                           | `export_format_chosen`    | `AwaitingExportTarget` |
//! | `AwaitingExportTarget`                 | `export_target_chosen`    | `Displaying` |

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::data::bitmap::RenderedImage;
use crate::data::export::{export_image, ExportReceipt, ExportRequest};
use crate::data::formats::{EncoderRegistry, ExportFormat};
use crate::data::source::SourceRef;
use crate::error::WorkflowError;
use crate::events::{
    OpenIntent, RenderJobId, RenderOutcome, WatchNotification, WatchOpcode, WatchToken,
    WorkflowEvent,
};
use crate::renderer::{spawn_render, Renderer};
use crate::watch::SourceWatch;

/// Notices kept for the status bar.
const MAX_NOTICES: usize = 64;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WorkflowState {
    /// No plot loaded.
    Idle,
    /// A chooser is open for a script to render.
    AwaitingScriptSelection,
    /// A chooser is open for an image to display as is.
    AwaitingImageSelection,
    /// The renderer is running.
    Rendering,
    /// An image is shown.
    Displaying,
    /// A save dialog is open for the chosen export format.
    AwaitingExportTarget,
}

impl WorkflowState {
    /// States the workflow rests in between user interactions.
    pub fn is_stable(self) -> bool {
        matches!(self, WorkflowState::Idle | WorkflowState::Displaying)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::AwaitingScriptSelection => "choosing a script",
            WorkflowState::AwaitingImageSelection => "choosing an image",
            WorkflowState::Rendering => "rendering",
            WorkflowState::Displaying => "displaying",
            WorkflowState::AwaitingExportTarget => "choosing an export target",
        };
        f.write_str(s)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A timestamped message for the user.
#[derive(Clone, Debug)]
pub struct Notice {
    pub at: DateTime<Local>,
    pub level: NoticeLevel,
    pub message: String,
}

/// Tunables of the workflow.
#[derive(Clone, Debug)]
pub struct WorkflowOptions {
    /// How often the script's metadata is polled for changes.
    pub watch_interval: Duration,
}

impl Default for WorkflowOptions {
    fn default() -> Self {
        Self {
            watch_interval: Duration::from_millis(250),
        }
    }
}

pub struct PlotWorkflow {
    state: WorkflowState,
    renderer: Arc<dyn Renderer>,
    registry: EncoderRegistry,
    options: WorkflowOptions,

    source: Option<SourceRef>,
    image: Option<RenderedImage>,
    /// Bumped whenever `image` is replaced.
    image_revision: u64,

    pending_export: Option<ExportFormat>,
    last_export: Option<ExportReceipt>,

    inbox_tx: Sender<WorkflowEvent>,
    inbox_rx: Receiver<WorkflowEvent>,
    next_token: u64,
    next_job: u64,
    current_job: Option<RenderJobId>,
    /// A change arrived while busy; render again once stable.
    rerender_queued: bool,
    /// The job in `current_job` was superseded; drop its result when it ends.
    discard_running: bool,

    last_render_error: Option<WorkflowError>,
    notices: VecDeque<Notice>,
}

impl PlotWorkflow {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self::with_options(
            renderer,
            EncoderRegistry::installed().clone(),
            WorkflowOptions::default(),
        )
    }

    pub fn with_options(
        renderer: Arc<dyn Renderer>,
        registry: EncoderRegistry,
        options: WorkflowOptions,
    ) -> Self {
        let (inbox_tx, inbox_rx) = channel();
        Self {
            state: WorkflowState::Idle,
            renderer,
            registry,
            options,
            source: None,
            image: None,
            image_revision: 0,
            pending_export: None,
            last_export: None,
            inbox_tx,
            inbox_rx,
            next_token: 0,
            next_job: 0,
            current_job: None,
            rerender_queued: false,
            discard_running: false,
            last_render_error: None,
            notices: VecDeque::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn image(&self) -> Option<&RenderedImage> {
        self.image.as_ref()
    }

    pub fn image_revision(&self) -> u64 {
        self.image_revision
    }

    /// Script currently loaded, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_ref().map(SourceRef::path)
    }

    /// Path of the active watch registration, if any.
    pub fn watched_path(&self) -> Option<&Path> {
        self.source
            .as_ref()
            .and_then(SourceRef::watch)
            .map(SourceWatch::path)
    }

    pub fn watch_token(&self) -> Option<WatchToken> {
        self.source
            .as_ref()
            .and_then(SourceRef::watch)
            .map(SourceWatch::token)
    }

    pub fn pending_export(&self) -> Option<&ExportFormat> {
        self.pending_export.as_ref()
    }

    /// Whether a save dialog result would be used. False once the export was
    /// dropped, e.g. by displaying a different image while the dialog was open.
    pub fn accepts_export_target(&self) -> bool {
        self.state == WorkflowState::AwaitingExportTarget && self.pending_export.is_some()
    }

    pub fn last_export(&self) -> Option<&ExportReceipt> {
        self.last_export.as_ref()
    }

    pub fn registry(&self) -> &EncoderRegistry {
        &self.registry
    }

    /// Error of the most recent failed render or load, if not yet taken.
    pub fn last_error(&self) -> Option<&WorkflowError> {
        self.last_render_error.as_ref()
    }

    pub fn take_error(&mut self) -> Option<WorkflowError> {
        self.last_render_error.take()
    }

    pub fn notices(&self) -> impl Iterator<Item = &Notice> + '_ {
        self.notices.iter()
    }

    pub fn latest_notice(&self) -> Option<&Notice> {
        self.notices.back()
    }

    /// Sender for posting events into the inbox, e.g. from custom watchers.
    pub fn event_sender(&self) -> Sender<WorkflowEvent> {
        self.inbox_tx.clone()
    }

    fn stable_state(&self) -> WorkflowState {
        if self.image.is_some() {
            WorkflowState::Displaying
        } else {
            WorkflowState::Idle
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // User-initiated transitions
    // ─────────────────────────────────────────────────────────────────────

    /// The user asked to open a script. The caller shows a chooser next.
    pub fn request_new_plot(&mut self) -> Result<(), WorkflowError> {
        self.expect_stable("opening a script")?;
        self.state = WorkflowState::AwaitingScriptSelection;
        Ok(())
    }

    /// The user asked to load an already rendered image.
    pub fn request_image_load(&mut self) -> Result<(), WorkflowError> {
        self.expect_stable("loading an image")?;
        self.state = WorkflowState::AwaitingImageSelection;
        Ok(())
    }

    /// A script or image chooser was dismissed without a choice.
    pub fn selection_cancelled(&mut self) {
        if matches!(
            self.state,
            WorkflowState::AwaitingScriptSelection | WorkflowState::AwaitingImageSelection
        ) {
            self.state = self.stable_state();
            self.start_queued_render();
        }
    }

    /// Dispatch a chosen file by its intent.
    pub fn open(&mut self, intent: OpenIntent) -> Result<(), WorkflowError> {
        match intent {
            OpenIntent::Render(path) => self.script_chosen(&path),
            OpenIntent::Display(path) => self.image_chosen(&path),
        }
    }

    /// Make `path` the loaded script, watch it and start rendering it.
    ///
    /// Accepted from the script chooser as well as from the stable states and
    /// while rendering (drops, command line). Only one renderer process runs at
    /// a time: a script chosen while rendering starts once the running job
    /// finishes, and that job's result is discarded.
    pub fn script_chosen(&mut self, path: &Path) -> Result<(), WorkflowError> {
        if matches!(
            self.state,
            WorkflowState::AwaitingImageSelection | WorkflowState::AwaitingExportTarget
        ) {
            return Err(self.invalid("rendering a script"));
        }

        let script = match std::fs::canonicalize(path)
            .and_then(|p| std::fs::File::open(&p).map(|_| p))
        {
            Ok(p) => p,
            Err(e) => {
                let err = WorkflowError::file(path, e);
                self.abandon_script_choice(&err);
                return Err(err);
            }
        };

        // Release the old subscription before installing the new one.
        self.source = None;
        self.next_token += 1;
        let token = WatchToken(self.next_token);
        let watch = match SourceWatch::new(
            &script,
            token,
            self.options.watch_interval,
            self.inbox_tx.clone(),
        ) {
            Ok(w) => w,
            Err(err) => {
                self.abandon_script_choice(&err);
                return Err(err);
            }
        };
        self.source = Some(SourceRef::new(script, Some(watch)));
        self.start_render();
        Ok(())
    }

    /// Display `path` as it is, bypassing the renderer.
    ///
    /// Accepted in every state; the result of a render in flight is dropped,
    /// as are a queued re-render and a pending export choice.
    pub fn image_chosen(&mut self, path: &Path) -> Result<(), WorkflowError> {
        match RenderedImage::load(path) {
            Ok(img) => {
                if self.current_job.is_some() {
                    self.discard_running = true;
                }
                self.rerender_queued = false;
                self.pending_export = None;
                self.set_image(img);
                self.state = WorkflowState::Displaying;
                log::info!("displaying {}", path.display());
                Ok(())
            }
            Err(err) => {
                if self.state == WorkflowState::AwaitingImageSelection {
                    self.state = self.stable_state();
                }
                self.report(&err);
                Err(err)
            }
        }
    }

    /// Render the loaded script again.
    pub fn reload(&mut self) -> Result<(), WorkflowError> {
        self.expect_stable("reloading")?;
        if self.source.is_none() {
            return Err(self.invalid("reloading without a script"));
        }
        self.start_render();
        Ok(())
    }

    /// The user picked an export format. Returns `false` when the choice was
    /// dropped because nothing is displayed or an export is already in flight.
    pub fn export_format_chosen(&mut self, format: ExportFormat) -> bool {
        if self.state != WorkflowState::Displaying || self.pending_export.is_some() {
            log::debug!("ignoring export format {} while {}", format.name, self.state);
            return false;
        }
        self.pending_export = Some(format);
        self.state = WorkflowState::AwaitingExportTarget;
        true
    }

    /// The save dialog returned a destination for the pending export.
    pub fn export_target_chosen(
        &mut self,
        dir: &Path,
        filename: &str,
    ) -> Result<ExportReceipt, WorkflowError> {
        if self.state != WorkflowState::AwaitingExportTarget {
            return Err(self.invalid("exporting"));
        }
        let Some(chosen) = self.pending_export.take() else {
            return Err(self.invalid("exporting without a format"));
        };
        self.state = self.stable_state();

        let result = self.export_current(chosen, dir, filename);
        match &result {
            Ok(receipt) => {
                self.push_notice(
                    NoticeLevel::Info,
                    format!("Exported {}", receipt.path.display()),
                );
                self.last_export = Some(receipt.clone());
            }
            Err(err) => {
                log::warn!("export failed: {err}");
                self.push_notice(NoticeLevel::Error, format!("Export failed: {err}"));
            }
        }
        self.start_queued_render();
        result
    }

    /// The save dialog was dismissed.
    pub fn export_cancelled(&mut self) {
        if self.state == WorkflowState::AwaitingExportTarget {
            self.pending_export = None;
            self.state = self.stable_state();
            self.start_queued_render();
        }
    }

    /// Release the watch and forget the script, e.g. on application exit.
    pub fn shutdown(&mut self) {
        self.source = None;
        self.discard_running = self.current_job.is_some();
        self.rerender_queued = false;
    }

    fn export_current(
        &self,
        chosen: ExportFormat,
        dir: &Path,
        filename: &str,
    ) -> Result<ExportReceipt, WorkflowError> {
        let format = *self.registry.find(chosen.encoder, chosen.id)?;
        let Some(image) = &self.image else {
            return Err(WorkflowError::InvalidState {
                operation: "exporting without an image",
                state: self.state,
            });
        };
        export_image(image, &ExportRequest::new(dir, filename, format))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inbox
    // ─────────────────────────────────────────────────────────────────────

    /// Apply every event posted so far. Returns how many were handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbox_rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait up to `timeout` for at least one event, then apply everything
    /// that is queued.
    pub fn process_events_timeout(&mut self, timeout: Duration) -> usize {
        match self.inbox_rx.recv_timeout(timeout) {
            Ok(event) => {
                self.handle_event(event);
                1 + self.process_events()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Process events until the workflow leaves `Rendering` or `timeout` passes.
    pub fn wait_for_render(&mut self, timeout: Duration) -> WorkflowState {
        let deadline = Instant::now() + timeout;
        while self.state == WorkflowState::Rendering {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.process_events_timeout(deadline - now);
        }
        self.state
    }

    pub fn handle_event(&mut self, event: WorkflowEvent) {
        match event {
            WorkflowEvent::Watch(n) => self.on_watch(n),
            WorkflowEvent::RenderFinished(outcome) => self.on_render_finished(outcome),
        }
    }

    fn on_watch(&mut self, n: WatchNotification) {
        if self.watch_token() != Some(n.token) {
            log::debug!("dropping notification of superseded watch {}", n.token.0);
            return;
        }
        match n.opcode {
            WatchOpcode::StatChanged => {}
            WatchOpcode::Removed => {
                if let Some(p) = self.source_path() {
                    log::info!("{} was removed; keeping the current plot", p.display());
                }
                return;
            }
        }
        if self.state.is_stable() {
            log::info!("script changed, re-rendering");
            self.start_render();
        } else {
            self.rerender_queued = true;
        }
    }

    fn on_render_finished(&mut self, outcome: RenderOutcome) {
        if self.current_job != Some(outcome.job) {
            log::debug!("discarding result of superseded render {}", outcome.job.0);
            return;
        }
        self.current_job = None;
        let replaced = std::mem::take(&mut self.discard_running)
            || self.source_path() != Some(outcome.script.as_path());
        if replaced {
            log::debug!("discarding render of {}", outcome.script.display());
            self.renderer_freed();
            return;
        }
        let loaded = outcome
            .result
            .and_then(|produced| RenderedImage::load(&produced));
        match loaded {
            Ok(img) => {
                log::info!("rendered {}", outcome.script.display());
                self.set_image(img);
                self.last_render_error = None;
                self.state = WorkflowState::Displaying;
            }
            Err(err) => {
                self.abort_to_stable(&err);
                self.last_render_error = Some(err);
            }
        }
        self.start_queued_render();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────

    /// Start rendering the loaded script.
    ///
    /// The renderer always writes the same output file, so at most one job
    /// runs at a time. While one is running the new render is queued and the
    /// running job's result is discarded.
    fn start_render(&mut self) {
        let Some(script) = self.source.as_ref().map(|s| s.path().to_path_buf()) else {
            return;
        };
        if self.current_job.is_some() {
            log::debug!("renderer busy, queueing {}", script.display());
            self.discard_running = true;
            self.rerender_queued = true;
            self.state = WorkflowState::Rendering;
            return;
        }
        self.next_job += 1;
        let job = RenderJobId(self.next_job);
        self.current_job = Some(job);
        self.rerender_queued = false;
        self.state = WorkflowState::Rendering;
        spawn_render(self.renderer.clone(), job, script, self.inbox_tx.clone());
    }

    /// A discarded job ended: run what was queued behind it.
    fn renderer_freed(&mut self) {
        if self.state == WorkflowState::Rendering {
            if self.rerender_queued && self.source.is_some() {
                self.start_render();
            } else {
                self.state = self.stable_state();
            }
        } else {
            self.start_queued_render();
        }
    }

    fn start_queued_render(&mut self) {
        if self.rerender_queued && self.state.is_stable() && self.source.is_some() {
            self.start_render();
        }
    }

    fn set_image(&mut self, img: RenderedImage) {
        self.image = Some(img);
        self.image_revision += 1;
    }

    fn report(&mut self, err: &WorkflowError) {
        log::warn!("{err}");
        self.push_notice(NoticeLevel::Error, err.to_string());
    }

    /// Return to the last stable state after a failed operation.
    fn abort_to_stable(&mut self, err: &WorkflowError) {
        self.report(err);
        self.state = self.stable_state();
    }

    /// A chosen script could not be opened. A render still in flight keeps
    /// running; otherwise fall back to the stable state.
    fn abandon_script_choice(&mut self, err: &WorkflowError) {
        self.report(err);
        if self.state == WorkflowState::AwaitingScriptSelection {
            self.state = self.stable_state();
        }
    }

    fn expect_stable(&self, operation: &'static str) -> Result<(), WorkflowError> {
        if self.state.is_stable() {
            Ok(())
        } else {
            Err(self.invalid(operation))
        }
    }

    fn invalid(&self, operation: &'static str) -> WorkflowError {
        log::debug!("{operation} rejected while {}", self.state);
        WorkflowError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn push_notice(&mut self, level: NoticeLevel, message: String) {
        if self.notices.len() == MAX_NOTICES {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            at: Local::now(),
            level,
            message,
        });
    }
}
