//! Invoking the external plotting tool.
//!
//! The renderer is a seam: the workflow only knows the [`Renderer`] trait,
//! [`GnuplotRenderer`] runs the real binary and tests substitute their own.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{SubprocessError, WorkflowError};
use crate::events::{RenderJobId, RenderOutcome, WorkflowEvent};

/// Turns a script into an image file.
pub trait Renderer: Send + Sync {
    /// Render `script` and return the path of the produced image.
    fn render(&self, script: &Path) -> Result<PathBuf, WorkflowError>;
}

impl<F> Renderer for F
where
    F: Fn(&Path) -> Result<PathBuf, WorkflowError> + Send + Sync,
{
    fn render(&self, script: &Path) -> Result<PathBuf, WorkflowError> {
        self(script)
    }
}

/// How to call the plotting binary.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Program name or path, looked up in `PATH`.
    pub program: String,
    /// Fixed name of the image the renderer writes, relative to the working directory.
    pub output_file: PathBuf,
    /// Working directory of the process; the current directory when `None`.
    pub working_dir: Option<PathBuf>,
    /// Optional terminal selected before the script runs, e.g. `pngcairo`.
    pub terminal: Option<String>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            program: "gnuplot".to_string(),
            output_file: PathBuf::from("outpic.png"),
            working_dir: None,
            terminal: None,
        }
    }
}

impl RendererConfig {
    /// Absolute-or-relative location of the rendered image.
    pub fn output_path(&self) -> PathBuf {
        match &self.working_dir {
            Some(dir) => dir.join(&self.output_file),
            None => self.output_file.clone(),
        }
    }
}

pub struct GnuplotRenderer {
    config: RendererConfig,
}

impl GnuplotRenderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Command line for rendering `script`, as an argument vector.
    ///
    /// Equivalent to `gnuplot -e 'set output "outpic.png"' <script>` but
    /// without a shell, so the script path is passed through verbatim.
    pub fn command(&self, script: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        if let Some(term) = &self.config.terminal {
            cmd.arg("-e").arg(format!("set terminal {term}"));
        }
        cmd.arg("-e")
            .arg(format!(
                "set output \"{}\"",
                self.config.output_file.display()
            ))
            .arg(script);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Renderer for GnuplotRenderer {
    fn render(&self, script: &Path) -> Result<PathBuf, WorkflowError> {
        let program = self.config.program.clone();
        log::info!("rendering {} with {}", script.display(), program);
        let produced = self.config.output_path();
        // A leftover from the previous run must not pass for this run's output.
        match std::fs::remove_file(&produced) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(WorkflowError::file(&produced, e)),
        }
        let output = self
            .command(script)
            .output()
            .map_err(|source| SubprocessError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(SubprocessError::Exit {
                program,
                code: output.status.code(),
                stderr,
            }
            .into());
        }
        // Stat before handing it back so a script that never sets a terminal
        // fails here rather than as a confusing decode error.
        std::fs::metadata(&produced).map_err(|e| WorkflowError::file(&produced, e))?;
        Ok(produced)
    }
}

/// Run one render on a worker thread and post the outcome to `tx`.
pub fn spawn_render(
    renderer: Arc<dyn Renderer>,
    job: RenderJobId,
    script: PathBuf,
    tx: Sender<WorkflowEvent>,
) {
    let spawned = std::thread::Builder::new()
        .name(format!("render-{}", job.0))
        .spawn({
            let tx = tx.clone();
            let script = script.clone();
            move || {
                let result = renderer.render(&script);
                let _ = tx.send(WorkflowEvent::RenderFinished(RenderOutcome {
                    job,
                    script,
                    result,
                }));
            }
        });
    if let Err(e) = spawned {
        log::warn!("could not start render thread: {e}");
        let result = Err(WorkflowError::file(&script, e));
        let _ = tx.send(WorkflowEvent::RenderFinished(RenderOutcome { job, script, result }));
    }
}
