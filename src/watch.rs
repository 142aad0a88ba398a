//! Change notification for the loaded script.
//!
//! A [`SourceWatch`] polls the file's metadata on a background thread and
//! posts a [`WatchNotification`] into the workflow inbox whenever it differs
//! from the last observation. The watch is scoped: dropping it stops and
//! joins the poller, after which no notification carrying its token is sent.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use crate::error::WorkflowError;
use crate::events::{WatchNotification, WatchOpcode, WatchToken, WorkflowEvent};

/// Metadata snapshot compared between polls.
#[derive(Clone, Debug, PartialEq, Eq)]
struct FileStamp {
    modified: Option<SystemTime>,
    len: u64,
    readonly: bool,
}

impl FileStamp {
    fn read(path: &Path) -> Option<Self> {
        let meta = fs::metadata(path).ok()?;
        Some(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
            readonly: meta.permissions().readonly(),
        })
    }
}

#[derive(Debug)]
pub struct SourceWatch {
    path: PathBuf,
    token: WatchToken,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SourceWatch {
    /// Start watching `path`. Fails if the file cannot be stat'ed right now.
    pub fn new(
        path: &Path,
        token: WatchToken,
        interval: Duration,
        tx: Sender<WorkflowEvent>,
    ) -> Result<Self, WorkflowError> {
        let Some(initial) = FileStamp::read(path) else {
            return Err(WorkflowError::NoSuchWatch {
                path: path.to_path_buf(),
            });
        };
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = stop.clone();
        let thread_path = path.to_path_buf();
        let handle = std::thread::Builder::new()
            .name(format!("watch-{}", token.0))
            .spawn(move || poll_loop(thread_path, token, interval, initial, tx, thread_stop))
            .map_err(|e| WorkflowError::file(path, e))?;
        log::debug!("watching {} (token {})", path.display(), token.0);
        Ok(Self {
            path: path.to_path_buf(),
            token,
            stop,
            handle: Some(handle),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> WatchToken {
        self.token
    }
}

impl Drop for SourceWatch {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::warn!("watch poller for {} panicked", self.path.display());
            }
        }
        log::debug!("stopped watching {} (token {})", self.path.display(), self.token.0);
    }
}

fn poll_loop(
    path: PathBuf,
    token: WatchToken,
    interval: Duration,
    initial: FileStamp,
    tx: Sender<WorkflowEvent>,
    stop: Arc<AtomicBool>,
) {
    let mut last = Some(initial);
    loop {
        std::thread::park_timeout(interval);
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let current = FileStamp::read(&path);
        if current == last {
            continue;
        }
        let opcode = match current {
            Some(_) => WatchOpcode::StatChanged,
            None => WatchOpcode::Removed,
        };
        last = current;
        // Checked again so nothing is posted once the owner started dropping us.
        if stop.load(Ordering::SeqCst) {
            break;
        }
        let event = WorkflowEvent::Watch(WatchNotification { token, opcode });
        if tx.send(event).is_err() {
            break;
        }
    }
}
