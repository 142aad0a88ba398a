//! File dialogs run on helper threads so the UI keeps drawing while they are
//! open. Each dialog kind has at most one instance live; results are polled
//! once per frame.

use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};

use crate::data::formats::ExportFormat;

/// Script file extensions offered first in the open dialog.
const SCRIPT_EXTENSIONS: &[&str] = &["gp", "gnuplot", "gnu", "plt", "plot"];
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp", "tga", "qoi", "pnm", "ppm"];

pub fn spawn_file_dialog_thread<F, T>(f: F) -> std::thread::JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    std::thread::spawn(f)
}

/// Outcome of polling a dialog.
#[derive(Debug, PartialEq, Eq)]
pub enum DialogPoll<T> {
    /// No dialog of this kind is open.
    Closed,
    /// Still open.
    Pending,
    /// The user chose something.
    Chosen(T),
    /// The user dismissed the dialog.
    Cancelled,
}

#[derive(Default)]
pub struct FileDialogs {
    script_rx: Option<Receiver<Option<PathBuf>>>,
    image_rx: Option<Receiver<Option<PathBuf>>>,
    export_rx: Option<Receiver<Option<PathBuf>>>,
}

impl FileDialogs {
    pub fn any_open(&self) -> bool {
        self.script_rx.is_some() || self.image_rx.is_some() || self.export_rx.is_some()
    }

    pub fn open_script(&mut self, start_dir: Option<PathBuf>) -> bool {
        if self.script_rx.is_some() {
            return false;
        }
        let (tx, rx) = mpsc::channel();
        self.script_rx = Some(rx);
        spawn_file_dialog_thread(move || {
            let mut dialog = rfd::FileDialog::new()
                .set_title("Open gnuplot script")
                .add_filter("gnuplot scripts", SCRIPT_EXTENSIONS)
                .add_filter("All files", &["*"]);
            if let Some(dir) = start_dir {
                dialog = dialog.set_directory(dir);
            }
            let _ = tx.send(dialog.pick_file());
        });
        true
    }

    pub fn open_image(&mut self, start_dir: Option<PathBuf>) -> bool {
        if self.image_rx.is_some() {
            return false;
        }
        let (tx, rx) = mpsc::channel();
        self.image_rx = Some(rx);
        spawn_file_dialog_thread(move || {
            let mut dialog = rfd::FileDialog::new()
                .set_title("Load plot image")
                .add_filter("Images", IMAGE_EXTENSIONS);
            if let Some(dir) = start_dir {
                dialog = dialog.set_directory(dir);
            }
            let _ = tx.send(dialog.pick_file());
        });
        true
    }

    /// Open a save dialog pre-bound to `format`. Refused while one is open.
    pub fn open_export(&mut self, format: ExportFormat, default_name: String) -> bool {
        if self.export_rx.is_some() {
            return false;
        }
        let (tx, rx) = mpsc::channel();
        self.export_rx = Some(rx);
        spawn_file_dialog_thread(move || {
            let file = rfd::FileDialog::new()
                .set_title(format!("Export plot as {}", format.name))
                .add_filter(format.name, &[format.extension])
                .set_file_name(default_name)
                .save_file();
            let _ = tx.send(file);
        });
        true
    }

    pub fn poll_script(&mut self) -> DialogPoll<PathBuf> {
        poll(&mut self.script_rx)
    }

    pub fn poll_image(&mut self) -> DialogPoll<PathBuf> {
        poll(&mut self.image_rx)
    }

    pub fn poll_export(&mut self) -> DialogPoll<PathBuf> {
        poll(&mut self.export_rx)
    }
}

fn poll(slot: &mut Option<Receiver<Option<PathBuf>>>) -> DialogPoll<PathBuf> {
    let result = match slot {
        Some(rx) => rx.try_recv(),
        None => return DialogPoll::Closed,
    };
    match result {
        Ok(choice) => {
            *slot = None;
            match choice {
                Some(path) => DialogPoll::Chosen(path),
                None => DialogPoll::Cancelled,
            }
        }
        Err(TryRecvError::Empty) => DialogPoll::Pending,
        Err(TryRecvError::Disconnected) => {
            *slot = None;
            DialogPoll::Cancelled
        }
    }
}
