//! Error types shared by the plot workflow and its collaborators.

use std::path::PathBuf;

use crate::data::formats::{EncoderId, FormatId};

/// Failure of the external renderer process.
#[derive(thiserror::Error, Debug)]
pub enum SubprocessError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with {}{}", describe_code(*code), describe_stderr(stderr))]
    Exit {
        program: String,
        /// `None` when the process was terminated by a signal.
        code: Option<i32>,
        stderr: String,
    },
}

fn describe_code(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

fn describe_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!(": {trimmed}")
    }
}

/// Everything that can abort a workflow operation.
///
/// None of these are fatal to the application; the workflow returns to its
/// last stable state and records the error as a notice.
#[derive(thiserror::Error, Debug)]
pub enum WorkflowError {
    #[error("cannot access {}: {source}", path.display())]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("renderer failed: {0}")]
    SubprocessFailure(#[from] SubprocessError),
    #[error("no installed encoder {encoder} for format {format}")]
    EncoderUnavailable { encoder: EncoderId, format: FormatId },
    #[error("cannot watch {}: file does not exist", path.display())]
    NoSuchWatch { path: PathBuf },
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot encode {}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("{operation} is not possible while {state}")]
    InvalidState {
        operation: &'static str,
        state: crate::workflow::WorkflowState,
    },
}

impl WorkflowError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileUnavailable {
            path: path.into(),
            source,
        }
    }
}
