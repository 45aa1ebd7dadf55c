//! Typed failures raised by the pipeline tasks.

use crate::pipeline::Task;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// The rates API answered with a failure status or an unusable body.
    /// `target` is the requested date, or the endpoint name for undated calls.
    #[error("Error fetching data for {target}: {message}")]
    Upstream {
        target: String,
        status: Option<u16>,
        message: String,
    },

    /// A local layout requirement did not hold; nothing was written.
    #[error("Precondition failed for {}: {reason}", path.display())]
    Precondition { path: PathBuf, reason: String },

    /// Object storage rejected or failed a read or write.
    #[error("Storage error for {key}: {source}")]
    Transport {
        key: String,
        #[source]
        source: object_store::Error,
    },

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parquet error at {}: {message}", path.display())]
    Codec { path: PathBuf, message: String },

    #[error("Task {task} expected {expected} as input")]
    Wiring { task: Task, expected: &'static str },
}

impl PipelineError {
    pub(crate) fn upstream(target: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Upstream {
            target: target.into(),
            status: None,
            message: message.into(),
        }
    }

    /// HTTP status reported by the rates API, if the failure carried one.
    pub fn status(&self) -> Option<u16> {
        match self {
            PipelineError::Upstream { status, .. } => *status,
            _ => None,
        }
    }
}
