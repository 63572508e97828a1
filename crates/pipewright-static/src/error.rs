//! Stage and build errors.

use std::error::Error;
use std::io;
use std::path::PathBuf;

use pipewright_assets::TransformError;

/// Errors that end a single stage run.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("I/O error on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("Failed to transform {}", .path.display())]
    Transform {
        path: PathBuf,
        #[source]
        source: TransformError,
    },

    #[error("Invalid glob: {0}")]
    Glob(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl StageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StageError::Io {
            path: path.into(),
            source,
        }
    }
}

/// An error followed by each of its sources, joined by `: `.
pub fn error_chain(error: &dyn Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Errors that abort a build run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Stage '{stage}' failed")]
    Stage {
        stage: &'static str,
        #[source]
        source: StageError,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BuildError {
    /// Name of the stage that failed, if any.
    pub fn stage(&self) -> Option<&'static str> {
        match self {
            BuildError::Stage { stage, .. } => Some(*stage),
            BuildError::Config(_) => None,
        }
    }

    /// Stage failures are logged by the pipeline when they happen.
    pub fn is_logged(&self) -> bool {
        matches!(self, BuildError::Stage { .. })
    }
}
