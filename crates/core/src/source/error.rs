//! Error types for the source module.

use std::path::PathBuf;

use thiserror::Error;

use crate::drive::DriveError;

/// Errors that can occur while listing or fetching source items.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Filesystem error on the input location.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Remote listing or transfer failed.
    #[error("Drive error: {0}")]
    Drive(#[from] DriveError),
}

impl SourceError {
    /// Creates an I/O error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the operation may succeed next cycle without intervention.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io { source, .. } => matches!(
                source.kind(),
                std::io::ErrorKind::Interrupted | std::io::ErrorKind::TimedOut
            ),
            Self::Drive(e) => e.is_retryable(),
        }
    }
}
