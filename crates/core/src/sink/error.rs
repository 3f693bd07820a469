//! Error types for sinks.

use std::path::PathBuf;

use thiserror::Error;

use crate::drive::DriveError;

/// Errors that can occur while publishing an artifact.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The artifact does not exist.
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    /// Upload failed.
    #[error("Upload failed: {0}")]
    Drive(#[from] DriveError),
}
