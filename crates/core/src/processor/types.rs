//! Types for the processor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of a successful pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Batch identifier.
    pub batch_id: String,
    /// Path of the composed artifact.
    pub artifact: PathBuf,
    /// Number of images in the artifact.
    pub images: usize,
    /// Number of pages in the artifact.
    pub pages: usize,
    /// Wall time of the run in milliseconds.
    pub duration_ms: u64,
}
