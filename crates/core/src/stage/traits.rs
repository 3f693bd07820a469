//! Trait definitions for pipeline stages.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::StageError;

/// A per-image transformation step.
#[async_trait]
pub trait ImageStage: Send + Sync {
    /// Returns the name of this stage.
    fn name(&self) -> &str;

    /// Transforms `input`, writing the result to `output`.
    async fn process(&self, input: &Path, output: &Path) -> Result<(), StageError>;
}

/// Output of the compose step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedArtifact {
    pub path: PathBuf,
    pub pages: usize,
}

/// Lays out a batch of images into a single artifact.
#[async_trait]
pub trait Composer: Send + Sync {
    /// Returns the name of this composer.
    fn name(&self) -> &str {
        "compose-artifact"
    }

    /// Composes `images` in order into one artifact.
    async fn compose(&self, images: &[PathBuf]) -> Result<ComposedArtifact, StageError>;
}
