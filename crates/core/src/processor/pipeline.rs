//! Pipeline runner implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::stage::{
    with_retry, ComposedArtifact, Composer, FailureKind, ImageStage, PdfComposer,
    RemoveBackgroundStage, ShadowStage, StageError,
};

use super::config::PipelineConfig;
use super::types::PipelineResult;

/// Error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// An image stage failed on one batch member.
    #[error("Stage {stage} failed on {input}: {source}")]
    Stage {
        stage: String,
        input: PathBuf,
        #[source]
        source: StageError,
    },

    /// Composition failed.
    #[error("Composition failed: {0}")]
    Compose(#[source] StageError),

    /// Batch has no members.
    #[error("Batch is empty")]
    EmptyBatch,

    /// Work directory could not be prepared.
    #[error("Failed to prepare work directory {path}: {source}")]
    WorkDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// Failure class of the underlying error.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Stage { source, .. } | Self::Compose(source) => source.kind(),
            Self::EmptyBatch => FailureKind::Fatal,
            Self::WorkDir { .. } => FailureKind::LocalIo,
        }
    }

    /// Whether the batch failed on a quota or rate limit.
    pub fn is_quota(&self) -> bool {
        match self {
            Self::Stage { source, .. } | Self::Compose(source) => source.is_quota(),
            _ => false,
        }
    }
}

/// Runs the fixed stage sequence over one batch.
///
/// Image stages run in order over every member; each call goes through the
/// retry policy so that transient failures are retried and everything else
/// aborts the batch immediately. The composer runs once, never retried.
pub struct PipelineRunner {
    config: PipelineConfig,
    stages: Vec<Arc<dyn ImageStage>>,
    composer: Arc<dyn Composer>,
}

impl PipelineRunner {
    /// Creates a runner from explicit stages.
    pub fn new(
        config: PipelineConfig,
        stages: Vec<Arc<dyn ImageStage>>,
        composer: Arc<dyn Composer>,
    ) -> Self {
        Self {
            config,
            stages,
            composer,
        }
    }

    /// Creates the standard runner: remove-background, add-shadow, PDF.
    pub fn from_config(config: PipelineConfig, output_dir: &Path) -> Result<Self, StageError> {
        let stages: Vec<Arc<dyn ImageStage>> = vec![
            Arc::new(RemoveBackgroundStage::new(&config.background)?),
            Arc::new(ShadowStage::new(config.shadow.clone())),
        ];
        let composer = Arc::new(PdfComposer::new(config.compose.clone(), output_dir));
        Ok(Self::new(config, stages, composer))
    }

    /// Names of the stages in execution order.
    pub fn stage_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.stages.iter().map(|s| s.name().to_string()).collect();
        names.push(self.composer.name().to_string());
        names
    }

    /// Runs the batch and returns the composed artifact.
    pub async fn run(
        &self,
        batch_id: &str,
        inputs: &[PathBuf],
    ) -> Result<PipelineResult, PipelineError> {
        if inputs.is_empty() {
            return Err(PipelineError::EmptyBatch);
        }
        let start = Instant::now();
        let batch_dir = self.config.work_dir.join(batch_id);

        info!("Batch {}: processing {} images", batch_id, inputs.len());

        let outcome = self.run_stages(batch_id, &batch_dir, inputs).await;

        // Removed whether or not the batch succeeded.
        if !self.config.keep_work_files {
            if let Err(e) = tokio::fs::remove_dir_all(&batch_dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to remove work directory {:?}: {}", batch_dir, e);
                }
            }
        }
        let artifact = outcome?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Batch {}: composed {:?} ({} pages) in {}ms",
            batch_id, artifact.path, artifact.pages, duration_ms
        );

        Ok(PipelineResult {
            batch_id: batch_id.to_string(),
            artifact: artifact.path,
            images: inputs.len(),
            pages: artifact.pages,
            duration_ms,
        })
    }

    async fn run_stages(
        &self,
        batch_id: &str,
        batch_dir: &Path,
        inputs: &[PathBuf],
    ) -> Result<ComposedArtifact, PipelineError> {
        let mut current = inputs.to_vec();
        for stage in &self.stages {
            let stage_dir = batch_dir.join(stage.name());
            tokio::fs::create_dir_all(&stage_dir)
                .await
                .map_err(|e| PipelineError::WorkDir {
                    path: stage_dir.clone(),
                    source: e,
                })?;

            let mut outputs = Vec::with_capacity(current.len());
            for (idx, input) in current.iter().enumerate() {
                let output = stage_dir.join(output_name(idx, &inputs[idx]));
                let label = format!("{} on {}", stage.name(), display_name(&inputs[idx]));
                let stage_ref: &dyn ImageStage = stage.as_ref();
                let input_ref: &Path = input;
                let output_ref: &Path = &output;

                with_retry(&self.config.retry, &label, move |_| {
                    stage_ref.process(input_ref, output_ref)
                })
                .await
                .map_err(|e| {
                    warn!("Batch {}: {} failed: {}", batch_id, label, e);
                    PipelineError::Stage {
                        stage: stage.name().to_string(),
                        input: inputs[idx].clone(),
                        source: e,
                    }
                })?;

                debug!("Batch {}: {} done", batch_id, label);
                outputs.push(output);
            }
            current = outputs;
        }

        self.composer
            .compose(&current)
            .await
            .map_err(PipelineError::Compose)
    }
}

/// Per-stage output file name: position prefix keeps same-stem inputs apart.
fn output_name(idx: usize, original: &Path) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("{:02}_{}.png", idx, stem)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
