//! Mock pipeline stages for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::stage::{ComposedArtifact, Composer, ImageStage, StageError};

type ErrorFactory = Arc<dyn Fn() -> StageError + Send + Sync>;

/// Mock implementation of the ImageStage trait.
///
/// Writes the input file name into the output file without reading the
/// input, so it works with paths that do not exist on disk.
pub struct MockStage {
    name: String,
    /// Inputs seen, in call order, including failed calls.
    calls: Arc<RwLock<Vec<PathBuf>>>,
    /// 1-based call number that fails, with its error.
    fail_on_call: Arc<RwLock<Option<(usize, StageError)>>>,
    /// Remaining failures for the leading calls.
    fail_times: Arc<RwLock<Option<(usize, ErrorFactory)>>>,
}

impl std::fmt::Debug for MockStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockStage").field("name", &self.name).finish()
    }
}

impl MockStage {
    /// Create a mock stage with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            calls: Arc::new(RwLock::new(Vec::new())),
            fail_on_call: Arc::new(RwLock::new(None)),
            fail_times: Arc::new(RwLock::new(None)),
        }
    }

    /// Fail the `n`th call (1-based) with `error`.
    pub async fn fail_on_call(&self, n: usize, error: StageError) {
        *self.fail_on_call.write().await = Some((n, error));
    }

    /// Fail the next `times` calls with errors built by `make`.
    pub async fn fail_times<F>(&self, times: usize, make: F)
    where
        F: Fn() -> StageError + Send + Sync + 'static,
    {
        *self.fail_times.write().await = Some((times, Arc::new(make)));
    }

    /// Inputs seen so far.
    pub async fn calls(&self) -> Vec<PathBuf> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl ImageStage for MockStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn process(&self, input: &Path, output: &Path) -> Result<(), StageError> {
        let call = {
            let mut calls = self.calls.write().await;
            calls.push(input.to_path_buf());
            calls.len()
        };

        {
            let mut fail_on_call = self.fail_on_call.write().await;
            if matches!(fail_on_call.as_ref(), Some((n, _)) if *n == call) {
                if let Some((_, error)) = fail_on_call.take() {
                    return Err(error);
                }
            }
        }

        {
            let mut fail_times = self.fail_times.write().await;
            if let Some((remaining, make)) = fail_times.as_mut() {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(make());
                }
            }
        }

        let marker = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        tokio::fs::write(output, marker)
            .await
            .map_err(|e| StageError::io(&self.name, output, e))
    }
}

/// Mock implementation of the Composer trait.
///
/// Writes `canvas_<n>.pdf` into its output directory and records the
/// inputs of every composition.
#[derive(Debug)]
pub struct MockComposer {
    output_dir: PathBuf,
    compositions: Arc<RwLock<Vec<Vec<PathBuf>>>>,
    next_error: Arc<RwLock<Option<StageError>>>,
}

impl MockComposer {
    /// Create a mock composer writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            compositions: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Configure the next composition to fail with the given error.
    pub async fn set_next_error(&self, error: StageError) {
        *self.next_error.write().await = Some(error);
    }

    /// Inputs of every successful composition.
    pub async fn compositions(&self) -> Vec<Vec<PathBuf>> {
        self.compositions.read().await.clone()
    }
}

#[async_trait]
impl Composer for MockComposer {
    async fn compose(&self, images: &[PathBuf]) -> Result<ComposedArtifact, StageError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let index = {
            let mut compositions = self.compositions.write().await;
            compositions.push(images.to_vec());
            compositions.len()
        };

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| StageError::io(self.name(), &self.output_dir, e))?;
        let path = self.output_dir.join(format!("canvas_{}.pdf", index));
        tokio::fs::write(&path, b"%PDF-1.3 mock")
            .await
            .map_err(|e| StageError::io(self.name(), &path, e))?;

        Ok(ComposedArtifact {
            path,
            pages: images.len().div_ceil(9),
        })
    }
}
