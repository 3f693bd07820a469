//! Mock sink for testing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::drive::DriveError;
use crate::sink::{Sink, SinkError};

/// Mock implementation of the Sink trait.
#[derive(Debug, Default)]
pub struct MockSink {
    published: Arc<RwLock<Vec<PathBuf>>>,
    fail_next: Arc<RwLock<bool>>,
}

impl MockSink {
    /// Create a new mock sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next publish fail with a connection error.
    pub async fn fail_next(&self) {
        *self.fail_next.write().await = true;
    }

    /// Artifacts published so far.
    pub async fn published(&self) -> Vec<PathBuf> {
        self.published.read().await.clone()
    }
}

#[async_trait]
impl Sink for MockSink {
    fn name(&self) -> &str {
        "mock"
    }

    async fn publish(&self, artifact: &Path) -> Result<String, SinkError> {
        if std::mem::take(&mut *self.fail_next.write().await) {
            return Err(DriveError::ConnectionFailed("mock upload failure".to_string()).into());
        }
        self.published.write().await.push(artifact.to_path_buf());
        Ok(format!(
            "mock://{}",
            artifact
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        ))
    }
}
