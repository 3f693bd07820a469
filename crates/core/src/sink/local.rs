//! Local sink: the artifact stays where the composer wrote it.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use super::error::SinkError;
use super::traits::Sink;

#[derive(Debug, Clone, Default)]
pub struct LocalSink;

impl LocalSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sink for LocalSink {
    fn name(&self) -> &str {
        "local"
    }

    async fn publish(&self, artifact: &Path) -> Result<String, SinkError> {
        if !artifact.exists() {
            return Err(SinkError::ArtifactNotFound(artifact.to_path_buf()));
        }
        info!("Artifact available at {:?}", artifact);
        Ok(artifact.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_publish_returns_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("canvas.pdf");
        std::fs::write(&path, b"%PDF").unwrap();

        let id = LocalSink::new().publish(&path).await.unwrap();
        assert_eq!(id, path.to_string_lossy());
    }

    #[tokio::test]
    async fn test_publish_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let result = LocalSink::new().publish(&dir.path().join("nope.pdf")).await;
        assert!(matches!(result, Err(SinkError::ArtifactNotFound(_))));
    }
}
