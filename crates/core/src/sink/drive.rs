//! Drive sink: uploads artifacts into a Drive folder.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::drive::DriveClient;

use super::error::SinkError;
use super::traits::Sink;

const PDF_MIME: &str = "application/pdf";

pub struct DriveSink {
    client: Arc<DriveClient>,
    folder_id: String,
}

impl DriveSink {
    pub fn new(client: Arc<DriveClient>, folder_id: impl Into<String>) -> Self {
        Self {
            client,
            folder_id: folder_id.into(),
        }
    }
}

#[async_trait]
impl Sink for DriveSink {
    fn name(&self) -> &str {
        "drive"
    }

    async fn publish(&self, artifact: &Path) -> Result<String, SinkError> {
        if !artifact.exists() {
            return Err(SinkError::ArtifactNotFound(artifact.to_path_buf()));
        }
        let id = self
            .client
            .upload(artifact, &self.folder_id, PDF_MIME)
            .await?;
        info!("Uploaded {:?} to Drive folder {} as {}", artifact, self.folder_id, id);
        Ok(id)
    }
}
