//! Background removal through the PhotoRoom segmentation API.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use tracing::debug;

use super::config::BackgroundConfig;
use super::error::StageError;
use super::traits::ImageStage;

const STAGE: &str = "remove-background";

/// Sends each image to the segmentation endpoint and stores the PNG cut-out.
pub struct RemoveBackgroundStage {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RemoveBackgroundStage {
    pub fn new(config: &BackgroundConfig) -> Result<Self, StageError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| StageError::failed(STAGE, "API key not configured"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StageError::failed(STAGE, format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
        })
    }
}

fn map_transport(e: reqwest::Error) -> StageError {
    if e.is_timeout() {
        StageError::transient(STAGE, "request timed out")
    } else {
        StageError::transient(STAGE, e.to_string())
    }
}

#[async_trait]
impl ImageStage for RemoveBackgroundStage {
    fn name(&self) -> &str {
        STAGE
    }

    async fn process(&self, input: &Path, output: &Path) -> Result<(), StageError> {
        let bytes = tokio::fs::read(input).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StageError::InputNotFound {
                    stage: STAGE.to_string(),
                    path: input.to_path_buf(),
                }
            } else {
                StageError::io(STAGE, input, e)
            }
        })?;

        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let form = multipart::Form::new()
            .text("format", "png")
            .part("image_file", multipart::Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(map_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StageError::from_status(STAGE, status.as_u16(), &body));
        }

        let content = response.bytes().await.map_err(map_transport)?;
        tokio::fs::write(output, &content)
            .await
            .map_err(|e| StageError::io(STAGE, output, e))?;

        debug!("Removed background: {:?} -> {:?}", input, output);
        Ok(())
    }
}
