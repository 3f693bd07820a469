//! Drive v3 REST client.

use std::path::Path;
use std::time::Duration;

use reqwest::{Client, Response};
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::types::{CreatedFile, DriveConfig, DriveError, DriveFile, FileList};

const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,modifiedTime,size,version)";
const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,size,version";
const PAGE_SIZE: &str = "1000";

/// Minimal Drive client: folder listing, metadata, download and upload.
pub struct DriveClient {
    client: Client,
    config: DriveConfig,
    token: String,
}

impl DriveClient {
    /// Creates a client from configuration. Requires an access token.
    pub fn new(config: DriveConfig) -> Result<Self, DriveError> {
        let token = config
            .access_token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| DriveError::Unauthorized("no access token configured".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DriveError::Client(e.to_string()))?;

        Ok(Self {
            client,
            config,
            token,
        })
    }

    fn api_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    fn upload_url(&self) -> &str {
        self.config.upload_url.trim_end_matches('/')
    }

    /// Lists every non-trashed file in a folder, following pagination.
    pub async fn list_folder(&self, folder_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let url = format!("{}/files", self.api_url());
        let query = folder_query(folder_id);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.token)
                .query(&params)
                .send()
                .await
                .map_err(map_transport)?;
            let page: FileList = check(response, folder_id)
                .await?
                .json()
                .await
                .map_err(|e| DriveError::Parse(e.to_string()))?;

            files.extend(page.files);
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }

        debug!("Listed {} files in Drive folder {}", files.len(), folder_id);
        Ok(files)
    }

    /// Fetches file metadata. Returns `None` if the file no longer exists.
    pub async fn get_file(&self, file_id: &str) -> Result<Option<DriveFile>, DriveError> {
        let url = format!("{}/files/{}", self.api_url(), file_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("fields", FILE_FIELDS)])
            .send()
            .await
            .map_err(map_transport)?;

        match check(response, file_id).await {
            Ok(response) => response
                .json()
                .await
                .map(Some)
                .map_err(|e| DriveError::Parse(e.to_string())),
            Err(DriveError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Downloads file content to `dest`. Returns `None` if the file no
    /// longer exists, otherwise the number of bytes written.
    pub async fn download(&self, file_id: &str, dest: &Path) -> Result<Option<u64>, DriveError> {
        let url = format!("{}/files/{}", self.api_url(), file_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .query(&[("alt", "media")])
            .send()
            .await
            .map_err(map_transport)?;

        let mut response = match check(response, file_id).await {
            Ok(response) => response,
            Err(DriveError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DriveError::io(parent, e))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| DriveError::io(dest, e))?;

        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(map_transport)? {
            file.write_all(&chunk)
                .await
                .map_err(|e| DriveError::io(dest, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| DriveError::io(dest, e))?;

        debug!("Downloaded {} ({} bytes) to {:?}", file_id, written, dest);
        Ok(Some(written))
    }

    /// Uploads a local file into a folder and returns the new file id.
    ///
    /// Creates the metadata first, then uploads the content to it.
    pub async fn upload(
        &self,
        path: &Path,
        folder_id: &str,
        mime_type: &str,
    ) -> Result<String, DriveError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact")
            .to_string();
        let content = tokio::fs::read(path)
            .await
            .map_err(|e| DriveError::io(path, e))?;

        let response = self
            .client
            .post(format!("{}/files", self.api_url()))
            .bearer_auth(&self.token)
            .query(&[("fields", "id")])
            .json(&json!({
                "name": name,
                "parents": [folder_id],
                "mimeType": mime_type,
            }))
            .send()
            .await
            .map_err(map_transport)?;
        let created: CreatedFile = check(response, folder_id)
            .await?
            .json()
            .await
            .map_err(|e| DriveError::Parse(e.to_string()))?;

        let response = self
            .client
            .patch(format!("{}/files/{}", self.upload_url(), created.id))
            .bearer_auth(&self.token)
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(content)
            .send()
            .await
            .map_err(map_transport)?;
        check(response, &created.id).await?;

        debug!("Uploaded {:?} to Drive as {}", path, created.id);
        Ok(created.id)
    }
}

/// Query selecting the non-trashed children of a folder.
pub(crate) fn folder_query(folder_id: &str) -> String {
    let escaped = folder_id.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}' in parents and trashed = false", escaped)
}

/// Maps a non-success HTTP status to a Drive error.
pub(crate) fn classify_status(status: u16, target: &str, body: &str) -> DriveError {
    match status {
        401 | 403 => DriveError::Unauthorized(truncate(body)),
        404 => DriveError::NotFound(target.to_string()),
        _ => DriveError::Api {
            status,
            message: truncate(body),
        },
    }
}

fn map_transport(e: reqwest::Error) -> DriveError {
    if e.is_timeout() {
        DriveError::Timeout
    } else if e.is_connect() {
        DriveError::ConnectionFailed(e.to_string())
    } else {
        DriveError::Api {
            status: e.status().map(|s| s.as_u16()).unwrap_or(0),
            message: e.to_string(),
        }
    }
}

async fn check(response: Response, target: &str) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status.as_u16(), target, &body))
}

fn truncate(body: &str) -> String {
    body.chars().take(200).collect()
}
