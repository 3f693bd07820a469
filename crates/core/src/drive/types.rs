//! Types for the Drive REST client.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Drive client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveConfig {
    /// OAuth bearer access token.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Base URL of the Drive v3 metadata API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the Drive v3 upload API.
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_url() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_url: default_api_url(),
            upload_url: default_upload_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// File metadata as returned by `files.list` / `files.get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<DateTime<Utc>>,
    /// Drive encodes int64 fields as strings.
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl DriveFile {
    /// Size in bytes, if Drive reported one.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref().and_then(|s| s.parse().ok())
    }

    /// Whether the file has an `image/*` mime type.
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// File extension used when staging the file locally.
    pub fn extension(&self) -> String {
        extension_for(&self.name, &self.mime_type)
    }
}

/// Extension from the file name, falling back to the mime type.
pub(crate) fn extension_for(name: &str, mime_type: &str) -> String {
    if let Some(ext) = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
    {
        return ext.to_ascii_lowercase();
    }

    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/heic" => "heic",
        _ => "bin",
    }
    .to_string()
}

/// One page of a `files.list` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Response of a metadata-only `files.create`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedFile {
    pub id: String,
}

/// Errors from the Drive REST API.
#[derive(Debug, Clone, Error)]
pub enum DriveError {
    #[error("Drive request timed out")]
    Timeout,

    #[error("Failed to connect to Drive: {0}")]
    ConnectionFailed(String),

    #[error("Drive rejected credentials: {0}")]
    Unauthorized(String),

    #[error("Drive file not found: {0}")]
    NotFound(String),

    #[error("Drive API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse Drive response: {0}")]
    Parse(String),

    #[error("I/O error on {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl DriveError {
    pub(crate) fn io(path: &Path, err: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionFailed(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
