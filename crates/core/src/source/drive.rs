//! Drive folder source.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::drive::{extension_for, DriveClient, DriveFile};

use super::error::SourceError;
use super::signature::remote_signature;
use super::traits::Source;
use super::types::SourceItem;

/// Images in a Drive folder.
///
/// Identity is the Drive file id; arrival order is the remote modification
/// time. Items are downloaded into a staging directory before processing.
pub struct DriveSource {
    client: Arc<DriveClient>,
    folder_id: String,
    staging_dir: PathBuf,
}

impl DriveSource {
    pub fn new(
        client: Arc<DriveClient>,
        folder_id: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            folder_id: folder_id.into(),
            staging_dir: staging_dir.into(),
        }
    }

    /// Local path an item is downloaded to.
    pub fn staging_path(&self, item: &SourceItem) -> PathBuf {
        let ext = extension_for(&item.name, item.mime_type.as_deref().unwrap_or_default());
        self.staging_dir
            .join(format!("gdrive_{}.{}", item.identity, ext))
    }
}

/// Converts listed Drive files into source items, keeping only images.
pub(crate) fn items_from_files(files: Vec<DriveFile>) -> Vec<SourceItem> {
    let mut items: Vec<SourceItem> = files
        .into_iter()
        .filter(DriveFile::is_image)
        .map(|file| {
            let size = file.size_bytes();
            SourceItem {
                signature: remote_signature(size, file.version.as_deref()),
                size: size.unwrap_or(0),
                arrival: file
                    .modified_time
                    .unwrap_or_else(|| DateTime::<Utc>::from(UNIX_EPOCH)),
                identity: file.id,
                name: file.name,
                mime_type: Some(file.mime_type),
            }
        })
        .collect();

    SourceItem::sort_by_arrival(&mut items);
    items
}

#[async_trait]
impl Source for DriveSource {
    fn name(&self) -> &str {
        "drive"
    }

    async fn list(&self) -> Result<Vec<SourceItem>, SourceError> {
        let files = self.client.list_folder(&self.folder_id).await?;
        Ok(items_from_files(files))
    }

    async fn size_of(&self, identity: &str) -> Result<Option<u64>, SourceError> {
        let file = self.client.get_file(identity).await?;
        Ok(file.map(|f| f.size_bytes().unwrap_or(0)))
    }

    async fn fetch_to_local(&self, item: &SourceItem) -> Result<Option<PathBuf>, SourceError> {
        let dest = self.staging_path(item);
        debug!("Downloading {} -> {:?}", item.identity, dest);
        let written = self.client.download(&item.identity, &dest).await?;
        Ok(written.map(|_| dest))
    }

    async fn release(&self, item: &SourceItem, local: &Path) -> Result<(), SourceError> {
        match tokio::fs::remove_file(local).await {
            Ok(()) => {
                debug!("Removed staged copy of {} at {:?}", item.identity, local);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SourceError::io(local, e)),
        }
    }

    fn is_remote(&self) -> bool {
        true
    }
}
