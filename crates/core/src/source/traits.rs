//! Trait definitions for ingestion sources.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::SourceError;
use super::types::SourceItem;

/// A location that new images appear in.
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the name of this source implementation.
    fn name(&self) -> &str;

    /// Lists the items currently available, oldest arrival first.
    ///
    /// Items whose metadata cannot be read (e.g. deleted mid-listing) are
    /// left out rather than reported as errors.
    async fn list(&self) -> Result<Vec<SourceItem>, SourceError>;

    /// Current size of an item, or `None` if it no longer exists.
    async fn size_of(&self, identity: &str) -> Result<Option<u64>, SourceError>;

    /// Makes the item available as a local file and returns its path,
    /// or `None` if it vanished since it was listed.
    async fn fetch_to_local(&self, item: &SourceItem) -> Result<Option<PathBuf>, SourceError>;

    /// Drops the local copy made by `fetch_to_local` once the batch is done
    /// with it. Sources that hand out their own files keep them.
    async fn release(&self, _item: &SourceItem, _local: &Path) -> Result<(), SourceError> {
        Ok(())
    }

    /// Whether identities are remote file ids, mirrored into
    /// `processed_drive_ids` on commit.
    fn is_remote(&self) -> bool {
        false
    }
}
