//! Local directory source.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use super::error::SourceError;
use super::signature::{arrival_time, local_signature};
use super::traits::Source;
use super::types::SourceItem;

/// File extensions recognised as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Whether the path has an image extension.
pub fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// Images placed directly in a local directory.
///
/// Identity is the file path; arrival order is creation time.
#[derive(Debug, Clone)]
pub struct LocalDirectorySource {
    dir: PathBuf,
}

impl LocalDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Describes a single file as a source item.
    ///
    /// Returns `None` if the file does not exist or is not a regular file.
    pub async fn describe(path: &Path) -> Option<SourceItem> {
        let meta = fs::metadata(path).await.ok()?;
        if !meta.is_file() {
            return None;
        }

        Some(SourceItem {
            identity: path.to_string_lossy().into_owned(),
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: meta.len(),
            signature: local_signature(&meta),
            arrival: arrival_time(&meta),
            mime_type: None,
        })
    }
}

#[async_trait]
impl Source for LocalDirectorySource {
    fn name(&self) -> &str {
        "local"
    }

    async fn list(&self) -> Result<Vec<SourceItem>, SourceError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Input directory {:?} does not exist", self.dir);
                return Ok(Vec::new());
            }
            Err(e) => return Err(SourceError::io(&self.dir, e)),
        };

        let mut items = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SourceError::io(&self.dir, e))?
        {
            let path = entry.path();
            if !is_image_path(&path) {
                continue;
            }
            match Self::describe(&path).await {
                Some(item) => items.push(item),
                None => debug!("Skipping {:?}: vanished or not a regular file", path),
            }
        }

        SourceItem::sort_by_arrival(&mut items);
        Ok(items)
    }

    async fn size_of(&self, identity: &str) -> Result<Option<u64>, SourceError> {
        match fs::metadata(identity).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SourceError::io(identity, e)),
        }
    }

    async fn fetch_to_local(&self, item: &SourceItem) -> Result<Option<PathBuf>, SourceError> {
        let path = PathBuf::from(&item.identity);
        match fs::try_exists(&path).await {
            Ok(true) => Ok(Some(path)),
            Ok(false) => Ok(None),
            Err(e) => Err(SourceError::io(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_image_path() {
        assert!(is_image_path(Path::new("a.jpg")));
        assert!(is_image_path(Path::new("a.JPEG")));
        assert!(is_image_path(Path::new("/x/y/a.Png")));
        assert!(is_image_path(Path::new("a.webp")));
        assert!(!is_image_path(Path::new("a.gif")));
        assert!(!is_image_path(Path::new("notes.txt")));
        assert!(!is_image_path(Path::new("jpg")));
    }

    #[tokio::test]
    async fn test_list_filters_non_images() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        std::fs::write(dir.path().join("b.txt"), b"b").unwrap();
        std::fs::create_dir(dir.path().join("sub.png")).unwrap();

        let source = LocalDirectorySource::new(dir.path());
        let items = source.list().await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "a.jpg");
        assert_eq!(items[0].size, 1);
        assert!(!items[0].signature.is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = LocalDirectorySource::new(dir.path().join("missing"));
        assert!(source.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_is_ordered() {
        let dir = TempDir::new().unwrap();
        for name in ["c.jpg", "a.jpg", "b.png"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }

        let items = LocalDirectorySource::new(dir.path()).list().await.unwrap();

        assert_eq!(items.len(), 3);
        for pair in items.windows(2) {
            assert!(
                (pair[0].arrival, &pair[0].identity) <= (pair[1].arrival, &pair[1].identity)
            );
        }
    }

    #[tokio::test]
    async fn test_size_of_and_fetch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        std::fs::write(&path, b"abc").unwrap();

        let source = LocalDirectorySource::new(dir.path());
        let item = LocalDirectorySource::describe(&path).await.unwrap();

        assert_eq!(source.size_of(&item.identity).await.unwrap(), Some(3));
        assert_eq!(source.fetch_to_local(&item).await.unwrap(), Some(path.clone()));

        std::fs::remove_file(&path).unwrap();
        assert_eq!(source.size_of(&item.identity).await.unwrap(), None);
        assert_eq!(source.fetch_to_local(&item).await.unwrap(), None);
    }
}
