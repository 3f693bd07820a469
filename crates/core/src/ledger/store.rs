//! File-backed ledger store with atomic replacement.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::types::{Ledger, LedgerError};

/// Reads and atomically replaces the ledger file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    /// Creates a store for the ledger at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the temporary file used during writes.
    pub fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Loads the ledger.
    ///
    /// A missing, unreadable or unparsable file yields an empty ledger:
    /// corruption means "start empty", never a fatal error.
    pub async fn load(&self) -> Ledger {
        let content = match fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No ledger at {:?}, starting empty", self.path);
                return Ledger::default();
            }
            Err(e) => {
                warn!("Failed to read ledger {:?}, starting empty: {}", self.path, e);
                return Ledger::default();
            }
        };

        match serde_json::from_slice(&content) {
            Ok(ledger) => ledger,
            Err(e) => {
                warn!("Ledger {:?} is not valid, starting empty: {}", self.path, e);
                Ledger::default()
            }
        }
    }

    /// Persists the ledger: write to `<file>.tmp`, fsync, rename over the ledger.
    pub async fn save(&self, ledger: &Ledger) -> Result<(), LedgerError> {
        let json = serde_json::to_vec_pretty(ledger)?;
        let tmp = self.temp_path();

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let mut file = fs::File::create(&tmp)
            .await
            .map_err(|e| self.write_error(e))?;
        file.write_all(&json).await.map_err(|e| self.write_error(e))?;
        file.sync_all().await.map_err(|e| self.write_error(e))?;
        drop(file);

        fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        debug!(
            "Persisted ledger ({} processed, {} processing)",
            ledger.processed.len(),
            ledger.processing.len()
        );
        Ok(())
    }

    /// Removes entries for identities no longer present in the source and
    /// persists the result if anything changed.
    pub async fn prune(
        &self,
        mut ledger: Ledger,
        existing: &HashSet<String>,
    ) -> Result<Ledger, LedgerError> {
        let removed = ledger.prune(existing);
        if removed > 0 {
            info!("Pruned {} stale ledger entries", removed);
            self.save(&ledger).await?;
        }
        Ok(ledger)
    }

    fn write_error(&self, source: std::io::Error) -> LedgerError {
        LedgerError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> StateStore {
        StateStore::new(dir.path().join(".state.json"))
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let ledger = store_in(&dir).load().await;
        assert_eq!(ledger, Ledger::default());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        std::fs::write(store.path(), b"{\"processed\": [\"a\"").unwrap();

        assert_eq!(store.load().await, Ledger::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut ledger = Ledger::default();
        ledger.commit([("in/a.jpg", "10:1:1")], false);
        store.save(&ledger).await.unwrap();

        assert_eq!(store.load().await, ledger);
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_torn_temp_write_leaves_previous_ledger() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut before = Ledger::default();
        before.commit([("a", "1:1:1")], false);
        store.save(&before).await.unwrap();

        // Crash after a partial write to the temp file, before the rename.
        std::fs::write(store.temp_path(), b"{\"processed\": [\"a\", \"b").unwrap();

        assert_eq!(store.load().await, before);

        // The next save replaces the stale temp file.
        let mut after = before.clone();
        after.commit([("b", "2:2:2")], false);
        store.save(&after).await.unwrap();
        assert_eq!(store.load().await, after);
    }

    #[tokio::test]
    async fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(dir.path().join("nested/state/ledger.json"));
        store.save(&Ledger::default()).await.unwrap();
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_prune_persists_only_on_change() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let ledger = store
            .prune(Ledger::default(), &HashSet::new())
            .await
            .unwrap();
        assert!(ledger.processed.is_empty());
        assert!(!store.path().exists());

        let mut ledger = Ledger::default();
        ledger.commit([("gone", "1:1:1")], false);
        let ledger = store.prune(ledger, &HashSet::new()).await.unwrap();
        assert!(ledger.processed.is_empty());
        assert_eq!(store.load().await, ledger);
    }

    #[test]
    fn test_temp_path_appends_suffix() {
        let store = StateStore::new("/data/.state.json");
        assert_eq!(store.temp_path(), PathBuf::from("/data/.state.json.tmp"));
    }
}
