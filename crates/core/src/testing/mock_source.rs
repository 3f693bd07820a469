//! Mock source for testing.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::source::{Source, SourceError, SourceItem};

#[derive(Debug, Clone)]
struct MockEntry {
    item: SourceItem,
    /// Bytes added on every size sample.
    growth: u64,
}

/// Mock implementation of the Source trait.
///
/// Items live in memory; identities are the names passed to `add_item`.
/// `fetch_to_local` returns the identity as a path without touching disk,
/// which pairs with [`MockStage`](super::MockStage) since it never reads
/// its input.
///
/// # Example
///
/// ```rust,ignore
/// let source = MockSource::new();
/// source.add_item("a.jpg", 100).await;
/// source.grow_on_sample("a.jpg", 10).await;
/// assert_eq!(source.size_of("a.jpg").await?, Some(110));
/// ```
#[derive(Debug)]
pub struct MockSource {
    entries: Arc<RwLock<BTreeMap<String, MockEntry>>>,
    /// Items that disappear when fetched.
    vanish_on_fetch: Arc<RwLock<HashSet<String>>>,
    /// Identities passed to `fetch_to_local`, in call order.
    fetched: Arc<RwLock<Vec<String>>>,
    /// Identities passed to `release`, in call order.
    released: Arc<RwLock<Vec<String>>>,
    /// Number of `list` calls.
    list_calls: Arc<RwLock<usize>>,
    /// If set, the next `list` call fails.
    fail_next_list: Arc<RwLock<bool>>,
    /// Arrival of the next added item.
    clock: Arc<RwLock<DateTime<Utc>>>,
    remote: bool,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Create an empty local-style mock source.
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            vanish_on_fetch: Arc::new(RwLock::new(HashSet::new())),
            fetched: Arc::new(RwLock::new(Vec::new())),
            released: Arc::new(RwLock::new(Vec::new())),
            list_calls: Arc::new(RwLock::new(0)),
            fail_next_list: Arc::new(RwLock::new(false)),
            clock: Arc::new(RwLock::new(DateTime::<Utc>::from(std::time::UNIX_EPOCH))),
            remote: false,
        }
    }

    /// Create an empty mock that reports itself as remote.
    pub fn remote() -> Self {
        Self {
            remote: true,
            ..Self::new()
        }
    }

    /// Add an item. Each item arrives one second after the previous one.
    pub async fn add_item(&self, name: &str, size: u64) -> SourceItem {
        let arrival = {
            let mut clock = self.clock.write().await;
            *clock += ChronoDuration::seconds(1);
            *clock
        };
        let item = SourceItem {
            identity: name.to_string(),
            name: name.to_string(),
            size,
            signature: format!("{}:1", size),
            arrival,
            mime_type: None,
        };
        self.entries.write().await.insert(
            name.to_string(),
            MockEntry {
                item: item.clone(),
                growth: 0,
            },
        );
        item
    }

    /// Add `count` items named `img00.jpg`, `img01.jpg`, ... in arrival order.
    pub async fn add_items(&self, count: usize) -> Vec<SourceItem> {
        let mut items = Vec::with_capacity(count);
        for i in 0..count {
            items.push(self.add_item(&format!("img{:02}.jpg", i), 1000 + i as u64).await);
        }
        items
    }

    /// Make the item grow by `delta` bytes every time its size is sampled.
    pub async fn grow_on_sample(&self, identity: &str, delta: u64) {
        if let Some(entry) = self.entries.write().await.get_mut(identity) {
            entry.growth = delta;
        }
    }

    /// Replace the item's signature, as if its content changed.
    pub async fn set_signature(&self, identity: &str, signature: &str) {
        if let Some(entry) = self.entries.write().await.get_mut(identity) {
            entry.item.signature = signature.to_string();
        }
    }

    /// Remove an item.
    pub async fn remove(&self, identity: &str) {
        self.entries.write().await.remove(identity);
    }

    /// Make the item vanish when it is fetched.
    pub async fn vanish_on_fetch(&self, identity: &str) {
        self.vanish_on_fetch
            .write()
            .await
            .insert(identity.to_string());
    }

    /// Make the next `list` call fail.
    pub async fn fail_next_list(&self) {
        *self.fail_next_list.write().await = true;
    }

    /// Identities fetched so far.
    pub async fn fetched(&self) -> Vec<String> {
        self.fetched.read().await.clone()
    }

    /// Identities released so far.
    pub async fn released(&self) -> Vec<String> {
        self.released.read().await.clone()
    }

    /// How many times the source has been listed.
    pub async fn list_calls(&self) -> usize {
        *self.list_calls.read().await
    }
}

#[async_trait]
impl Source for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list(&self) -> Result<Vec<SourceItem>, SourceError> {
        *self.list_calls.write().await += 1;
        if std::mem::take(&mut *self.fail_next_list.write().await) {
            return Err(SourceError::io(
                "mock",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock list failure"),
            ));
        }
        let mut items: Vec<SourceItem> = self
            .entries
            .read()
            .await
            .values()
            .map(|e| e.item.clone())
            .collect();
        SourceItem::sort_by_arrival(&mut items);
        Ok(items)
    }

    async fn size_of(&self, identity: &str) -> Result<Option<u64>, SourceError> {
        let mut entries = self.entries.write().await;
        Ok(entries.get_mut(identity).map(|entry| {
            let size = entry.item.size;
            entry.item.size += entry.growth;
            size
        }))
    }

    async fn fetch_to_local(&self, item: &SourceItem) -> Result<Option<PathBuf>, SourceError> {
        self.fetched.write().await.push(item.identity.clone());
        if self.vanish_on_fetch.read().await.contains(&item.identity) {
            self.entries.write().await.remove(&item.identity);
            return Ok(None);
        }
        if !self.entries.read().await.contains_key(&item.identity) {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(&item.identity)))
    }

    async fn release(&self, item: &SourceItem, _local: &Path) -> Result<(), SourceError> {
        self.released.write().await.push(item.identity.clone());
        Ok(())
    }

    fn is_remote(&self) -> bool {
        self.remote
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_in_arrival_order() {
        let source = MockSource::new();
        source.add_item("z.jpg", 1).await;
        source.add_item("a.jpg", 2).await;

        let names: Vec<_> = source
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["z.jpg", "a.jpg"]);
    }

    #[tokio::test]
    async fn test_growth_applies_per_sample() {
        let source = MockSource::new();
        source.add_item("a.jpg", 100).await;
        source.grow_on_sample("a.jpg", 10).await;

        assert_eq!(source.size_of("a.jpg").await.unwrap(), Some(100));
        assert_eq!(source.size_of("a.jpg").await.unwrap(), Some(110));
        assert_eq!(source.size_of("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_vanish_on_fetch() {
        let source = MockSource::new();
        let item = source.add_item("a.jpg", 1).await;
        source.vanish_on_fetch("a.jpg").await;

        assert!(source.fetch_to_local(&item).await.unwrap().is_none());
        assert!(source.list().await.unwrap().is_empty());
        assert_eq!(source.fetched().await, vec!["a.jpg"]);
    }

    #[tokio::test]
    async fn test_fail_next_list_is_one_shot() {
        let source = MockSource::new();
        source.fail_next_list().await;
        assert!(source.list().await.is_err());
        assert!(source.list().await.is_ok());
        assert_eq!(source.list_calls().await, 2);
    }
}
