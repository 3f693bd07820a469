//! Ledger value and its state transitions.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while persisting the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Failed to serialize the ledger.
    #[error("Failed to serialize ledger: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Failed to write or replace the ledger file.
    #[error("Failed to write ledger at {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Persisted processing state.
///
/// Every field defaults to empty so that ledgers written by older versions
/// (or hand-edited ones) load without error. Fields this version does not
/// know about are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    /// Identities considered done.
    #[serde(default)]
    pub processed: BTreeSet<String>,

    /// Identities of the batch currently mid-pipeline.
    #[serde(default)]
    pub processing: BTreeSet<String>,

    /// Identity -> signature recorded at the time of successful processing.
    #[serde(default)]
    pub processed_signatures: BTreeMap<String, String>,

    /// Remote file ids committed by the drive source.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub processed_drive_ids: BTreeSet<String>,

    /// Unknown fields, preserved across load/save.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Ledger {
    /// Whether the identity has been committed.
    pub fn is_processed(&self, identity: &str) -> bool {
        self.processed.contains(identity)
    }

    /// Whether the identity belongs to the batch in flight.
    pub fn is_processing(&self, identity: &str) -> bool {
        self.processing.contains(identity)
    }

    /// Signature recorded for the identity, if any.
    pub fn baseline(&self, identity: &str) -> Option<&str> {
        self.processed_signatures
            .get(identity)
            .map(String::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Records a baseline signature for an already-processed identity.
    pub fn record_baseline(&mut self, identity: &str, signature: &str) {
        self.processed_signatures
            .insert(identity.to_string(), signature.to_string());
    }

    /// Drops every entry whose identity is not in `existing`.
    ///
    /// Returns the number of entries removed across all fields. An identity
    /// that later reappears under the same name is then treated as new.
    pub fn prune(&mut self, existing: &HashSet<String>) -> usize {
        let before = self.entry_count();

        self.processed.retain(|id| existing.contains(id));
        self.processing.retain(|id| existing.contains(id));
        self.processed_signatures
            .retain(|id, _| existing.contains(id));
        self.processed_drive_ids.retain(|id| existing.contains(id));

        before - self.entry_count()
    }

    /// Marks the members of a batch as in flight.
    ///
    /// A member that was previously processed (re-admitted because its
    /// content changed) loses its processed entry and baseline, so that
    /// `processed` and `processing` never overlap.
    pub fn mark_processing<'a>(&mut self, identities: impl IntoIterator<Item = &'a str>) {
        for id in identities {
            self.processed.remove(id);
            self.processed_signatures.remove(id);
            self.processed_drive_ids.remove(id);
            self.processing.insert(id.to_string());
        }
    }

    /// Moves batch members from `processing` to `processed`, recording
    /// their signatures.
    ///
    /// With `mirror_drive_ids` the identities are also recorded in
    /// `processed_drive_ids`.
    pub fn commit<'a>(
        &mut self,
        members: impl IntoIterator<Item = (&'a str, &'a str)>,
        mirror_drive_ids: bool,
    ) {
        for (id, signature) in members {
            self.processing.remove(id);
            self.processed.insert(id.to_string());
            self.processed_signatures
                .insert(id.to_string(), signature.to_string());
            if mirror_drive_ids {
                self.processed_drive_ids.insert(id.to_string());
            }
        }
    }

    /// Clears batch members from `processing` without marking them processed.
    pub fn rollback<'a>(&mut self, identities: impl IntoIterator<Item = &'a str>) {
        for id in identities {
            self.processing.remove(id);
        }
    }

    /// Clears crash markers left by an interrupted run.
    ///
    /// Returns the identities that were in flight; they become eligible
    /// for collection again.
    pub fn recover_interrupted(&mut self) -> Vec<String> {
        std::mem::take(&mut self.processing).into_iter().collect()
    }

    /// Folds legacy `processed_drive_ids` entries into `processed`.
    ///
    /// Returns the number of identities absorbed.
    pub fn absorb_drive_ids(&mut self) -> usize {
        let mut absorbed = 0;
        for id in &self.processed_drive_ids {
            if self.processed.insert(id.clone()) {
                absorbed += 1;
            }
        }
        absorbed
    }

    fn entry_count(&self) -> usize {
        self.processed.len()
            + self.processing.len()
            + self.processed_signatures.len()
            + self.processed_drive_ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let ledger: Ledger = serde_json::from_str(r#"{"processed": ["a.jpg"]}"#).unwrap();
        assert!(ledger.is_processed("a.jpg"));
        assert!(ledger.processing.is_empty());
        assert!(ledger.processed_signatures.is_empty());
        assert!(ledger.processed_drive_ids.is_empty());
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let json = r#"{"processed": [], "owner": "studio-b"}"#;
        let ledger: Ledger = serde_json::from_str(json).unwrap();
        let out = serde_json::to_value(&ledger).unwrap();
        assert_eq!(out["owner"], "studio-b");
    }

    #[test]
    fn test_drive_ids_omitted_when_empty() {
        let out = serde_json::to_value(Ledger::default()).unwrap();
        assert!(out.get("processed_drive_ids").is_none());
        assert!(out.get("processed_signatures").is_some());
    }

    #[test]
    fn test_prune_removes_absent_identities() {
        let mut ledger = Ledger::default();
        ledger.commit([("a", "1:1:1"), ("b", "2:2:2")], false);
        ledger.mark_processing(["c"]);

        let removed = ledger.prune(&existing(&["a"]));

        assert_eq!(removed, 3);
        assert!(ledger.is_processed("a"));
        assert!(!ledger.is_processed("b"));
        assert!(ledger.baseline("b").is_none());
        assert!(!ledger.is_processing("c"));
    }

    #[test]
    fn test_prune_is_noop_when_all_present() {
        let mut ledger = Ledger::default();
        ledger.commit([("a", "1:1:1")], false);
        assert_eq!(ledger.prune(&existing(&["a", "z"])), 0);
    }

    #[test]
    fn test_mark_processing_keeps_sets_disjoint() {
        let mut ledger = Ledger::default();
        ledger.commit([("a", "1:1:1")], true);

        ledger.mark_processing(["a"]);

        assert!(ledger.is_processing("a"));
        assert!(!ledger.is_processed("a"));
        assert!(ledger.baseline("a").is_none());
        assert!(ledger.processed_drive_ids.is_empty());
    }

    #[test]
    fn test_commit_moves_and_records_signatures() {
        let mut ledger = Ledger::default();
        ledger.mark_processing(["a", "b"]);
        ledger.commit([("a", "10:5:5"), ("b", "20:6:6")], false);

        assert!(ledger.processing.is_empty());
        assert_eq!(ledger.baseline("a"), Some("10:5:5"));
        assert_eq!(ledger.baseline("b"), Some("20:6:6"));
        assert!(ledger.processed_drive_ids.is_empty());
    }

    #[test]
    fn test_rollback_clears_processing_only() {
        let mut ledger = Ledger::default();
        ledger.mark_processing(["a", "b"]);
        ledger.rollback(["a", "b"]);

        assert!(ledger.processing.is_empty());
        assert!(ledger.processed.is_empty());
    }

    #[test]
    fn test_recover_interrupted_returns_markers() {
        let mut ledger = Ledger::default();
        ledger.mark_processing(["x", "y"]);

        let recovered = ledger.recover_interrupted();

        assert_eq!(recovered, vec!["x".to_string(), "y".to_string()]);
        assert!(ledger.processing.is_empty());
    }

    #[test]
    fn test_absorb_drive_ids() {
        let mut ledger: Ledger =
            serde_json::from_str(r#"{"processed_drive_ids": ["f1", "f2"]}"#).unwrap();
        assert_eq!(ledger.absorb_drive_ids(), 2);
        assert!(ledger.is_processed("f1"));
        assert_eq!(ledger.absorb_drive_ids(), 0);
    }

    #[test]
    fn test_empty_baseline_is_unknown() {
        let mut ledger = Ledger::default();
        ledger.record_baseline("a", "");
        assert!(ledger.baseline("a").is_none());
    }
}
