//! Types for the batch watcher.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::source::SourceError;

/// Errors that stop a watch cycle or a one-shot run.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Listing or fetching failed.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// The ledger could not be persisted.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// An explicit input path does not exist.
    #[error("input not found: {0}")]
    InputNotFound(PathBuf),

    /// A batch member disappeared before it could be fetched.
    #[error("{0} vanished before processing")]
    Vanished(String),

    /// The pipeline failed; the batch was rolled back.
    #[error("batch {batch_id} failed: {reason}")]
    BatchFailed { batch_id: String, reason: String },
}

/// Watch loop state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchState {
    /// No batch candidate.
    #[default]
    Idle,
    /// Listing and classifying items.
    Collecting,
    /// Sampling sizes of the candidate batch.
    StabilizationCheck,
    /// Pipeline in flight.
    Running,
    /// Shut down.
    Stopped,
}

/// Current status of the watcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchStatus {
    pub state: WatchState,
    pub batches_completed: u64,
    pub batches_failed: u64,
    pub last_artifact: Option<PathBuf>,
    pub last_error: Option<String>,
}

/// A successfully processed batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: String,
    /// Composed artifact on local disk.
    pub artifact: PathBuf,
    /// Identifier returned by the sink, if publishing succeeded.
    pub published: Option<String>,
    /// Why publishing failed. The batch stays committed either way.
    pub publish_error: Option<String>,
    /// Member identities in arrival order.
    pub members: Vec<String>,
    pub pages: usize,
}

/// Result of one watch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Fewer new items than a full batch.
    Waiting { new_items: usize },
    /// The oldest batch is not settled yet.
    Unstable { stable: usize, required: usize },
    /// A batch was processed and committed.
    Completed(BatchReport),
    /// A batch failed and was rolled back.
    Failed { batch_id: String, error: String },
}

impl TickOutcome {
    /// Whether the loop should check for another batch right away.
    pub fn drains_immediately(&self) -> bool {
        matches!(self, TickOutcome::Completed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_status_default() {
        let status = WatchStatus::default();
        assert_eq!(status.state, WatchState::Idle);
        assert_eq!(status.batches_completed, 0);
        assert!(status.last_artifact.is_none());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&WatchState::StabilizationCheck).unwrap();
        assert_eq!(json, "\"stabilization_check\"");
    }

    #[test]
    fn test_only_completed_drains() {
        assert!(!TickOutcome::Waiting { new_items: 3 }.drains_immediately());
        assert!(!TickOutcome::Failed {
            batch_id: "b".to_string(),
            error: "quota".to_string()
        }
        .drains_immediately());
    }

    #[test]
    fn test_error_display() {
        let err = WatchError::BatchFailed {
            batch_id: "batch_1".to_string(),
            reason: "quota exceeded".to_string(),
        };
        assert_eq!(err.to_string(), "batch batch_1 failed: quota exceeded");
    }
}
