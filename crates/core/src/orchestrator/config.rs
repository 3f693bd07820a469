//! Watch loop configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the batch watcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Images per batch (and per artifact).
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// How often to poll the source when no batch is ready (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Total time an item's size must hold steady (milliseconds).
    #[serde(default = "default_stability_window")]
    pub stability_window_ms: u64,

    /// Delay before the second size sample (milliseconds).
    /// Must not exceed the window.
    #[serde(default = "default_stability_sample")]
    pub stability_sample_ms: u64,

    /// Ledger file.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

fn default_batch_size() -> usize {
    9
}

fn default_poll_interval() -> u64 {
    5000 // 5 seconds
}

fn default_stability_window() -> u64 {
    3000
}

fn default_stability_sample() -> u64 {
    1000
}

fn default_state_file() -> PathBuf {
    PathBuf::from(".state.json")
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            poll_interval_ms: default_poll_interval(),
            stability_window_ms: default_stability_window(),
            stability_sample_ms: default_stability_sample(),
            state_file: default_state_file(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stability_window(&self) -> Duration {
        Duration::from_millis(self.stability_window_ms)
    }

    pub fn stability_sample(&self) -> Duration {
        Duration::from_millis(self.stability_sample_ms)
    }
}
