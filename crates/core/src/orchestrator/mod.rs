//! Batch watcher: the top-level polling loop.
//!
//! Each cycle loads the ledger, prunes entries for vanished items,
//! classifies the listing, and when a full batch of new items exists and
//! has settled, runs it through the pipeline:
//! - **Success**: members move to `processed`, the artifact is published,
//!   and the next cycle starts immediately to drain any backlog.
//! - **Failure**: members are rolled back and the loop sleeps one poll
//!   interval before trying again.

mod config;
mod runner;
mod types;

pub use config::WatchConfig;
pub use runner::BatchWatcher;
pub use types::{BatchReport, TickOutcome, WatchError, WatchState, WatchStatus};
