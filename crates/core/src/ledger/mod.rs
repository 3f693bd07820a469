//! Durable processing ledger.
//!
//! The ledger is the only persisted entity of the watcher. It records:
//! - **processed**: identities whose batch completed successfully
//! - **processing**: identities of the batch currently in flight (crash markers)
//! - **processed_signatures**: content signature of each identity at commit time
//!
//! The ledger is an explicit value: callers load it, mutate it, and hand it
//! back to the [`StateStore`] which replaces the file atomically
//! (write to `<file>.tmp`, fsync, rename), so a crash never leaves a torn
//! ledger behind.

mod store;
mod types;

pub use store::StateStore;
pub use types::{Ledger, LedgerError};
