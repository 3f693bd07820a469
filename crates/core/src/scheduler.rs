//! New-item classification and batch formation.
//!
//! An identity is only "seen" relative to its last-known content: a
//! processed name whose signature changed is re-admitted as new.

use tracing::{debug, info};

use crate::ledger::Ledger;
use crate::source::SourceItem;

/// How a listed item relates to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Never processed, or processed content has since changed.
    New,
    /// Processed before baselines were recorded; baseline recorded now.
    Backfill,
    /// Processed and unchanged.
    Done,
    /// Part of the batch in flight.
    InFlight,
    /// Signature unknown this cycle.
    Unknown,
}

/// Result of classifying a listing against the ledger.
#[derive(Debug, Clone, Default)]
pub struct Scan {
    /// New items, oldest first.
    pub new_items: Vec<SourceItem>,
    /// Baselines recorded during this scan; the ledger needs persisting.
    pub baselines_recorded: usize,
    /// Items whose signature was unknown this cycle.
    pub skipped: usize,
}

/// Decides which items are new and what the next batch is.
#[derive(Debug, Clone, Copy)]
pub struct BatchScheduler {
    batch_size: usize,
}

impl BatchScheduler {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Classifies one item without touching the ledger.
    pub fn classify(ledger: &Ledger, item: &SourceItem) -> Classification {
        if ledger.is_processing(&item.identity) {
            return Classification::InFlight;
        }
        if !ledger.is_processed(&item.identity) {
            return Classification::New;
        }
        if item.signature.is_empty() {
            return Classification::Unknown;
        }
        match ledger.baseline(&item.identity) {
            None => Classification::Backfill,
            Some(baseline) if baseline != item.signature => Classification::New,
            Some(_) => Classification::Done,
        }
    }

    /// Classifies a listing (already in arrival order), recording baselines
    /// for processed items that have none.
    pub fn scan(&self, ledger: &mut Ledger, items: &[SourceItem]) -> Scan {
        let mut scan = Scan::default();

        for item in items {
            match Self::classify(ledger, item) {
                Classification::New => {
                    if ledger.is_processed(&item.identity) {
                        info!("{} changed since it was processed, re-admitting", item.name);
                    }
                    scan.new_items.push(item.clone());
                }
                Classification::Backfill => {
                    ledger.record_baseline(&item.identity, &item.signature);
                    scan.baselines_recorded += 1;
                }
                Classification::Unknown => {
                    debug!("Signature of {} unknown, skipping this cycle", item.name);
                    scan.skipped += 1;
                }
                Classification::Done | Classification::InFlight => {}
            }
        }

        scan
    }

    /// The oldest `batch_size` new items, or `None` if there are fewer.
    pub fn next_batch(&self, scan: &Scan) -> Option<Vec<SourceItem>> {
        if scan.new_items.len() < self.batch_size {
            return None;
        }
        Some(scan.new_items[..self.batch_size].to_vec())
    }

    /// Up to `batch_size` of the oldest new items, for one-shot runs.
    pub fn partial_batch(&self, scan: &Scan) -> Option<Vec<SourceItem>> {
        if scan.new_items.is_empty() {
            return None;
        }
        let n = scan.new_items.len().min(self.batch_size);
        Some(scan.new_items[..n].to_vec())
    }
}
