//! Stability gate: detects items that are still being written.
//!
//! Each candidate's size is sampled three times: once up front, once after
//! the sample interval, and once more at the end of the stability window.
//! An item is settled only if all three samples agree. Items that vanish
//! during sampling are dropped and re-evaluated on a later cycle.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::source::{Source, SourceError, SourceItem};

/// Confirms that candidate items have stopped changing.
#[derive(Debug, Clone, Copy)]
pub struct StabilityGate {
    window: Duration,
    sample: Duration,
}

impl StabilityGate {
    /// Creates a gate. The sample interval is capped at the window.
    pub fn new(window: Duration, sample: Duration) -> Self {
        Self {
            window,
            sample: sample.min(window),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns the subset of `items` whose size held steady across the
    /// window, in the original order.
    pub async fn settle(
        &self,
        source: &dyn Source,
        items: &[SourceItem],
    ) -> Result<Vec<SourceItem>, SourceError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let first = sample_sizes(source, items.iter().map(|i| i.identity.as_str())).await?;

        sleep(self.sample).await;
        let second = sample_sizes(source, first.keys().map(String::as_str)).await?;
        let steady: Vec<&str> = second
            .iter()
            .filter(|(id, size)| first.get(id.as_str()) == Some(*size))
            .map(|(id, _)| id.as_str())
            .collect();

        let remaining = self.window.saturating_sub(self.sample);
        if !remaining.is_zero() && !steady.is_empty() {
            sleep(remaining).await;
        }
        let third = sample_sizes(source, steady.iter().copied()).await?;

        let stable: Vec<SourceItem> = items
            .iter()
            .filter(|item| {
                let id = &item.identity;
                matches!(
                    (first.get(id), second.get(id), third.get(id)),
                    (Some(a), Some(b), Some(c)) if a == b && b == c
                )
            })
            .cloned()
            .collect();

        for item in items {
            if !stable.iter().any(|s| s.identity == item.identity) {
                debug!("{} is not stable yet", item.name);
            }
        }

        Ok(stable)
    }
}

/// Samples current sizes; vanished items are absent from the result.
async fn sample_sizes<'a>(
    source: &dyn Source,
    identities: impl Iterator<Item = &'a str>,
) -> Result<HashMap<String, u64>, SourceError> {
    let mut sizes = HashMap::new();
    for id in identities {
        match source.size_of(id).await? {
            Some(size) => {
                sizes.insert(id.to_string(), size);
            }
            None => debug!("{} vanished during stability check", id),
        }
    }
    Ok(sizes)
}
