//! Batch watcher implementation.
//!
//! One batch is in flight at a time. The ledger is loaded at the start of
//! every cycle and every mutation is persisted before the next step runs,
//! so a crash always leaves a complete prior state on disk.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, warn};

use crate::ledger::{Ledger, StateStore};
use crate::processor::PipelineRunner;
use crate::scheduler::BatchScheduler;
use crate::sink::Sink;
use crate::source::{LocalDirectorySource, Source, SourceItem};
use crate::stability::StabilityGate;

use super::config::WatchConfig;
use super::types::{BatchReport, TickOutcome, WatchError, WatchState, WatchStatus};

/// Result of fetching batch members to local paths.
enum Fetched {
    Ready(Vec<PathBuf>),
    Vanished { name: String, fetched: usize },
}

/// The batch watcher: polls a source and drives full batches through the
/// pipeline.
pub struct BatchWatcher {
    config: WatchConfig,
    source: Arc<dyn Source>,
    pipeline: Arc<PipelineRunner>,
    sink: Arc<dyn Sink>,
    store: StateStore,
    scheduler: BatchScheduler,
    gate: StabilityGate,

    // Runtime state
    status: Arc<RwLock<WatchStatus>>,
    running: Arc<AtomicBool>,
    recovered: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl BatchWatcher {
    /// Create a new watcher.
    pub fn new(
        config: WatchConfig,
        source: Arc<dyn Source>,
        pipeline: Arc<PipelineRunner>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            store: StateStore::new(&config.state_file),
            scheduler: BatchScheduler::new(config.batch_size),
            gate: StabilityGate::new(config.stability_window(), config.stability_sample()),
            config,
            source,
            pipeline,
            sink,
            status: Arc::new(RwLock::new(WatchStatus::default())),
            running: Arc::new(AtomicBool::new(false)),
            recovered: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    /// The ledger store used by this watcher.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Get current watcher status.
    pub async fn status(&self) -> WatchStatus {
        self.status.read().await.clone()
    }

    /// Run the watch loop until [`stop`](Self::stop) is called.
    ///
    /// Cycle errors are logged and retried after one poll interval; they
    /// never end the loop.
    pub async fn run_until_stopped(&self) -> Result<(), WatchError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Batch watcher already running");
            return Ok(());
        }
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        self.recover().await?;
        info!(
            "Watching {} source (batch size {}, poll every {}ms)",
            self.source.name(),
            self.scheduler.batch_size(),
            self.config.poll_interval_ms
        );

        loop {
            if !self.running.load(Ordering::Relaxed) {
                break;
            }

            let drain = match self.tick().await {
                Ok(outcome) => outcome.drains_immediately(),
                Err(e) => {
                    error!("Watch cycle failed: {}", e);
                    self.status.write().await.last_error = Some(e.to_string());
                    false
                }
            };
            if drain {
                continue;
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Batch watcher received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(self.config.poll_interval()) => {}
            }
        }

        self.running.store(false, Ordering::SeqCst);
        self.set_state(WatchState::Stopped).await;
        info!("Batch watcher stopped");
        Ok(())
    }

    /// Stop the watch loop after the current operation completes.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Batch watcher not running");
            return;
        }
        info!("Stopping batch watcher");
        let _ = self.shutdown_tx.send(());
    }

    /// Clears crash markers left by an interrupted run. Runs once per watcher.
    pub async fn recover(&self) -> Result<(), WatchError> {
        if self.recovered.load(Ordering::SeqCst) {
            return Ok(());
        }

        let mut ledger = self.store.load().await;
        let interrupted = ledger.recover_interrupted();
        let absorbed = if self.source.is_remote() {
            ledger.absorb_drive_ids()
        } else {
            0
        };

        if !interrupted.is_empty() {
            warn!(
                "Recovered {} items from an interrupted batch: {}",
                interrupted.len(),
                interrupted.join(", ")
            );
        }
        if absorbed > 0 {
            info!("Absorbed {} legacy drive ids into the ledger", absorbed);
        }
        if !interrupted.is_empty() || absorbed > 0 {
            self.store.save(&ledger).await?;
        }

        self.recovered.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Execute one watch cycle.
    pub async fn tick(&self) -> Result<TickOutcome, WatchError> {
        let outcome = self.cycle().await;
        self.set_state(WatchState::Idle).await;
        outcome
    }

    /// Process one batch now.
    ///
    /// With explicit paths, the first `batch_size` of them are processed
    /// without a stability wait. Without, up to `batch_size` of the oldest
    /// new items in the source are. Returns `None` when there is nothing
    /// to process.
    pub async fn run_once(
        &self,
        explicit: Option<Vec<PathBuf>>,
    ) -> Result<Option<BatchReport>, WatchError> {
        self.recover().await?;
        let result = self.once(explicit).await;
        self.set_state(WatchState::Idle).await;
        result
    }

    async fn once(
        &self,
        explicit: Option<Vec<PathBuf>>,
    ) -> Result<Option<BatchReport>, WatchError> {
        let outcome = match explicit {
            Some(paths) => {
                let mut members = Vec::new();
                for path in paths.iter().take(self.scheduler.batch_size()) {
                    match LocalDirectorySource::describe(path).await {
                        Some(item) => members.push(item),
                        None => return Err(WatchError::InputNotFound(path.clone())),
                    }
                }
                if members.is_empty() {
                    return Ok(None);
                }
                let paths: Vec<PathBuf> =
                    members.iter().map(|m| PathBuf::from(&m.identity)).collect();
                let ledger = self.store.load().await;
                self.run_batch(ledger, &members, &paths, false).await?
            }
            None => {
                let (ledger, scan) = self.collect().await?;
                let Some(batch) = self.scheduler.partial_batch(&scan) else {
                    return Ok(None);
                };
                match self.fetch(&batch).await? {
                    Fetched::Ready(paths) => self.run_fetched(ledger, &batch, &paths).await?,
                    Fetched::Vanished { name, .. } => return Err(WatchError::Vanished(name)),
                }
            }
        };

        match outcome {
            TickOutcome::Completed(report) => Ok(Some(report)),
            TickOutcome::Failed { batch_id, error } => Err(WatchError::BatchFailed {
                batch_id,
                reason: error,
            }),
            TickOutcome::Waiting { .. } | TickOutcome::Unstable { .. } => Ok(None),
        }
    }

    async fn cycle(&self) -> Result<TickOutcome, WatchError> {
        let (ledger, scan) = self.collect().await?;

        let Some(batch) = self.scheduler.next_batch(&scan) else {
            debug!(
                "{} new items, waiting for {}",
                scan.new_items.len(),
                self.scheduler.batch_size()
            );
            return Ok(TickOutcome::Waiting {
                new_items: scan.new_items.len(),
            });
        };

        self.set_state(WatchState::StabilizationCheck).await;
        let stable = self.gate.settle(self.source.as_ref(), &batch).await?;
        if stable.len() < batch.len() {
            info!(
                "{}/{} batch members stable, deferring",
                stable.len(),
                batch.len()
            );
            return Ok(TickOutcome::Unstable {
                stable: stable.len(),
                required: batch.len(),
            });
        }

        match self.fetch(&batch).await {
            Ok(Fetched::Ready(paths)) => self.run_fetched(ledger, &batch, &paths).await,
            Ok(Fetched::Vanished { name, fetched }) => {
                info!("{} vanished before processing, deferring batch", name);
                Ok(TickOutcome::Unstable {
                    stable: fetched,
                    required: batch.len(),
                })
            }
            Err(e) => {
                let batch_id = new_batch_id();
                warn!("Batch {}: fetch failed: {}", batch_id, e);
                self.record_failure(&e.to_string()).await;
                Ok(TickOutcome::Failed {
                    batch_id,
                    error: e.to_string(),
                })
            }
        }
    }

    /// Loads and prunes the ledger, then classifies the current listing.
    ///
    /// Only one batch runs at a time, so any `processing` marker found here
    /// belongs to a batch whose commit or rollback was never persisted.
    async fn collect(&self) -> Result<(Ledger, crate::scheduler::Scan), WatchError> {
        self.set_state(WatchState::Collecting).await;

        let mut ledger = self.store.load().await;
        let stale = ledger.recover_interrupted();
        if !stale.is_empty() {
            warn!(
                "Releasing {} items left in processing: {}",
                stale.len(),
                stale.join(", ")
            );
        }

        let items = self.source.list().await?;
        let existing: HashSet<String> = items.iter().map(|i| i.identity.clone()).collect();
        let mut ledger = self.store.prune(ledger, &existing).await?;

        let scan = self.scheduler.scan(&mut ledger, &items);
        if scan.baselines_recorded > 0 {
            info!("Recorded {} baseline signatures", scan.baselines_recorded);
        }
        if scan.baselines_recorded > 0 || !stale.is_empty() {
            self.store.save(&ledger).await?;
        }
        Ok((ledger, scan))
    }

    /// Fetches every member; on a vanished item or an error, whatever was
    /// already fetched is released again.
    async fn fetch(&self, batch: &[SourceItem]) -> Result<Fetched, WatchError> {
        let mut paths = Vec::with_capacity(batch.len());
        for item in batch {
            let fetched = match self.source.fetch_to_local(item).await {
                Ok(fetched) => fetched,
                Err(e) => {
                    self.release(batch, &paths).await;
                    return Err(e.into());
                }
            };
            match fetched {
                Some(path) => paths.push(path),
                None => {
                    self.release(batch, &paths).await;
                    return Ok(Fetched::Vanished {
                        name: item.name.clone(),
                        fetched: paths.len(),
                    });
                }
            }
        }
        Ok(Fetched::Ready(paths))
    }

    /// Runs a batch fetched from the source, then releases the local copies.
    async fn run_fetched(
        &self,
        ledger: Ledger,
        batch: &[SourceItem],
        paths: &[PathBuf],
    ) -> Result<TickOutcome, WatchError> {
        let outcome = self
            .run_batch(ledger, batch, paths, self.source.is_remote())
            .await;
        self.release(batch, paths).await;
        outcome
    }

    async fn release(&self, members: &[SourceItem], paths: &[PathBuf]) {
        for (item, path) in members.iter().zip(paths) {
            if let Err(e) = self.source.release(item, path).await {
                warn!("Failed to release local copy of {}: {}", item.name, e);
            }
        }
    }

    /// Marks members processing, runs the pipeline, then commits or rolls back.
    async fn run_batch(
        &self,
        mut ledger: Ledger,
        members: &[SourceItem],
        paths: &[PathBuf],
        mirror_drive_ids: bool,
    ) -> Result<TickOutcome, WatchError> {
        let batch_id = new_batch_id();
        self.set_state(WatchState::Running).await;

        ledger.mark_processing(members.iter().map(|m| m.identity.as_str()));
        self.store.save(&ledger).await?;
        info!("Batch {}: started with {} items", batch_id, members.len());

        match self.pipeline.run(&batch_id, paths).await {
            Ok(result) => {
                ledger.commit(
                    members
                        .iter()
                        .map(|m| (m.identity.as_str(), m.signature.as_str())),
                    mirror_drive_ids,
                );
                self.store.save(&ledger).await?;

                let (published, publish_error) = match self.sink.publish(&result.artifact).await
                {
                    Ok(id) => {
                        info!("Batch {}: published to {} as {}", batch_id, self.sink.name(), id);
                        (Some(id), None)
                    }
                    Err(e) => {
                        warn!(
                            "Batch {}: publishing to {} failed, artifact kept at {:?}: {}",
                            batch_id,
                            self.sink.name(),
                            result.artifact,
                            e
                        );
                        (None, Some(e.to_string()))
                    }
                };

                {
                    let mut status = self.status.write().await;
                    status.batches_completed += 1;
                    status.last_artifact = Some(result.artifact.clone());
                }

                Ok(TickOutcome::Completed(BatchReport {
                    batch_id,
                    artifact: result.artifact,
                    published,
                    publish_error,
                    members: members.iter().map(|m| m.identity.clone()).collect(),
                    pages: result.pages,
                }))
            }
            Err(e) => {
                ledger.rollback(members.iter().map(|m| m.identity.as_str()));
                self.store.save(&ledger).await?;
                error!(
                    "Batch {}: failed ({:?}), rolled back {} items: {}",
                    batch_id,
                    e.kind(),
                    members.len(),
                    e
                );
                self.record_failure(&e.to_string()).await;

                Ok(TickOutcome::Failed {
                    batch_id,
                    error: e.to_string(),
                })
            }
        }
    }

    async fn set_state(&self, state: WatchState) {
        self.status.write().await.state = state;
    }

    async fn record_failure(&self, error: &str) {
        let mut status = self.status.write().await;
        status.batches_failed += 1;
        status.last_error = Some(error.to_string());
    }
}

fn new_batch_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "batch_{}_{}",
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
        &suffix[..8]
    )
}
