//! Batch service: one consumer run over the claimed queue content
//!
//! Claims the live queue atomically, deduplicates, dispatches each entry to
//! the sync engine with per-item error isolation, requeues failures,
//! resolves the processing file and sends one batched media-server
//! notification. At most one run is active at a time; a second invocation
//! skips instead of waiting because the queue is durable and the next
//! scheduled run catches up.

use std::collections::HashSet;
use std::sync::Arc;

use mirrorq_domain::{
    BatchOutcome, MediaUpdate, NotifyStatus, Result, RunOutcome, SyncItem, SyncResult,
};
use tracing::{debug, info, instrument, warn};

use crate::ports::{NotificationSink, OwnershipFixer, QueueStore, RunGuard, SyncEngine};
use crate::routing::LibraryRouter;

/// Orchestrates one queue-draining batch run.
pub struct BatchService {
    store: Arc<dyn QueueStore>,
    guard: Arc<dyn RunGuard>,
    engine: Arc<dyn SyncEngine>,
    notifier: Arc<dyn NotificationSink>,
    fixer: Option<Arc<dyn OwnershipFixer>>,
    router: LibraryRouter,
    notify_enabled: bool,
}

impl BatchService {
    pub fn new(
        store: Arc<dyn QueueStore>,
        guard: Arc<dyn RunGuard>,
        engine: Arc<dyn SyncEngine>,
        notifier: Arc<dyn NotificationSink>,
        router: LibraryRouter,
        notify_enabled: bool,
    ) -> Self {
        Self { store, guard, engine, notifier, fixer: None, router, notify_enabled }
    }

    /// Attach a best-effort ownership fixup applied to every target root
    /// after reconciliation.
    pub fn with_ownership_fixer(mut self, fixer: Arc<dyn OwnershipFixer>) -> Self {
        self.fixer = Some(fixer);
        self
    }

    /// Execute one run: skip, no-work, or a full
    /// claim/process/reconcile/notify cycle.
    ///
    /// # Errors
    /// Only infrastructure failures (lock, queue I/O) surface as `Err`;
    /// per-item sync failures and notification failures are absorbed into
    /// the returned outcome.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<RunOutcome> {
        let Some(_permit) = self.guard.try_acquire().await? else {
            info!("another run is active, skipping");
            return Ok(RunOutcome::Skipped);
        };

        let recovered = self.store.recover_stale().await?;
        if recovered > 0 {
            info!(recovered, "returned orphaned entries to the live queue");
        }

        let Some(batch) = self.store.claim().await? else {
            info!("no work pending");
            return Ok(RunOutcome::NoWork);
        };
        let claimed = batch.entries().len();
        if claimed == 0 {
            batch.resolve().await?;
            info!("claimed an empty queue, no work pending");
            return Ok(RunOutcome::NoWork);
        }

        let unique = dedup(batch.entries());
        info!(claimed, unique = unique.len(), "processing batch");

        let mut succeeded: Vec<String> = Vec::new();
        let mut failed: Vec<SyncResult> = Vec::new();

        for entry in &unique {
            let rule = self.router.route(entry);
            let item = SyncItem {
                path: entry.clone(),
                source_root: rule.source.display().to_string(),
                target_root: rule.target.display().to_string(),
            };

            match self.engine.sync_item(&item).await {
                Ok(result) if result.succeeded => {
                    debug!(entry, "synced");
                    succeeded.push(entry.clone());
                }
                Ok(result) => {
                    warn!(entry, exit_code = ?result.exit_code, "sync failed");
                    failed.push(result);
                }
                Err(err) => {
                    warn!(entry, error = %err, "engine invocation failed");
                    failed.push(SyncResult {
                        entry: entry.clone(),
                        succeeded: false,
                        exit_code: None,
                    });
                }
            }
        }

        if !failed.is_empty() {
            let entries: Vec<String> = failed.iter().map(|f| f.entry.clone()).collect();
            self.store.requeue(&entries).await?;
            info!(count = entries.len(), "requeued failed entries");
        }
        batch.resolve().await?;

        if let Some(fixer) = &self.fixer {
            for root in self.router.target_roots() {
                if let Err(err) = fixer.fix(&root).await {
                    warn!(root = %root.display(), error = %err, "ownership fixup failed");
                }
            }
        }

        let notify = self.notify(&succeeded).await;

        info!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            "batch completed"
        );
        Ok(RunOutcome::Completed(BatchOutcome {
            claimed,
            unique: unique.len(),
            succeeded,
            failed,
            notify,
        }))
    }

    async fn notify(&self, succeeded: &[String]) -> NotifyStatus {
        if succeeded.is_empty() {
            info!("notification skipped, nothing synced");
            return NotifyStatus::SkippedNothingSynced;
        }
        if !self.notify_enabled {
            info!("notification skipped, no API token configured");
            return NotifyStatus::SkippedNoKey;
        }

        let updates: Vec<MediaUpdate> =
            succeeded.iter().map(|path| MediaUpdate::created(self.router.rewrite(path))).collect();

        match self.notifier.notify(&updates).await {
            Ok(()) => {
                info!(count = updates.len(), "media server notified");
                NotifyStatus::Sent { count: updates.len() }
            }
            Err(err) => {
                warn!(error = %err, "media server notification failed");
                NotifyStatus::Failed { reason: err.to_string() }
            }
        }
    }
}

/// Deduplicate by exact string equality, preserving first-seen order.
fn dedup(entries: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());
    entries.iter().filter(|entry| seen.insert(entry.as_str())).cloned().collect()
}
