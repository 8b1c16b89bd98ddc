//! Port interfaces for queue, locking, engine and notification operations

use std::path::Path;

use async_trait::async_trait;
use mirrorq_domain::{MediaUpdate, Result, SyncItem, SyncResult};

/// The set of entries claimed from the live queue by one consumer run.
///
/// The batch owns its backing processing file exclusively; `resolve`
/// deletes it once every entry has reached a terminal outcome (success, or
/// failure already requeued).
#[async_trait]
pub trait ClaimedBatch: Send {
    /// Claimed entries in file order, duplicates included.
    fn entries(&self) -> &[String];

    /// Discard the fully-consumed batch.
    async fn resolve(self: Box<Self>) -> Result<()>;
}

/// Durable multi-writer work queue.
///
/// Every mutation serializes through one enqueue lock so a claim can never
/// race an append. `claim` must be atomic: a concurrent reader observes the
/// whole queue content or none of it, never a partial line.
#[async_trait]
pub trait QueueStore: Send + Sync {
    /// Append one entry to the live queue, blocking until the enqueue lock
    /// is available. An enqueue is never skipped due to contention.
    async fn append(&self, entry: &str) -> Result<()>;

    /// Atomically take the entire current queue content for exclusive
    /// processing. Returns `None` when no queue file exists.
    async fn claim(&self) -> Result<Option<Box<dyn ClaimedBatch>>>;

    /// Append failed entries back to the live queue for a later run.
    async fn requeue(&self, entries: &[String]) -> Result<()>;

    /// Return entries orphaned by a crashed run to the live queue.
    ///
    /// Only safe while holding the run lock: an orphaned processing file can
    /// then only belong to a run that is no longer alive.
    async fn recover_stale(&self) -> Result<usize>;

    /// Number of entries currently pending in the live queue.
    async fn pending(&self) -> Result<usize>;
}

/// Permit representing an exclusively held run lock.
///
/// Dropping the permit releases the lock.
pub trait RunPermit: Send {}

/// Guard ensuring at most one consumer run is active at a time.
#[async_trait]
pub trait RunGuard: Send + Sync {
    /// Non-blocking acquisition: `None` means another run is active and the
    /// caller should skip, not wait.
    async fn try_acquire(&self) -> Result<Option<Box<dyn RunPermit>>>;
}

/// External per-item mirroring engine.
#[async_trait]
pub trait SyncEngine: Send + Sync {
    /// Run one partial sync. Implementations report engine failure through
    /// the `SyncResult`, not through `Err`; `Err` is reserved for
    /// infrastructure problems the caller may still treat as a failed item.
    async fn sync_item(&self, item: &SyncItem) -> Result<SyncResult>;
}

/// Downstream media-server notification endpoint.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver one batched update request covering the whole run.
    async fn notify(&self, updates: &[MediaUpdate]) -> Result<()>;
}

/// Best-effort ownership/permission fixup on a target library root.
#[async_trait]
pub trait OwnershipFixer: Send + Sync {
    async fn fix(&self, root: &Path) -> Result<()>;
}
