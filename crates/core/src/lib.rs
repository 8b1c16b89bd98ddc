//! # mirrorq Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - Port/adapter interfaces (traits) for the queue, run lock, sync engine
//!   and notification sink
//! - The producer service (event validation and enqueue)
//! - The batch service (claim, dedup, dispatch, retry, notify)
//! - Library routing rules and notification path rewriting
//!
//! ## Architecture Principles
//! - Only depends on `mirrorq-domain`
//! - No filesystem, process or HTTP code
//! - All external effects via traits

pub mod batch;
pub mod ports;
pub mod producer;
pub mod routing;

pub use batch::BatchService;
pub use ports::{ClaimedBatch, NotificationSink, OwnershipFixer, QueueStore, RunGuard, RunPermit, SyncEngine};
pub use producer::{IngestOutcome, ProducerService};
pub use routing::LibraryRouter;
