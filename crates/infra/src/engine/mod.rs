//! Sync-engine adapters

mod subprocess;

pub use subprocess::{SubprocessSyncEngine, MIN_SANE_TIMEOUT};
