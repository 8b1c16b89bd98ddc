//! Command implementations

pub mod enqueue;
pub mod run;
pub mod status;
pub mod watch;

use std::sync::Arc;

use mirrorq_core::{BatchService, LibraryRouter, NotificationSink};
use mirrorq_domain::{Config, Result};
use mirrorq_infra::{
    FileQueueStore, FileRunGuard, MediaServerNotifier, NoopNotifier, SubprocessOwnershipFixer,
    SubprocessSyncEngine,
};
use tracing::warn;

/// Wire a batch service from configuration.
pub(crate) fn build_batch_service(config: &Config) -> Result<BatchService> {
    if config.engine.timeout() < mirrorq_infra::engine::MIN_SANE_TIMEOUT {
        warn!(
            timeout_secs = config.engine.timeout_seconds,
            "engine timeout is unusually short; slow syncs will be treated as failures"
        );
    }

    let store = Arc::new(FileQueueStore::new(&config.queue));
    let guard = Arc::new(FileRunGuard::new(&config.queue));
    let engine = Arc::new(SubprocessSyncEngine::new(config.engine.clone()));
    let router = LibraryRouter::new(&config.libraries);

    let notify_enabled = config.notify.api_token.is_some();
    let notifier: Arc<dyn NotificationSink> = if notify_enabled {
        Arc::new(MediaServerNotifier::new(&config.notify)?)
    } else {
        Arc::new(NoopNotifier)
    };

    let mut service =
        BatchService::new(store, guard, engine, notifier, router, notify_enabled);
    if let Some(ownership) = &config.ownership {
        service = service
            .with_ownership_fixer(Arc::new(SubprocessOwnershipFixer::new(ownership.clone())));
    }
    Ok(service)
}
