//! Producer service: turns one media-manager event into at most one
//! queue append
//!
//! Fire-and-forget by design: the caller only sees a log line and an exit
//! status. Validation failures drop the event (the manager's own health
//! surface reports the non-zero exit); infrastructure failures propagate.

use std::path::Path;
use std::sync::Arc;

use mirrorq_domain::{EventKind, ImportEvent, MirrorqError, Result};
use tracing::{info, warn};

use crate::ports::QueueStore;

/// What the producer did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Entry appended to the live queue.
    Enqueued,
    /// Connectivity-test event acknowledged, nothing enqueued.
    AcknowledgedTest,
    /// Event kind outside the accepted set, nothing enqueued.
    Ignored,
}

/// Validates incoming events and appends relevant ones to the queue.
pub struct ProducerService {
    store: Arc<dyn QueueStore>,
}

impl ProducerService {
    pub fn new(store: Arc<dyn QueueStore>) -> Self {
        Self { store }
    }

    /// Handle one event.
    ///
    /// # Errors
    /// Returns `MirrorqError::InvalidInput` when a relevant event carries an
    /// empty or newline-tainted path (the event is dropped, not retried);
    /// queue errors propagate unchanged.
    pub async fn ingest(&self, event: &ImportEvent) -> Result<IngestOutcome> {
        let title = event.title.as_deref().unwrap_or("<untitled>");

        match &event.kind {
            EventKind::Test => {
                info!(title, "test event acknowledged");
                return Ok(IngestOutcome::AcknowledgedTest);
            }
            kind if !kind.is_relevant() => {
                info!(kind = %kind, title, "event ignored");
                return Ok(IngestOutcome::Ignored);
            }
            _ => {}
        }

        let path = event.path.trim();
        if path.is_empty() {
            return Err(MirrorqError::InvalidInput(format!(
                "event '{}' for '{}' carries no movie path",
                event.kind, title
            )));
        }
        if path.contains('\n') || path.contains('\r') {
            return Err(MirrorqError::InvalidInput(format!(
                "movie path for '{}' contains a line break",
                title
            )));
        }
        if !Path::new(path).is_absolute() {
            // The engine re-resolves from its own mount root, so a relative
            // path still syncs; it just suggests a misconfigured hook.
            warn!(path, "enqueueing non-absolute path");
        }

        self.store.append(path).await?;
        info!(kind = %event.kind, title, path, "enqueued");
        Ok(IngestOutcome::Enqueued)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::ports::ClaimedBatch;

    #[derive(Default)]
    struct RecordingStore {
        appended: Mutex<Vec<String>>,
        fail_append: bool,
    }

    #[async_trait]
    impl QueueStore for RecordingStore {
        async fn append(&self, entry: &str) -> Result<()> {
            if self.fail_append {
                return Err(MirrorqError::Queue("disk full".into()));
            }
            self.appended.lock().unwrap().push(entry.to_string());
            Ok(())
        }

        async fn claim(&self) -> Result<Option<Box<dyn ClaimedBatch>>> {
            unimplemented!("not used by producer tests")
        }

        async fn requeue(&self, _entries: &[String]) -> Result<()> {
            unimplemented!("not used by producer tests")
        }

        async fn recover_stale(&self) -> Result<usize> {
            unimplemented!("not used by producer tests")
        }

        async fn pending(&self) -> Result<usize> {
            Ok(self.appended.lock().unwrap().len())
        }
    }

    fn event(kind: EventKind, path: &str) -> ImportEvent {
        ImportEvent { kind, path: path.to_string(), title: Some("Avatar".into()) }
    }

    #[tokio::test]
    async fn import_event_is_enqueued() {
        let store = Arc::new(RecordingStore::default());
        let producer = ProducerService::new(store.clone());

        let outcome = producer
            .ingest(&event(EventKind::Import, "/data/movies/Avatar (2009)"))
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Enqueued);
        assert_eq!(*store.appended.lock().unwrap(), vec!["/data/movies/Avatar (2009)"]);
    }

    #[tokio::test]
    async fn test_event_is_acknowledged_without_enqueue() {
        let store = Arc::new(RecordingStore::default());
        let producer = ProducerService::new(store.clone());

        let outcome = producer.ingest(&event(EventKind::Test, "")).await.unwrap();

        assert_eq!(outcome, IngestOutcome::AcknowledgedTest);
        assert!(store.appended.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_kind_is_ignored() {
        let store = Arc::new(RecordingStore::default());
        let producer = ProducerService::new(store.clone());

        let outcome = producer
            .ingest(&event(EventKind::Other("HealthIssue".into()), "/data/movies/X"))
            .await
            .unwrap();

        assert_eq!(outcome, IngestOutcome::Ignored);
        assert!(store.appended.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_path_on_relevant_event_is_invalid_input() {
        let store = Arc::new(RecordingStore::default());
        let producer = ProducerService::new(store.clone());

        let err = producer.ingest(&event(EventKind::Upgrade, "   ")).await.unwrap_err();

        assert!(matches!(err, MirrorqError::InvalidInput(_)));
        assert!(store.appended.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn embedded_newline_is_rejected() {
        let store = Arc::new(RecordingStore::default());
        let producer = ProducerService::new(store.clone());

        let err = producer
            .ingest(&event(EventKind::Rename, "/data/movies/bad\nname"))
            .await
            .unwrap_err();

        assert!(matches!(err, MirrorqError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn queue_failure_propagates() {
        let store = Arc::new(RecordingStore { fail_append: true, ..Default::default() });
        let producer = ProducerService::new(store);

        let err = producer
            .ingest(&event(EventKind::Import, "/data/movies/Avatar (2009)"))
            .await
            .unwrap_err();

        assert!(matches!(err, MirrorqError::Queue(_)));
    }
}
