//! Core domain types for queue entries, events and batch outcomes

use serde::{Deserialize, Serialize};

/// Kind of event emitted by the media manager.
///
/// Parsed case-insensitively from the event source's own vocabulary;
/// `Download` is the manager's spelling for a completed import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Test,
    Import,
    Upgrade,
    Rename,
    /// Any event kind mirrorq does not act on (kept for logging).
    Other(String),
}

impl EventKind {
    /// Parse an event kind from the raw event-type string.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "test" => Self::Test,
            "import" | "download" => Self::Import,
            "upgrade" => Self::Upgrade,
            "rename" => Self::Rename,
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Whether events of this kind enqueue work.
    pub fn is_relevant(&self) -> bool {
        matches!(self, Self::Import | Self::Upgrade | Self::Rename)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "test"),
            Self::Import => write!(f, "import"),
            Self::Upgrade => write!(f, "upgrade"),
            Self::Rename => write!(f, "rename"),
            Self::Other(raw) => write!(f, "{}", raw),
        }
    }
}

/// One event received from the media manager's custom-script hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEvent {
    pub kind: EventKind,
    /// Absolute path of the imported movie file (empty on malformed events).
    pub path: String,
    /// Display title, used for logging only.
    pub title: Option<String>,
}

/// One unit of work handed to the sync engine: a queue entry together with
/// the library root pair the router resolved for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncItem {
    pub path: String,
    pub source_root: String,
    pub target_root: String,
}

/// Outcome of one engine invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResult {
    pub entry: String,
    pub succeeded: bool,
    /// Engine exit code; `None` when the process was killed or timed out.
    pub exit_code: Option<i32>,
}

/// A single path update reported to the media server.
///
/// Field names are pinned by the downstream API contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUpdate {
    #[serde(rename = "Path")]
    pub path: String,
    #[serde(rename = "UpdateType")]
    pub update_type: UpdateType,
}

impl MediaUpdate {
    pub fn created(path: impl Into<String>) -> Self {
        Self { path: path.into(), update_type: UpdateType::Created }
    }
}

/// Update type vocabulary accepted by the media server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateType {
    Created,
    Modified,
    Deleted,
}

/// How the end-of-run notification concluded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyStatus {
    /// One batched request was accepted by the media server.
    Sent { count: usize },
    /// No API token configured.
    SkippedNoKey,
    /// Nothing synced this run.
    SkippedNothingSynced,
    /// Request failed or was rejected; never affects the run exit code.
    Failed { reason: String },
}

/// Aggregate result of one processed batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Entries claimed from the queue, before deduplication.
    pub claimed: usize,
    /// Unique entries dispatched to the engine.
    pub unique: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<SyncResult>,
    pub notify: NotifyStatus,
}

/// Result of one consumer invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Another run holds the run lock; nothing was touched.
    Skipped,
    /// The queue was empty or absent.
    NoWork,
    Completed(BatchOutcome),
}

impl RunOutcome {
    /// Process exit code for this outcome: 1 when any item failed, else 0.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Skipped | Self::NoWork => 0,
            Self::Completed(outcome) => {
                if outcome.failed.is_empty() {
                    0
                } else {
                    1
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_parses_manager_vocabulary() {
        assert_eq!(EventKind::parse("Test"), EventKind::Test);
        assert_eq!(EventKind::parse("Download"), EventKind::Import);
        assert_eq!(EventKind::parse("import"), EventKind::Import);
        assert_eq!(EventKind::parse("UPGRADE"), EventKind::Upgrade);
        assert_eq!(EventKind::parse("Rename"), EventKind::Rename);
        assert_eq!(EventKind::parse("Grab"), EventKind::Other("Grab".into()));
    }

    #[test]
    fn relevance_matches_accepted_set() {
        assert!(!EventKind::Test.is_relevant());
        assert!(EventKind::Import.is_relevant());
        assert!(EventKind::Upgrade.is_relevant());
        assert!(EventKind::Rename.is_relevant());
        assert!(!EventKind::Other("HealthIssue".into()).is_relevant());
    }

    #[test]
    fn media_update_serializes_with_pinned_field_names() {
        let update = MediaUpdate::created("/data/jellyfin/movies/Avatar (2009)");
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(
            json,
            r#"{"Path":"/data/jellyfin/movies/Avatar (2009)","UpdateType":"Created"}"#
        );
    }

    #[test]
    fn quotes_in_paths_use_minimal_escaping() {
        let update = MediaUpdate::created(r#"/data/movies/He Said "No" (1999)"#);
        let json = serde_json::to_string(&update).unwrap();
        assert!(json.contains(r#"He Said \"No\" (1999)"#));
    }

    #[test]
    fn exit_code_reflects_failure_set_only() {
        assert_eq!(RunOutcome::Skipped.exit_code(), 0);
        assert_eq!(RunOutcome::NoWork.exit_code(), 0);

        let ok = RunOutcome::Completed(BatchOutcome {
            claimed: 2,
            unique: 2,
            succeeded: vec!["/a".into(), "/b".into()],
            failed: vec![],
            notify: NotifyStatus::Failed { reason: "http 500".into() },
        });
        assert_eq!(ok.exit_code(), 0);

        let failed = RunOutcome::Completed(BatchOutcome {
            claimed: 1,
            unique: 1,
            succeeded: vec![],
            failed: vec![SyncResult { entry: "/a".into(), succeeded: false, exit_code: Some(2) }],
            notify: NotifyStatus::SkippedNothingSynced,
        });
        assert_eq!(failed.exit_code(), 1);
    }
}
