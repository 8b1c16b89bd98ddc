//! Configuration structures
//!
//! Plain serde structs; loading and path probing live in the infra crate.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{MirrorqError, Result};

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub libraries: LibraryConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub ownership: Option<OwnershipConfig>,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

impl Config {
    /// Validate cross-field requirements that serde cannot express.
    ///
    /// # Errors
    /// Returns `MirrorqError::Config` when a required field is empty or a
    /// numeric field is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.engine.command.is_empty() {
            return Err(MirrorqError::Config("engine.command must not be empty".into()));
        }
        if self.libraries.default.source.as_os_str().is_empty()
            || self.libraries.default.target.as_os_str().is_empty()
        {
            return Err(MirrorqError::Config(
                "libraries.default must define both source and target roots".into(),
            ));
        }
        for rule in &self.libraries.rules {
            if rule.pattern.is_empty() {
                return Err(MirrorqError::Config(
                    "libraries.rules entries must define a non-empty pattern".into(),
                ));
            }
        }
        if self.engine.timeout_seconds == 0 {
            return Err(MirrorqError::Config("engine.timeout_seconds must be positive".into()));
        }
        if self.watch.interval_seconds == 0 {
            return Err(MirrorqError::Config("watch.interval_seconds must be positive".into()));
        }
        Ok(())
    }
}

/// Queue file and lock sentinel locations.
///
/// Only `dir` is usually set; the individual files default to well-known
/// names inside it. The queue file and its processing files must share a
/// filesystem volume for the rename-based claim to be atomic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Directory holding the queue file, processing files and lock sentinels
    pub dir: PathBuf,
    /// Live queue file (default: `<dir>/queue`)
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Enqueue lock sentinel (default: `<dir>/queue.lock`)
    #[serde(default)]
    pub enqueue_lock: Option<PathBuf>,
    /// Run lock sentinel (default: `<dir>/run.lock`)
    #[serde(default)]
    pub run_lock: Option<PathBuf>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/var/lib/mirrorq"),
            file: None,
            enqueue_lock: None,
            run_lock: None,
        }
    }
}

impl QueueConfig {
    pub fn queue_file(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(|| self.dir.join("queue"))
    }

    pub fn enqueue_lock_file(&self) -> PathBuf {
        self.enqueue_lock.clone().unwrap_or_else(|| self.dir.join("queue.lock"))
    }

    pub fn run_lock_file(&self) -> PathBuf {
        self.run_lock.clone().unwrap_or_else(|| self.dir.join("run.lock"))
    }
}

/// One routing rule: paths containing `pattern` sync between this root pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryRule {
    /// Substring matched against the raw queue entry
    pub pattern: String,
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Default root pair used when no rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryPair {
    pub source: PathBuf,
    pub target: PathBuf,
}

/// Library routing configuration.
///
/// Rules are evaluated in declaration order, first match wins; the default
/// pair is the final fallback. Routing is a coarse hint only; the engine
/// re-resolves the exact movie folder from the raw path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    /// Filesystem root the sync engine mounts; used as the last-resort
    /// prefix swap when rewriting paths for notification
    pub root: PathBuf,
    #[serde(default)]
    pub rules: Vec<LibraryRule>,
    pub default: LibraryPair,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/data"),
            rules: Vec::new(),
            default: LibraryPair {
                source: PathBuf::from("/data/movies"),
                target: PathBuf::from("/data/jellyfin/movies"),
            },
        }
    }
}

/// Sync engine invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine executable (resolved via PATH when not absolute)
    pub command: String,
    /// Remove stale items from the target library
    #[serde(default = "default_true")]
    pub delete_stale: bool,
    /// Create a missing target library root
    #[serde(default = "default_true")]
    pub create_missing: bool,
    /// Rename target files whose derived name drifted
    #[serde(default = "default_true")]
    pub update_names: bool,
    #[serde(default)]
    pub verbose: bool,
    /// Hard per-item deadline; a hung engine call is killed and the item
    /// counted as failed
    #[serde(default = "default_engine_timeout")]
    pub timeout_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: String::from("jellyplex-sync"),
            delete_stale: true,
            create_missing: true,
            update_names: true,
            verbose: false,
            timeout_seconds: default_engine_timeout(),
        }
    }
}

impl EngineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Media-server notification settings.
///
/// Without an API token the notification step is skipped (logged, not an
/// error).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_notify_timeout")]
    pub timeout_seconds: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8096"),
            api_token: None,
            timeout_seconds: default_notify_timeout(),
        }
    }
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Best-effort ownership fixup applied to target roots after a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipConfig {
    pub user: String,
    #[serde(default)]
    pub group: Option<String>,
    /// Octal mode string handed to `chmod -R` (e.g. `"u=rwX,g=rX"`)
    #[serde(default)]
    pub mode: Option<String>,
}

impl OwnershipConfig {
    /// `user` or `user:group` as understood by chown.
    pub fn owner_spec(&self) -> String {
        match &self.group {
            Some(group) => format!("{}:{}", self.user, group),
            None => self.user.clone(),
        }
    }
}

/// Logging sink configuration; stderr is always on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogConfig {
    /// Optional log file appended to in addition to stderr
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Default filter when RUST_LOG is unset (e.g. `"info"`)
    #[serde(default)]
    pub level: Option<String>,
}

/// Watch-mode loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_watch_interval")]
    pub interval_seconds: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_seconds: default_watch_interval() }
    }
}

impl WatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

fn default_true() -> bool {
    true
}

fn default_engine_timeout() -> u64 {
    600
}

fn default_notify_timeout() -> u64 {
    30
}

fn default_watch_interval() -> u64 {
    900
}
