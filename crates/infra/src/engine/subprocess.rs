//! Subprocess adapter for the external mirroring engine
//!
//! Invokes the configured command once per queue entry, restricted to a
//! single-item ("partial") sync between the routed root pair:
//!
//! ```text
//! <command> <source-root> <target-root> --partial <path>
//!           [--delete] [--create] [--update-names] [--verbose]
//! ```
//!
//! Only the exit status matters to the caller; diagnostic output is
//! captured and logged. Every invocation is bounded by a hard deadline so a
//! hung engine cannot stall the whole batch run.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use mirrorq_core::SyncEngine;
use mirrorq_domain::{EngineConfig, MirrorqError, Result, SyncItem, SyncResult};
use tokio::process::Command;
use tracing::{debug, warn};

/// Sync engine driven through a child process per item.
#[derive(Debug, Clone)]
pub struct SubprocessSyncEngine {
    config: EngineConfig,
}

impl SubprocessSyncEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    fn command_for(&self, item: &SyncItem) -> Command {
        let mut command = Command::new(&self.config.command);
        command
            .arg(&item.source_root)
            .arg(&item.target_root)
            .arg("--partial")
            .arg(&item.path);
        if self.config.delete_stale {
            command.arg("--delete");
        }
        if self.config.create_missing {
            command.arg("--create");
        }
        if self.config.update_names {
            command.arg("--update-names");
        }
        if self.config.verbose {
            command.arg("--verbose");
        }
        command.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
        command.kill_on_drop(true);
        command
    }
}

#[async_trait]
impl SyncEngine for SubprocessSyncEngine {
    async fn sync_item(&self, item: &SyncItem) -> Result<SyncResult> {
        let mut command = self.command_for(item);
        let deadline = self.config.timeout();
        debug!(
            command = %self.config.command,
            path = %item.path,
            source = %item.source_root,
            target = %item.target_root,
            "invoking sync engine"
        );

        let output = match tokio::time::timeout(deadline, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return Err(MirrorqError::Engine(format!(
                    "failed to run '{}': {}",
                    self.config.command, err
                )));
            }
            Err(_) => {
                warn!(
                    path = %item.path,
                    timeout_secs = deadline.as_secs(),
                    "sync engine timed out, child killed"
                );
                return Ok(SyncResult { entry: item.path.clone(), succeeded: false, exit_code: None });
            }
        };

        let exit_code = output.status.code();
        if output.status.success() {
            debug!(path = %item.path, "sync engine finished");
        } else {
            warn!(
                path = %item.path,
                exit_code = ?exit_code,
                stderr = %output_tail(&output.stderr),
                "sync engine failed"
            );
        }

        Ok(SyncResult {
            entry: item.path.clone(),
            succeeded: output.status.success(),
            exit_code,
        })
    }
}

/// Last part of captured diagnostics, enough to identify the failure.
fn output_tail(bytes: &[u8]) -> String {
    const MAX_LEN: usize = 512;
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim_end();
    if trimmed.len() <= MAX_LEN {
        return trimmed.to_string();
    }
    let start = trimmed.len() - MAX_LEN;
    let boundary = trimmed
        .char_indices()
        .map(|(idx, _)| idx)
        .find(|&idx| idx >= start)
        .unwrap_or(start);
    format!("...{}", &trimmed[boundary..])
}

/// Engine timeouts shorter than this are almost certainly configuration
/// mistakes; used by callers for sanity warnings only.
pub const MIN_SANE_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(command: &str, timeout_seconds: u64) -> SubprocessSyncEngine {
        SubprocessSyncEngine::new(EngineConfig {
            command: command.to_string(),
            timeout_seconds,
            ..Default::default()
        })
    }

    fn item() -> SyncItem {
        SyncItem {
            path: "/data/movies/Avatar (2009)".into(),
            source_root: "/data/movies".into(),
            target_root: "/data/jellyfin/movies".into(),
        }
    }

    #[tokio::test]
    async fn zero_exit_code_is_success() {
        let engine = engine_with("true", 10);
        let result = engine.sync_item(&item()).await.unwrap();
        assert!(result.succeeded);
        assert_eq!(result.exit_code, Some(0));
    }

    #[tokio::test]
    async fn nonzero_exit_code_is_failure() {
        let engine = engine_with("false", 10);
        let result = engine.sync_item(&item()).await.unwrap();
        assert!(!result.succeeded);
        assert_eq!(result.exit_code, Some(1));
    }

    #[tokio::test]
    async fn missing_command_is_an_engine_error() {
        let engine = engine_with("mirrorq-test-no-such-binary", 10);
        let err = engine.sync_item(&item()).await.unwrap_err();
        assert!(matches!(err, MirrorqError::Engine(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn hung_engine_is_killed_after_deadline() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("slow-engine.sh");
        {
            let mut file = std::fs::File::create(&script).unwrap();
            writeln!(file, "#!/bin/sh\nsleep 30").unwrap();
        }
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let engine = engine_with(script.to_str().unwrap(), 1);
        let started = std::time::Instant::now();
        let result = engine.sync_item(&item()).await.unwrap();

        assert!(!result.succeeded);
        assert_eq!(result.exit_code, None, "timeout reports no exit code");
        assert!(started.elapsed() < Duration::from_secs(10), "child was killed promptly");
    }

    #[test]
    fn output_tail_truncates_long_diagnostics() {
        let long = "x".repeat(2_000);
        let tail = output_tail(long.as_bytes());
        assert!(tail.len() <= 515);
        assert!(tail.starts_with("..."));
    }

    #[test]
    fn flags_follow_configuration() {
        let engine = SubprocessSyncEngine::new(EngineConfig {
            command: "jellyplex-sync".into(),
            delete_stale: true,
            create_missing: false,
            update_names: true,
            verbose: true,
            timeout_seconds: 60,
        });
        let command = engine.command_for(&item());
        let args: Vec<String> = command
            .as_std()
            .get_args()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "/data/movies",
                "/data/jellyfin/movies",
                "--partial",
                "/data/movies/Avatar (2009)",
                "--delete",
                "--update-names",
                "--verbose",
            ]
        );
    }
}
