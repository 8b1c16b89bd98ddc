//! `mirrorq status` - queue statistics

use std::process::ExitCode;
use std::sync::Arc;

use mirrorq_core::{QueueStore, RunGuard};
use mirrorq_domain::{Config, MirrorqError, Result};
use mirrorq_infra::{FileQueueStore, FileRunGuard};

pub async fn execute(config: &Config, format: &str) -> Result<ExitCode> {
    let store = Arc::new(FileQueueStore::new(&config.queue));
    let guard = FileRunGuard::new(&config.queue);

    let pending = store.pending().await?;
    // Probing the run lock briefly acquires it; harmless while no run is
    // active, accurate while one is.
    let run_active = guard.try_acquire().await?.is_none();

    match format {
        "json" => {
            let status = serde_json::json!({
                "pending": pending,
                "run_active": run_active,
                "queue_file": store.queue_file(),
            });
            let rendered = serde_json::to_string_pretty(&status)
                .map_err(|err| MirrorqError::Internal(err.to_string()))?;
            println!("{rendered}");
        }
        "text" => {
            println!("queue file: {}", store.queue_file().display());
            println!("pending entries: {pending}");
            println!("run active: {}", if run_active { "yes" } else { "no" });
        }
        other => {
            return Err(MirrorqError::InvalidInput(format!("unknown format: {other}")));
        }
    }

    Ok(ExitCode::SUCCESS)
}
