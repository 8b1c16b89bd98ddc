//! `mirrorq watch` - interval-driven batch processing
//!
//! A convenience for hosts without a scheduler; the run lock still guards
//! against overlap with any externally scheduled `mirrorq run`. A failed
//! tick is logged and the loop keeps going - the queue is durable and the
//! next tick catches up.

use std::process::ExitCode;

use mirrorq_domain::{Config, Result, RunOutcome};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::build_batch_service;

pub async fn execute(config: &Config, interval_override: Option<u64>) -> Result<ExitCode> {
    let service = build_batch_service(config)?;
    let interval = interval_override
        .map(std::time::Duration::from_secs)
        .unwrap_or_else(|| config.watch.interval());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, finishing current run");
            signal_cancel.cancel();
        }
    });

    info!(interval_secs = interval.as_secs(), "watch mode started");

    loop {
        match service.run_once().await {
            Ok(RunOutcome::Completed(batch)) => {
                info!(
                    succeeded = batch.succeeded.len(),
                    failed = batch.failed.len(),
                    "tick finished"
                );
            }
            Ok(outcome) => debug!(outcome = ?outcome, "tick finished"),
            Err(err) => error!(error = %err, "tick failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("watch mode stopped");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }

    Ok(ExitCode::SUCCESS)
}
