//! `mirrorq run` - one consumer batch

use std::process::ExitCode;

use mirrorq_domain::{Config, Result, RunOutcome};
use tracing::info;

use super::build_batch_service;

pub async fn execute(config: &Config) -> Result<ExitCode> {
    let service = build_batch_service(config)?;
    let outcome = service.run_once().await?;

    if let RunOutcome::Completed(batch) = &outcome {
        info!(
            claimed = batch.claimed,
            unique = batch.unique,
            succeeded = batch.succeeded.len(),
            failed = batch.failed.len(),
            notify = ?batch.notify,
            "run finished"
        );
    }

    Ok(ExitCode::from(outcome.exit_code() as u8))
}
