//! `mirrorq enqueue` - the producer side of the queue
//!
//! Invoked by the media manager as a custom script; inputs arrive through
//! the environment variables the manager exports. Rename events carry no
//! file path, so the movie folder path is accepted as a fallback.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use mirrorq_core::ProducerService;
use mirrorq_domain::{Config, EventKind, ImportEvent, Result};
use mirrorq_infra::FileQueueStore;

#[derive(Args, Debug)]
pub struct EnqueueArgs {
    /// Event type reported by the media manager
    #[arg(long = "event-type", env = "radarr_eventtype", default_value = "")]
    pub event_type: String,

    /// Absolute path of the imported movie file
    #[arg(long, env = "radarr_moviefile_path")]
    pub path: Option<String>,

    /// Movie folder path, used when the event carries no file path
    #[arg(long = "movie-path", env = "radarr_movie_path")]
    pub movie_path: Option<String>,

    /// Display title (logging only)
    #[arg(long, env = "radarr_movie_title")]
    pub title: Option<String>,
}

pub async fn execute(args: EnqueueArgs, config: &Config) -> Result<ExitCode> {
    let store = Arc::new(FileQueueStore::new(&config.queue));
    let producer = ProducerService::new(store);

    let event = ImportEvent {
        kind: EventKind::parse(&args.event_type),
        path: args.path.or(args.movie_path).unwrap_or_default(),
        title: args.title,
    };

    producer.ingest(&event).await?;
    Ok(ExitCode::SUCCESS)
}
