//! mirrorq command-line interface
//!
//! # Commands
//!
//! - `enqueue` - Append one media-manager event to the work queue
//! - `run` - Process one batch: claim, sync, requeue failures, notify
//! - `watch` - Run batches on an interval until interrupted
//! - `status` - Show queue statistics
//!
//! The producer (`enqueue`) reads its inputs from the environment variables
//! the media manager exports to custom scripts; flags override them for
//! manual invocation. Exit codes: 0 success/ignored/skip, 1 dropped event or
//! failed items, 2 infrastructure failure.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mirrorq_domain::{Config, LogConfig, MirrorqError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Queue bridge between a media manager and a library mirror engine.
#[derive(Parser)]
#[command(name = "mirrorq")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(global = true, short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append one media-manager event to the work queue
    Enqueue(commands::enqueue::EnqueueArgs),

    /// Claim and process one batch from the queue
    Run,

    /// Process batches on an interval until Ctrl-C
    Watch {
        /// Seconds between batch runs (default from configuration)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show queue statistics
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

fn main() -> ExitCode {
    // Load .env before anything reads the environment; a missing file is
    // the normal case.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match mirrorq_infra::config::load(cli.config.clone()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("mirrorq: {err}");
            return ExitCode::from(2);
        }
    };

    let _log_guard = init_tracing(cli.verbose, &config.log);

    match dispatch(cli, config) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            exit_code_for(&err)
        }
    }
}

#[tokio::main]
async fn dispatch(cli: Cli, config: Config) -> mirrorq_domain::Result<ExitCode> {
    match cli.command {
        Commands::Enqueue(args) => commands::enqueue::execute(args, &config).await,
        Commands::Run => commands::run::execute(&config).await,
        Commands::Watch { interval } => commands::watch::execute(&config, interval).await,
        Commands::Status { format } => commands::status::execute(&config, &format).await,
    }
}

/// Map a domain error onto the process exit code: dropped events exit 1,
/// infrastructure failures exit 2.
fn exit_code_for(err: &MirrorqError) -> ExitCode {
    if err.is_infrastructure() {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

/// Initialize tracing on stderr, plus a non-blocking file sink when
/// configured. The returned guard must stay alive until exit so buffered
/// file output is flushed.
fn init_tracing(
    verbose: bool,
    log: &LogConfig,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = if verbose {
        "debug".to_string()
    } else {
        log.level.clone().unwrap_or_else(|| "info".to_string())
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    match &log.file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer =
                tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);

            tracing_subscriber::registry().with(filter).with(stderr_layer).with(file_layer).init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr_layer).init();
            None
        }
    }
}
