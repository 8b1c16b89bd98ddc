//! Non-blocking single-run guard
//!
//! An advisory exclusive lock on a sentinel file, tried once and never
//! waited on: when a consumer run is already active the new invocation
//! skips. The permit holds the file handle; dropping it releases the lock,
//! and a crashed process releases it implicitly when the kernel closes the
//! descriptor, so the guard cannot go stale.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use mirrorq_core::{RunGuard, RunPermit};
use mirrorq_domain::{MirrorqError, QueueConfig, Result};
use tracing::debug;

/// Run guard backed by an advisory file lock.
#[derive(Debug, Clone)]
pub struct FileRunGuard {
    lock_file: PathBuf,
}

impl FileRunGuard {
    pub fn new(config: &QueueConfig) -> Self {
        Self { lock_file: config.run_lock_file() }
    }

    pub fn lock_file(&self) -> &Path {
        &self.lock_file
    }
}

#[async_trait]
impl RunGuard for FileRunGuard {
    async fn try_acquire(&self) -> Result<Option<Box<dyn RunPermit>>> {
        let lock_file = self.lock_file.clone();

        let permit = tokio::task::spawn_blocking(move || try_lock(&lock_file))
            .await
            .map_err(|err| MirrorqError::Internal(format!("lock task panicked: {err}")))?
            .map_err(|err| MirrorqError::Lock(err.to_string()))?;

        Ok(permit.map(|file| Box::new(FileRunPermit { _file: file }) as Box<dyn RunPermit>))
    }
}

fn try_lock(lock_file: &Path) -> io::Result<Option<File>> {
    if let Some(parent) = lock_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_file)?;

    match file.try_lock_exclusive() {
        Ok(()) => {
            debug!(lock_file = %lock_file.display(), "run lock acquired");
            Ok(Some(file))
        }
        Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
            debug!(lock_file = %lock_file.display(), "run lock busy");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

/// Holds the run lock for the lifetime of one consumer run.
struct FileRunPermit {
    _file: File,
}

impl RunPermit for FileRunPermit {}
