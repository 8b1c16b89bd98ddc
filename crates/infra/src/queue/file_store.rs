//! File-backed queue store
//!
//! The live queue is a UTF-8 text file, one path per line, no quoting. Every
//! mutation runs inside the enqueue lock: an advisory exclusive lock on a
//! sentinel file next to the queue. Claiming renames the live file to a
//! private per-run processing file; rename on the same volume is atomic, so
//! a concurrent producer either appends before the rename (entry claimed) or
//! after it (entry lands in a fresh live file for the next run).

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use mirrorq_core::{ClaimedBatch, QueueStore};
use mirrorq_domain::{MirrorqError, QueueConfig, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::InfraError;

/// Queue store persisting entries to a newline-delimited file.
#[derive(Debug, Clone)]
pub struct FileQueueStore {
    queue_file: PathBuf,
    lock_file: PathBuf,
}

impl FileQueueStore {
    pub fn new(config: &QueueConfig) -> Self {
        Self { queue_file: config.queue_file(), lock_file: config.enqueue_lock_file() }
    }

    /// Path of the live queue file.
    pub fn queue_file(&self) -> &Path {
        &self.queue_file
    }
}

#[async_trait]
impl QueueStore for FileQueueStore {
    async fn append(&self, entry: &str) -> Result<()> {
        let queue_file = self.queue_file.clone();
        let lock_file = self.lock_file.clone();
        let entry = entry.to_string();

        run_blocking(move || {
            with_enqueue_lock(&lock_file, || append_lines(&queue_file, &[entry]))
        })
        .await
    }

    async fn claim(&self) -> Result<Option<Box<dyn ClaimedBatch>>> {
        let queue_file = self.queue_file.clone();
        let lock_file = self.lock_file.clone();

        let claimed = run_blocking(move || {
            let work_file = processing_file_for(&queue_file);
            let renamed = with_enqueue_lock(&lock_file, || {
                match fs::rename(&queue_file, &work_file) {
                    Ok(()) => Ok(true),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
                    Err(err) => Err(err),
                }
            })?;

            if !renamed {
                return Ok(None);
            }

            // The processing file is exclusively owned from here on; no lock
            // is needed to read it.
            let entries = read_entries(&work_file)?;
            Ok(Some((entries, work_file)))
        })
        .await?;

        Ok(claimed.map(|(entries, work_file)| {
            debug!(count = entries.len(), work_file = %work_file.display(), "claimed queue");
            Box::new(FileClaimedBatch { entries, work_file }) as Box<dyn ClaimedBatch>
        }))
    }

    async fn requeue(&self, entries: &[String]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let queue_file = self.queue_file.clone();
        let lock_file = self.lock_file.clone();
        let entries = entries.to_vec();

        run_blocking(move || {
            with_enqueue_lock(&lock_file, || append_lines(&queue_file, &entries))
        })
        .await
    }

    async fn recover_stale(&self) -> Result<usize> {
        let queue_file = self.queue_file.clone();
        let lock_file = self.lock_file.clone();

        run_blocking(move || {
            let orphans = find_processing_files(&queue_file)?;
            if orphans.is_empty() {
                return Ok(0);
            }

            let mut recovered = 0;
            for orphan in orphans {
                let entries = read_entries(&orphan)?;
                with_enqueue_lock(&lock_file, || append_lines(&queue_file, &entries))?;
                fs::remove_file(&orphan)?;
                info!(
                    orphan = %orphan.display(),
                    entries = entries.len(),
                    "recovered orphaned processing file"
                );
                recovered += entries.len();
            }
            Ok(recovered)
        })
        .await
    }

    async fn pending(&self) -> Result<usize> {
        let queue_file = self.queue_file.clone();
        let lock_file = self.lock_file.clone();

        run_blocking(move || {
            with_enqueue_lock(&lock_file, || match fs::read_to_string(&queue_file) {
                Ok(content) => {
                    Ok(content.lines().filter(|line| !line.trim().is_empty()).count())
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(0),
                Err(err) => Err(err),
            })
        })
        .await
    }
}

/// One claimed batch backed by a processing file.
struct FileClaimedBatch {
    entries: Vec<String>,
    work_file: PathBuf,
}

#[async_trait]
impl ClaimedBatch for FileClaimedBatch {
    fn entries(&self) -> &[String] {
        &self.entries
    }

    async fn resolve(self: Box<Self>) -> Result<()> {
        let work_file = self.work_file;
        run_blocking(move || match fs::remove_file(&work_file) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!(work_file = %work_file.display(), "processing file already gone");
                Ok(())
            }
            Err(err) => Err(err),
        })
        .await
    }
}

/// Run a blocking filesystem section on the blocking pool and map errors.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|err| MirrorqError::from(InfraError::Join(err)))?
        .map_err(|err| MirrorqError::from(InfraError::Io(err)))
}

/// Execute `f` while holding the exclusive enqueue lock.
///
/// Blocks until the lock is available; an enqueue is never skipped due to
/// contention. The lock is released when the sentinel handle drops, on every
/// exit path.
fn with_enqueue_lock<T>(lock_file: &Path, f: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
    if let Some(parent) = lock_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let lock = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_file)?;
    lock.lock_exclusive()?;
    f()
}

fn append_lines(queue_file: &Path, entries: &[String]) -> io::Result<()> {
    if let Some(parent) = queue_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().append(true).create(true).open(queue_file)?;
    for entry in entries {
        writeln!(file, "{entry}")?;
    }
    file.sync_all()
}

fn read_entries(file: &Path) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(file)?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Private per-run processing file, a sibling of the queue file so the
/// claim rename stays on one filesystem volume.
fn processing_file_for(queue_file: &Path) -> PathBuf {
    let name = queue_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("queue"));
    queue_file.with_file_name(format!("{}.work.{}", name, Uuid::new_v4()))
}

/// Processing files left behind by runs that never resolved.
fn find_processing_files(queue_file: &Path) -> io::Result<Vec<PathBuf>> {
    let Some(dir) = queue_file.parent() else {
        return Ok(Vec::new());
    };
    let name = queue_file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("queue"));
    let prefix = format!("{name}.work.");

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut orphans: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .collect();
    orphans.sort();
    Ok(orphans)
}
