use std::{
    fs,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use crossbeam::channel::{self, RecvTimeoutError, Sender};
use log::{debug, warn};

use crate::{
    config::{BATCH_SIZE, MAX_SCAN_DEPTH},
    excludes::IgnoreEngine,
    record::PathRecord,
};

pub struct ScanContext {
    pub ignore: IgnoreEngine,
    /// Depth cap relative to the scan root.
    pub max_depth: usize,
}

impl Default for ScanContext {
    fn default() -> Self {
        ScanContext {
            ignore: IgnoreEngine::default(),
            max_depth: MAX_SCAN_DEPTH,
        }
    }
}

/// One directory waiting to be scanned.
struct WorkUnit {
    dir: PathBuf,
    depth: usize,
}

/// Parallel filesystem walk.
///
/// Directories flow through a shared work queue that `num_threads` scan
/// workers steal from; regular files and symlinks come out of `record_tx`
/// in batches. `outstanding` counts queued-but-unfinished directories, and
/// the worker that finishes the last one ends the walk. Blocks until the
/// walk completes.
pub fn walk_parallel(
    roots: Vec<PathBuf>,
    record_tx: Sender<Vec<PathRecord>>,
    ctx: Arc<ScanContext>,
    num_threads: usize,
) -> std::io::Result<()> {
    let (work_tx, work_rx) = channel::unbounded::<WorkUnit>();
    let outstanding = Arc::new(AtomicUsize::new(roots.len()));

    for dir in roots {
        let _ = work_tx.send(WorkUnit { dir, depth: 0 });
    }

    debug!("[walk] {num_threads} scan workers");

    thread::scope(|scope| {
        for _ in 0..num_threads {
            let work_rx = work_rx.clone();
            let work_tx = work_tx.clone();
            let record_tx = record_tx.clone();
            let ctx = Arc::clone(&ctx);
            let outstanding = Arc::clone(&outstanding);

            scope.spawn(move || {
                let mut batch = Vec::with_capacity(BATCH_SIZE);

                loop {
                    // Short timeout so idle workers notice the walk ending.
                    let unit = match work_rx.recv_timeout(Duration::from_millis(50)) {
                        Ok(unit) => unit,
                        Err(RecvTimeoutError::Timeout) => {
                            if outstanding.load(Ordering::Acquire) == 0 {
                                break;
                            }
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    };

                    scan_dir(&unit, &work_tx, &mut batch, &ctx, &outstanding);

                    if batch.len() >= BATCH_SIZE
                        && record_tx.send(std::mem::take(&mut batch)).is_err()
                    {
                        return;
                    }

                    // This directory is done; a zero count means no worker
                    // holds or can receive more work.
                    if outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
                        break;
                    }
                }

                if !batch.is_empty() {
                    let _ = record_tx.send(batch);
                }
            });
        }
    });

    Ok(())
}

/// Scan one directory: subdirectories go back onto the work queue, file
/// records land in `batch`. Anything unreadable is logged and skipped so
/// one bad directory never stops the walk.
fn scan_dir(
    unit: &WorkUnit,
    work_tx: &channel::Sender<WorkUnit>,
    batch: &mut Vec<PathRecord>,
    ctx: &ScanContext,
    outstanding: &AtomicUsize,
) {
    let entries = match fs::read_dir(&unit.dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("[walk] read_dir({:?}): {e}", unit.dir);
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("[walk] bad entry under {:?}: {e}", unit.dir);
                continue;
            }
        };

        let record = match inspect_entry(&entry, ctx) {
            Ok(Some(record)) => record,
            Ok(None) => continue,
            Err(e) => {
                warn!("[walk] stat {:?}: {e}", entry.path());
                continue;
            }
        };

        if record.is_dir {
            if unit.depth + 1 >= ctx.max_depth {
                warn!("[walk] depth cap reached, skipping {:?}", record.path);
                continue;
            }
            outstanding.fetch_add(1, Ordering::AcqRel);
            let _ = work_tx.send(WorkUnit {
                dir: record.path,
                depth: unit.depth + 1,
            });
        } else {
            batch.push(record);
        }
    }
}

/// Stat one entry (without following symlinks) into a record. Ignored
/// subtrees and special files (sockets, fifos, devices) come back as
/// `None`.
fn inspect_entry(entry: &fs::DirEntry, ctx: &ScanContext) -> std::io::Result<Option<PathRecord>> {
    let metadata = entry.metadata()?;
    let path = entry.path();

    let is_dir = metadata.is_dir();
    let is_symlink = metadata.is_symlink();

    if !is_dir && !is_symlink && !metadata.is_file() {
        return Ok(None);
    }
    if ctx.ignore.is_ignored(&path, is_dir) {
        return Ok(None);
    }

    let (mode, uid, gid, mtime) = owner_bits(&metadata);

    Ok(Some(PathRecord {
        path,
        size: if is_dir { 0 } else { metadata.len() },
        mode,
        uid,
        gid,
        mtime,
        is_dir,
        is_symlink,
    }))
}

#[cfg(unix)]
fn owner_bits(metadata: &fs::Metadata) -> (u32, u32, u32, i64) {
    use std::os::unix::fs::MetadataExt;
    (
        metadata.mode(),
        metadata.uid(),
        metadata.gid(),
        metadata.mtime(),
    )
}

#[cfg(not(unix))]
fn owner_bits(_metadata: &fs::Metadata) -> (u32, u32, u32, i64) {
    // No POSIX owner model; everything reads as world-readable root-owned.
    (0o444, 0, 0, 0)
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;
