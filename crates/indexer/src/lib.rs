use std::{path::Path, sync::Arc, thread};

use anyhow::{Context, Error, Result};
use crossbeam::channel;
use log::info;
use pronto_engine::{Index, IndexBuilder, IndexConfig, load_index, write_index_atomic};
use pronto_fs::{IgnoreEngine, PathRecord, ScanContext, walk_parallel};

pub fn create_scan_context(root: &Path) -> Arc<ScanContext> {
    Arc::new(ScanContext {
        ignore: IgnoreEngine::with_defaults(root),
        ..ScanContext::default()
    })
}

/// Build an in-memory index from a filesystem scan rooted at `root`.
pub fn build_index_from_scan(
    root: &Path,
    ctx: Arc<ScanContext>,
    cfg: IndexConfig,
) -> Result<Index> {
    let (record_tx, record_rx) = channel::unbounded::<Vec<PathRecord>>();

    let num_threads = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4);

    let walker_handle = {
        let ctx = Arc::clone(&ctx);
        let root = root.to_path_buf();
        let tx = record_tx.clone();

        thread::spawn(move || walk_parallel(vec![root], tx, ctx, num_threads))
    };

    drop(record_tx);

    let mut builder = IndexBuilder::new(cfg);

    while let Ok(batch) = record_rx.recv() {
        builder.add_batch(batch);
    }

    let walk_result = walker_handle
        .join()
        .map_err(|_| Error::msg("filesystem walker thread panicked"))?;
    walk_result?;

    builder.finish().context("commit failed after scan")
}

/// Build an index from a scan and write it to `db_path`.
pub fn build_and_save(root: &Path, db_path: &Path, cfg: IndexConfig) -> Result<Index> {
    let ctx = create_scan_context(root);
    let index = build_index_from_scan(root, ctx, cfg)?;

    write_index_atomic(db_path, &index)
        .with_context(|| format!("failed to write database to {}", db_path.display()))?;
    info!(
        "[indexer] wrote {} paths to {}",
        index.live_file_count(),
        db_path.display()
    );

    Ok(index)
}

/// Open an existing database, or scan and build one if it is missing.
pub fn open_or_build(root: &Path, db_path: &Path, cfg: IndexConfig) -> Result<Index> {
    if db_path.exists() {
        load_index(db_path, cfg)
            .with_context(|| format!("failed to open database at {}", db_path.display()))
    } else {
        build_and_save(root, db_path, cfg)
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
