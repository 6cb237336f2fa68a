use std::path::Path;

use log::{info, warn};
use pronto_fs::PathRecord;

use crate::{
    config::IndexConfig,
    error::{EngineError, Result},
    index::Index,
};

/// Consumes the walker's `(path, stat)` record stream and populates a fresh
/// index. Closing the stream (`finish`) triggers the compression commit.
pub struct IndexBuilder {
    index: Index,
    added: u64,
    skipped: u64,
}

/// Raw path bytes for trigram and trie indexing.
///
/// On Unix we index the byte sequence as-is (no UTF-8 assumptions); other
/// platforms fall back to the lossy string form.
#[cfg(unix)]
pub(crate) fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(not(unix))]
pub(crate) fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

impl IndexBuilder {
    pub fn new(cfg: IndexConfig) -> Self {
        IndexBuilder {
            index: Index::new(cfg),
            added: 0,
            skipped: 0,
        }
    }

    pub fn add_batch<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = PathRecord>,
    {
        for rec in batch {
            self.add_record(&rec);
        }
    }

    /// Index one record. Directories are not stored; over-deep or over-long
    /// paths are logged and skipped, traversal carries on.
    pub fn add_record(&mut self, rec: &PathRecord) {
        if !rec.is_indexable() {
            return;
        }

        let depth = rec.path.components().count();
        if depth > self.index.config().max_depth {
            warn!(
                "[builder] {} exceeds depth cap ({depth} components), skipped",
                rec.path.display()
            );
            self.skipped += 1;
            return;
        }

        let bytes = path_bytes(&rec.path);
        match self
            .index
            .insert_path(&bytes, rec.mode, rec.uid, rec.gid, rec.mtime)
        {
            Ok(_) => self.added += 1,
            Err(e @ EngineError::PathTooLong { .. }) => {
                warn!("[builder] {}: {e}, skipped", rec.path.display());
                self.skipped += 1;
            }
            Err(e) => {
                // Allocation pressure: the failed insert is dropped, the
                // index stays usable.
                warn!("[builder] insert failed for {}: {e}", rec.path.display());
                self.skipped += 1;
            }
        }
    }

    pub fn added(&self) -> u64 {
        self.added
    }

    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Close the stream: compress all posting buffers and hand the index
    /// over.
    pub fn finish(mut self) -> Result<Index> {
        self.index.commit()?;
        info!(
            "[builder] indexed {} paths ({} skipped), {} distinct trigrams",
            self.added,
            self.skipped,
            self.index.table.len()
        );
        Ok(self.index)
    }
}
