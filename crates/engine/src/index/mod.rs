use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};

use crate::{
    bloom::DualBloom,
    config::{IndexConfig, PATH_MAX},
    error::{EngineError, Result},
    postings::{Decoder, Sealer},
    trie::PathTrie,
    trigram::{Trigram, extract_into},
};

pub mod builder;
pub mod persist;
pub mod table;

pub use builder::IndexBuilder;
pub use table::{Entry, EntryTable};

pub type FileId = u64;

/// Sentinel for "no such file".
pub const INVALID_FILE_ID: FileId = FileId::MAX;

/// Per-file metadata record. Owned by the index; created on first sighting,
/// mutated only through the update path, tombstoned on delete.
#[derive(Debug, Clone)]
pub struct FileMeta {
    pub id: FileId,
    /// Absolute path bytes. Empty once the id is tombstoned.
    pub path: Vec<u8>,
    /// POSIX mode bits.
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    /// Last modified, seconds since Unix epoch.
    pub mtime: i64,
}

impl FileMeta {
    #[inline]
    pub fn is_tombstone(&self) -> bool {
        self.path.is_empty()
    }

    fn tombstone(id: FileId) -> Self {
        FileMeta {
            id,
            path: Vec::new(),
            mode: 0,
            uid: 0,
            gid: 0,
            mtime: 0,
        }
    }
}

/// The in-memory search index: dual bloom filter, path trie, trigram entry
/// table and its compressed posting arena, and the file metadata vector.
///
/// One reader-writer lock around the whole value is the concurrency model:
/// query workers share `&Index`, while the builder and the update committer
/// take `&mut Index`. Only `next_file_id` is callable from the read side of
/// a mutation (it backs id pre-assignment in the update batcher), which is
/// why it is an atomic rather than a plain counter.
pub struct Index {
    pub(crate) cfg: IndexConfig,
    pub(crate) bloom: DualBloom,
    pub(crate) trie: PathTrie,
    pub(crate) table: EntryTable,
    /// Compressed posting payloads, back to back. Entries address into
    /// this by (offset, size).
    pub(crate) arena: Vec<u8>,
    /// Indexed by id. Gaps (ids assigned but never committed) hold
    /// tombstone placeholders.
    pub(crate) metas: Vec<FileMeta>,
    pub(crate) live_files: u64,
    pub(crate) next_id: AtomicU64,
    /// Trigram extraction scratch, reused across inserts.
    scratch: Vec<Trigram>,
}

impl Index {
    pub fn new(cfg: IndexConfig) -> Self {
        let bloom = DualBloom::new(
            cfg.primary_bloom_size,
            cfg.secondary_bloom_size,
            cfg.bloom_hash_count,
        );
        Index {
            cfg,
            bloom,
            trie: PathTrie::new(),
            table: EntryTable::new(),
            arena: Vec::new(),
            metas: Vec::new(),
            live_files: 0,
            next_id: AtomicU64::new(0),
            scratch: Vec::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(IndexConfig::default())
    }

    pub fn config(&self) -> &IndexConfig {
        &self.cfg
    }

    pub fn bloom(&self) -> &DualBloom {
        &self.bloom
    }

    pub fn trie(&self) -> &PathTrie {
        &self.trie
    }

    /// Total ids ever assigned (tombstones included).
    pub fn file_count(&self) -> usize {
        self.metas.len()
    }

    /// Files currently live (not tombstoned). This is the `N` of the
    /// relevance scorer.
    pub fn live_file_count(&self) -> u64 {
        self.live_files
    }

    pub fn meta(&self, id: FileId) -> Option<&FileMeta> {
        self.metas.get(id as usize)
    }

    /// Claim the next free file id. Monotonic; never reused within one
    /// index lifetime.
    pub fn next_file_id(&self) -> FileId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Run the full insert pipeline for a new path: metadata record, trie
    /// insertion (full path plus every component suffix, so short queries
    /// match basenames), trigram postings and bloom bits.
    pub fn insert_path(
        &mut self,
        path: &[u8],
        mode: u32,
        uid: u32,
        gid: u32,
        mtime: i64,
    ) -> Result<FileId> {
        let id = self.next_file_id();
        self.insert_path_with_id(id, path, mode, uid, gid, mtime)?;
        Ok(id)
    }

    /// Insert pipeline for a pre-assigned id (update batcher).
    pub(crate) fn insert_path_with_id(
        &mut self,
        id: FileId,
        path: &[u8],
        mode: u32,
        uid: u32,
        gid: u32,
        mtime: i64,
    ) -> Result<()> {
        if path.len() > PATH_MAX {
            return Err(EngineError::PathTooLong { len: path.len() });
        }
        if path.is_empty() {
            debug_assert!(false, "empty path");
            return Ok(());
        }

        let slot = id as usize;
        while self.metas.len() <= slot {
            let gap = self.metas.len() as FileId;
            self.metas.push(FileMeta::tombstone(gap));
        }
        let was_live = !self.metas[slot].is_tombstone();
        if was_live && self.metas[slot].path != path {
            warn!("[index] id {id} already bound to another path, dropping insert");
            return Ok(());
        }
        self.metas[slot] = FileMeta {
            id,
            path: path.to_vec(),
            mode,
            uid,
            gid,
            mtime,
        };
        if !was_live {
            self.live_files += 1;
        }

        insert_trie_paths(&mut self.trie, path, id);

        // Postings and bloom, one append per distinct trigram.
        let mut tris = std::mem::take(&mut self.scratch);
        extract_into(path, false, &mut tris);
        tris.sort_unstable();
        tris.dedup();
        let mut result = Ok(());
        for &tri in &tris {
            self.bloom.add(tri);
            let entry = self.table.get_or_insert(tri.as_u32());
            let buf = entry.buffer.get_or_insert_with(Vec::new);
            if buf.len() == buf.capacity() {
                if let Err(e) = buf.try_reserve((buf.capacity() * 2).max(4)) {
                    // Partial appends are tolerated: the bloom may
                    // over-count, posting dedup happens at commit.
                    result = Err(EngineError::Alloc(e));
                    break;
                }
            }
            buf.push(id);
        }
        self.scratch = tris;
        result
    }

    /// Refresh mutable metadata for a live id (duplicate-add events).
    pub(crate) fn refresh_metadata(&mut self, id: FileId, mode: u32, mtime: i64) {
        if let Some(meta) = self.metas.get_mut(id as usize)
            && !meta.is_tombstone()
        {
            meta.mode = mode;
            meta.mtime = mtime;
        }
    }

    /// Tombstone an id: the metadata path is cleared, postings are left in
    /// place and filtered against metadata at query time.
    pub fn tombstone(&mut self, id: FileId) -> bool {
        match self.metas.get_mut(id as usize) {
            Some(meta) if !meta.is_tombstone() => {
                meta.path.clear();
                self.live_files = self.live_files.saturating_sub(1);
                true
            }
            _ => {
                debug!("[index] tombstone for unknown id {id}");
                false
            }
        }
    }

    /// Seal every entry with a pending posting buffer: sort, dedup, delta,
    /// Golomb-Rice, zstd, append to the arena. Entries sealed earlier and
    /// touched again since are merged with their decoded payload first.
    ///
    /// On a compression failure the pending buffers stay in place, so a
    /// retry loses nothing.
    pub fn commit(&mut self) -> Result<()> {
        let mut sealer = Sealer::new()?;
        let mut decoder: Option<Decoder> = None;

        let Index { table, arena, .. } = self;

        for entry in table.iter_mut() {
            if entry.buffer.is_none() {
                continue;
            }

            if entry.is_sealed() {
                // Incremental touch of an already-sealed list: fold the old
                // payload into the pending buffer before resealing.
                let dec = match decoder.as_mut() {
                    Some(d) => d,
                    None => decoder.insert(Decoder::new()?),
                };
                let old = dec.decode(&arena[entry.offset..entry.offset + entry.size])?;
                entry
                    .buffer
                    .as_mut()
                    .expect("pending buffer")
                    .extend_from_slice(&old);
            }

            let buf = entry.buffer.as_mut().expect("pending buffer");
            let (payload, count) = sealer.seal(buf)?;

            entry.offset = arena.len();
            entry.size = payload.len();
            entry.file_count = count;
            arena.extend_from_slice(&payload);
            entry.buffer = None;
        }

        Ok(())
    }

    /// Compressed payload bytes of a sealed entry.
    pub(crate) fn payload(&self, entry: &Entry) -> &[u8] {
        &self.arena[entry.offset..entry.offset + entry.size]
    }

    pub(crate) fn entry(&self, tri: Trigram) -> Option<&Entry> {
        self.table.get(tri.as_u32())
    }
}

/// Trie insertion policy: the full path, then each component suffix, so
/// sub-trigram queries can match path tails like bare file names.
pub(crate) fn insert_trie_paths(trie: &mut PathTrie, path: &[u8], id: FileId) {
    trie.insert(path, id);
    for (i, &b) in path.iter().enumerate() {
        if b == b'/' && i + 1 < path.len() {
            trie.insert(&path[i + 1..], id);
        }
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
