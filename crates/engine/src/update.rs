use std::{
    fs,
    path::Path,
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
};

use crossbeam::channel::{self, Receiver, Sender};
use hashbrown::HashMap;
use log::{debug, error, warn};
use pronto_fs::FsEvent;

use crate::{
    config::{BATCH_COMMIT_INTERVAL, BATCH_COMMIT_THRESHOLD},
    error::Result,
    index::{FileId, Index},
    index::builder::path_bytes,
};

#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Pending events in either batch that force a commit.
    pub batch_threshold: usize,
    /// Idle interval after which pending batches are committed anyway.
    pub commit_interval: std::time::Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        UpdaterConfig {
            batch_threshold: BATCH_COMMIT_THRESHOLD,
            commit_interval: BATCH_COMMIT_INTERVAL,
        }
    }
}

/// One staged mutation. Adds carry the stat fields captured at event time;
/// deletes only need the id they resolve to.
#[derive(Debug, Clone)]
struct PendingChange {
    id: FileId,
    path: Vec<u8>,
    mode: u32,
    uid: u32,
    gid: u32,
    mtime: i64,
}

/// Append-only staging list with path-keyed supersession: a later event for
/// the same path replaces the earlier record in place.
#[derive(Default)]
struct PendingBatch {
    records: Vec<PendingChange>,
    by_path: HashMap<Vec<u8>, usize>,
}

impl PendingBatch {
    fn stage(&mut self, change: PendingChange) {
        match self.by_path.get(&change.path) {
            Some(&idx) => self.records[idx] = change,
            None => {
                self.by_path.insert(change.path.clone(), self.records.len());
                self.records.push(change);
            }
        }
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn take(&mut self) -> Vec<PendingChange> {
        self.by_path.clear();
        std::mem::take(&mut self.records)
    }
}

struct Shared {
    index: Arc<RwLock<Index>>,
    running: AtomicBool,
    adds: Mutex<PendingBatch>,
    dels: Mutex<PendingBatch>,
    /// Path -> live id cache. The batcher owns it; the index never reads
    /// it. Misses fall back to an exact trie lookup under the read lock.
    path_ids: Mutex<HashMap<Vec<u8>, FileId>>,
    cfg: UpdaterConfig,
}

/// Owned handle over the incremental-update machinery: one background
/// thread draining the event stream into staged add/delete batches, merged
/// into the index when a batch fills up or the interval ticker fires.
pub struct Updater {
    shared: Arc<Shared>,
    stop_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Updater {
    pub fn spawn(
        index: Arc<RwLock<Index>>,
        events: Receiver<FsEvent>,
        cfg: UpdaterConfig,
    ) -> Self {
        let shared = Arc::new(Shared {
            index,
            running: AtomicBool::new(true),
            adds: Mutex::new(PendingBatch::default()),
            dels: Mutex::new(PendingBatch::default()),
            path_ids: Mutex::new(HashMap::new()),
            cfg,
        });

        let (stop_tx, stop_rx) = channel::bounded::<()>(1);

        let thread_shared = Arc::clone(&shared);
        let handle = std::thread::Builder::new()
            .name("pronto-updater".into())
            .spawn(move || update_loop(&thread_shared, events, stop_rx))
            .expect("spawn updater thread");

        Updater {
            shared,
            stop_tx,
            handle: Some(handle),
        }
    }

    /// Force a commit of whatever is staged right now.
    pub fn commit_now(&self) -> Result<()> {
        commit_updates(&self.shared)
    }

    /// (pending adds, pending deletes) currently staged.
    pub fn pending_counts(&self) -> (usize, usize) {
        let adds = self.shared.adds.lock().expect("adds lock poisoned").len();
        let dels = self.shared.dels.lock().expect("dels lock poisoned").len();
        (adds, dels)
    }

    /// Stop the background thread and run the final commit.
    pub fn stop(mut self) -> Result<()> {
        self.shared.running.store(false, Ordering::SeqCst);
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("[updater] background thread panicked");
        }
        commit_updates(&self.shared)
    }
}

impl Drop for Updater {
    fn drop(&mut self) {
        // stop() already joined if it ran; otherwise shut the thread down
        // without the final commit.
        self.shared.running.store(false, Ordering::SeqCst);
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn update_loop(shared: &Shared, events: Receiver<FsEvent>, stop_rx: Receiver<()>) {
    while shared.running.load(Ordering::SeqCst) {
        crossbeam::select! {
            recv(events) -> msg => match msg {
                Ok(event) => {
                    classify_event(shared, event);
                    maybe_commit(shared);
                }
                Err(_) => break, // event source closed
            },
            recv(stop_rx) -> _ => break,
            default(shared.cfg.commit_interval) => {
                // Periodic flush even when the stream idles.
                if let Err(e) = commit_updates(shared) {
                    error!("[updater] periodic commit failed: {e}");
                }
            }
        }
    }
}

fn maybe_commit(shared: &Shared) {
    let over = {
        let adds = shared.adds.lock().expect("adds lock poisoned").len();
        let dels = shared.dels.lock().expect("dels lock poisoned").len();
        adds >= shared.cfg.batch_threshold || dels >= shared.cfg.batch_threshold
    };
    if over && let Err(e) = commit_updates(shared) {
        error!("[updater] threshold commit failed: {e}");
    }
}

fn classify_event(shared: &Shared, event: FsEvent) {
    let bytes = path_bytes(&event.path);

    if event.kind.is_additive() {
        if hidden_basename(&event.path) {
            debug!("[updater] hidden entry ignored: {}", event.path.display());
            return;
        }

        let st = match fs::symlink_metadata(&event.path) {
            Ok(st) => st,
            Err(e) => {
                warn!("[updater] stat {} failed: {e}", event.path.display());
                return;
            }
        };
        if st.is_dir() {
            // Watch registration for new directories is the event
            // source's concern.
            return;
        }
        let (mode, uid, gid, mtime) = stat_fields(&st);

        let id = resolve_live_id(shared, &bytes)
            .unwrap_or_else(|| shared.index.read().expect("index lock poisoned").next_file_id());

        shared
            .path_ids
            .lock()
            .expect("path cache poisoned")
            .insert(bytes.clone(), id);

        shared.adds.lock().expect("adds lock poisoned").stage(PendingChange {
            id,
            path: bytes,
            mode,
            uid,
            gid,
            mtime,
        });
    } else {
        let Some(id) = resolve_live_id(shared, &bytes) else {
            debug!("[updater] delete for unknown path {}", event.path.display());
            return;
        };

        shared
            .path_ids
            .lock()
            .expect("path cache poisoned")
            .remove(&bytes);

        shared.dels.lock().expect("dels lock poisoned").stage(PendingChange {
            id,
            path: bytes,
            mode: 0,
            uid: 0,
            gid: 0,
            mtime: 0,
        });
    }
}

/// Resolve a path to its live id: the batcher's cache first, then an exact
/// trie lookup against the committed index.
fn resolve_live_id(shared: &Shared, path: &[u8]) -> Option<FileId> {
    if let Some(&id) = shared
        .path_ids
        .lock()
        .expect("path cache poisoned")
        .get(path)
    {
        return Some(id);
    }

    let index = shared.index.read().expect("index lock poisoned");
    let id = index.trie().lookup_exact(path)?;
    let meta = index.meta(id)?;
    (!meta.is_tombstone()).then_some(id)
}

/// Atomically snap both staged batches out, then apply them under the index
/// write lock: adds replay the builder's insert pipeline, deletes tombstone
/// their metadata, and the compression pass reseals the touched trigrams.
fn commit_updates(shared: &Shared) -> Result<()> {
    let adds = shared.adds.lock().expect("adds lock poisoned").take();
    let dels = shared.dels.lock().expect("dels lock poisoned").take();

    if adds.is_empty() && dels.is_empty() {
        return Ok(());
    }
    debug!(
        "[updater] committing {} adds, {} deletes",
        adds.len(),
        dels.len()
    );

    let mut index = shared.index.write().expect("index lock poisoned");

    for change in adds {
        let already_live = index
            .meta(change.id)
            .is_some_and(|m| !m.is_tombstone() && m.path == change.path);
        if already_live {
            index.refresh_metadata(change.id, change.mode, change.mtime);
            continue;
        }

        if let Err(e) = index.insert_path_with_id(
            change.id,
            &change.path,
            change.mode,
            change.uid,
            change.gid,
            change.mtime,
        ) {
            warn!("[updater] add failed for id {}: {e}", change.id);
        }
    }

    for change in dels {
        index.tombstone(change.id);
    }

    index.commit()
}

fn hidden_basename(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.as_encoded_bytes().first() == Some(&b'.'))
}

#[cfg(unix)]
fn stat_fields(st: &fs::Metadata) -> (u32, u32, u32, i64) {
    use std::os::unix::fs::MetadataExt;
    (st.mode(), st.uid(), st.gid(), st.mtime())
}

#[cfg(not(unix))]
fn stat_fields(_st: &fs::Metadata) -> (u32, u32, u32, i64) {
    (0o444, 0, 0, 0)
}

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;
