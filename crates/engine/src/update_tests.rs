use super::*;
use std::time::{Duration, Instant};

use crossbeam::channel::unbounded;
use pronto_fs::FsEventKind;

use crate::{config::IndexConfig, index::Index, query::QueryContext};

fn test_config() -> IndexConfig {
    IndexConfig {
        primary_bloom_size: 1 << 16,
        secondary_bloom_size: 1 << 15,
        ..IndexConfig::default()
    }
}

fn slow_ticker() -> UpdaterConfig {
    UpdaterConfig {
        batch_threshold: BATCH_COMMIT_THRESHOLD,
        commit_interval: Duration::from_secs(60),
    }
}

fn shared_index(paths: &[&[u8]]) -> Arc<RwLock<Index>> {
    let mut index = Index::new(test_config());
    for path in paths {
        index
            .insert_path(path, 0o100644, 1000, 1000, 0)
            .expect("insert");
    }
    index.commit().expect("commit");
    Arc::new(RwLock::new(index))
}

fn search(index: &Arc<RwLock<Index>>, pattern: &[u8]) -> Vec<Vec<u8>> {
    let guard = index.read().expect("read lock");
    let out = guard
        .search(&QueryContext::new(pattern.to_vec(), 1000, 1000))
        .expect("search");
    out.hits.into_iter().map(|h| h.path).collect()
}

fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn delete_event_tombstones_builder_indexed_path() {
    let index = shared_index(&[b"/x/file"]);
    let (tx, rx) = unbounded();
    let updater = Updater::spawn(Arc::clone(&index), rx, slow_ticker());

    tx.send(FsEvent::new(FsEventKind::Delete, "/x/file"))
        .expect("send");
    wait_until("delete staged", || updater.pending_counts() == (0, 1));

    updater.commit_now().expect("commit");
    assert!(search(&index, b"file").is_empty());
    updater.stop().expect("stop");
}

#[test]
fn create_event_indexes_new_file() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let file = tmp.path().join("report.txt");
    std::fs::write(&file, b"contents").expect("write");

    let index = shared_index(&[]);
    let (tx, rx) = unbounded();
    let updater = Updater::spawn(Arc::clone(&index), rx, slow_ticker());

    tx.send(FsEvent::new(FsEventKind::Create, file.clone()))
        .expect("send");
    wait_until("create staged", || updater.pending_counts() == (1, 0));

    updater.commit_now().expect("commit");

    let hits = search(&index, b"report");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0], path_bytes(&file));
    updater.stop().expect("stop");
}

#[test]
fn hidden_basenames_are_ignored_on_add() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let hidden = tmp.path().join(".secret-cache");
    let visible = tmp.path().join("visible.txt");
    std::fs::write(&hidden, b"x").expect("write");
    std::fs::write(&visible, b"x").expect("write");

    let index = shared_index(&[]);
    let (tx, rx) = unbounded();
    let updater = Updater::spawn(Arc::clone(&index), rx, slow_ticker());

    tx.send(FsEvent::new(FsEventKind::Create, hidden)).expect("send");
    tx.send(FsEvent::new(FsEventKind::Create, visible)).expect("send");
    // The visible file lands in the batch; the hidden one never does.
    wait_until("visible staged", || updater.pending_counts() == (1, 0));

    updater.commit_now().expect("commit");
    assert_eq!(search(&index, b"visible").len(), 1);
    assert!(search(&index, b"secret").is_empty());
    updater.stop().expect("stop");
}

#[test]
fn later_event_for_same_path_supersedes_earlier() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let file = tmp.path().join("twice.log");
    let marker = tmp.path().join("marker.log");
    std::fs::write(&file, b"x").expect("write");
    std::fs::write(&marker, b"x").expect("write");

    let index = shared_index(&[]);
    let (tx, rx) = unbounded();
    let updater = Updater::spawn(Arc::clone(&index), rx, slow_ticker());

    tx.send(FsEvent::new(FsEventKind::Create, file.clone())).expect("send");
    tx.send(FsEvent::new(FsEventKind::Modify, file.clone())).expect("send");
    tx.send(FsEvent::new(FsEventKind::Create, marker)).expect("send");

    // Two distinct paths staged, not three records.
    wait_until("events staged", || updater.pending_counts() == (2, 0));

    updater.commit_now().expect("commit");
    assert_eq!(search(&index, b"twice").len(), 1);
    updater.stop().expect("stop");
}

#[test]
fn duplicate_add_reuses_the_live_id() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let file = tmp.path().join("stable.txt");
    std::fs::write(&file, b"x").expect("write");

    let index = shared_index(&[]);
    let (tx, rx) = unbounded();
    let updater = Updater::spawn(Arc::clone(&index), rx, slow_ticker());

    tx.send(FsEvent::new(FsEventKind::Create, file.clone())).expect("send");
    wait_until("first staged", || updater.pending_counts() == (1, 0));
    updater.commit_now().expect("commit");

    let before = index.read().expect("read lock").file_count();

    tx.send(FsEvent::new(FsEventKind::Modify, file.clone())).expect("send");
    wait_until("second staged", || updater.pending_counts() == (1, 0));
    updater.commit_now().expect("commit");

    let guard = index.read().expect("read lock");
    assert_eq!(guard.file_count(), before, "re-add must not mint a new id");
    drop(guard);
    assert_eq!(search(&index, b"stable").len(), 1);
    updater.stop().expect("stop");
}

#[test]
fn batch_threshold_forces_commit() {
    let tmp = tempfile::tempdir().expect("tempdir");
    for i in 0..2 {
        std::fs::write(tmp.path().join(format!("bulk-{i}.dat")), b"x").expect("write");
    }

    let index = shared_index(&[]);
    let (tx, rx) = unbounded();
    let cfg = UpdaterConfig {
        batch_threshold: 2,
        commit_interval: Duration::from_secs(60),
    };
    let updater = Updater::spawn(Arc::clone(&index), rx, cfg);

    for i in 0..2 {
        tx.send(FsEvent::new(
            FsEventKind::Create,
            tmp.path().join(format!("bulk-{i}.dat")),
        ))
        .expect("send");
    }

    // No explicit commit: the threshold fires inside the update thread.
    wait_until("threshold commit", || {
        index.read().expect("read lock").live_file_count() == 2
    });
    assert_eq!(search(&index, b"bulk").len(), 2);
    updater.stop().expect("stop");
}

#[test]
fn stop_runs_a_final_commit() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let file = tmp.path().join("parting.txt");
    std::fs::write(&file, b"x").expect("write");

    let index = shared_index(&[]);
    let (tx, rx) = unbounded();
    let updater = Updater::spawn(Arc::clone(&index), rx, slow_ticker());

    tx.send(FsEvent::new(FsEventKind::Create, file)).expect("send");
    wait_until("staged", || updater.pending_counts() == (1, 0));

    updater.stop().expect("stop");
    assert_eq!(search(&index, b"parting").len(), 1);
}

#[test]
fn move_out_behaves_like_delete() {
    let index = shared_index(&[b"/mnt/moved-away.iso"]);
    let (tx, rx) = unbounded();
    let updater = Updater::spawn(Arc::clone(&index), rx, slow_ticker());

    tx.send(FsEvent::new(FsEventKind::MoveOut, "/mnt/moved-away.iso"))
        .expect("send");
    wait_until("move staged", || updater.pending_counts() == (0, 1));

    updater.commit_now().expect("commit");
    assert!(search(&index, b"moved").is_empty());
    updater.stop().expect("stop");
}

#[test]
fn delete_for_unknown_path_is_dropped() {
    let index = shared_index(&[b"/known"]);
    let (tx, rx) = unbounded();
    let updater = Updater::spawn(Arc::clone(&index), rx, slow_ticker());

    tx.send(FsEvent::new(FsEventKind::Delete, "/never/indexed"))
        .expect("send");
    tx.send(FsEvent::new(FsEventKind::Delete, "/known")).expect("send");

    wait_until("known delete staged", || updater.pending_counts() == (0, 1));
    updater.commit_now().expect("commit");
    assert_eq!(index.read().expect("read lock").live_file_count(), 0);
    updater.stop().expect("stop");
}
