use super::*;
use pronto_engine::QueryContext;

fn test_config() -> IndexConfig {
    IndexConfig {
        primary_bloom_size: 1 << 16,
        secondary_bloom_size: 1 << 15,
        ..IndexConfig::default()
    }
}

fn caller_query(pattern: &[u8]) -> QueryContext {
    // uid 0 bypasses the permission gate; ownership of the temp files is
    // not what these tests exercise.
    QueryContext::new(pattern.to_vec(), 0, 0)
}

#[test]
fn scan_build_and_search_roundtrip() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path();
    std::fs::create_dir(root.join("docs")).expect("mkdir");
    std::fs::write(root.join("docs/notes.txt"), b"n").expect("write");
    std::fs::write(root.join("docs/photo.jpg"), b"p").expect("write");
    std::fs::write(root.join("top.rs"), b"t").expect("write");

    let ctx = create_scan_context(root);
    let index = build_index_from_scan(root, ctx, test_config()).expect("build");

    assert_eq!(index.live_file_count(), 3);

    let out = index.search(&caller_query(b"notes")).expect("search");
    assert_eq!(out.hits.len(), 1);
    assert!(out.hits[0].path.ends_with(b"docs/notes.txt"));
}

#[test]
fn open_or_build_creates_then_reopens() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let root = tmp.path().join("tree");
    std::fs::create_dir(&root).expect("mkdir");
    std::fs::write(root.join("alpha.cfg"), b"a").expect("write");
    let db = tmp.path().join("db/pronto.db");

    let built = open_or_build(&root, &db, test_config()).expect("build");
    assert!(db.exists());
    assert_eq!(built.live_file_count(), 1);

    // Second call loads the image instead of rescanning.
    std::fs::write(root.join("beta.cfg"), b"b").expect("write");
    let reopened = open_or_build(&root, &db, test_config()).expect("reopen");
    assert_eq!(reopened.live_file_count(), 1);

    let out = reopened.search(&caller_query(b"alpha")).expect("search");
    assert_eq!(out.hits.len(), 1);
}
