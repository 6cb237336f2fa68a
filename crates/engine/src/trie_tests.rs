use super::*;

#[test]
fn insert_and_exact_lookup() {
    let mut trie = PathTrie::new();
    trie.insert(b"/etc/hosts", 7);
    trie.insert(b"/etc/hostname", 8);

    assert_eq!(trie.lookup_exact(b"/etc/hosts"), Some(7));
    assert_eq!(trie.lookup_exact(b"/etc/hostname"), Some(8));
    assert_eq!(trie.lookup_exact(b"/etc/host"), None);
    assert_eq!(trie.lookup_exact(b"/etc/hosts2"), None);
}

#[test]
fn reinsert_updates_terminal_id() {
    let mut trie = PathTrie::new();
    trie.insert(b"/tmp/a", 1);
    trie.insert(b"/tmp/a", 2);
    assert_eq!(trie.lookup_exact(b"/tmp/a"), Some(2));
}

#[test]
fn prefix_collects_terminals_in_dfs_order() {
    let mut trie = PathTrie::new();
    trie.insert(b"abacus", 0);
    trie.insert(b"abbey", 1);
    trie.insert(b"ab", 2);

    let ids = trie.find_prefix(b"ab", 10);
    // Pre-order: the terminal at "ab" itself first, then descendants by byte.
    assert_eq!(ids, vec![2, 0, 1]);

    assert_eq!(trie.find_prefix(b"aba", 10), vec![0]);
    assert!(trie.find_prefix(b"zz", 10).is_empty());
}

#[test]
fn prefix_respects_max_results() {
    let mut trie = PathTrie::new();
    for (i, p) in [&b"pa"[..], b"pb", b"pc", b"pd"].iter().enumerate() {
        trie.insert(p, i as FileId);
    }

    assert_eq!(trie.find_prefix(b"p", 2).len(), 2);
    assert!(trie.find_prefix(b"p", 0).is_empty());
}

#[test]
fn runs_are_collapsed_onto_run_edges() {
    let mut trie = PathTrie::new();
    let before = trie.node_count();
    trie.insert(b"xaaaaaaay", 3);
    // x + run(a,7) + y: three nodes, not nine.
    assert_eq!(trie.node_count() - before, 3);

    assert_eq!(trie.lookup_exact(b"xaaaaaaay"), Some(3));
    assert_eq!(trie.lookup_exact(b"xaaay"), None);
    assert_eq!(trie.find_prefix(b"xaaa", 10), vec![3]);
    assert_eq!(trie.find_prefix(b"xaaaaaaa", 10), vec![3]);
}

#[test]
fn repeated_byte_paths_roundtrip_byte_exact() {
    let mut trie = PathTrie::new();
    let inputs: [&[u8]; 4] = [b"/aa/bbb", b"/aa/bb", b"/aaab", b"/a"];
    for (i, p) in inputs.iter().enumerate() {
        trie.insert(p, i as FileId);
    }

    let mut yielded = trie.paths();
    yielded.sort();
    let mut expected: Vec<(Vec<u8>, FileId)> = inputs
        .iter()
        .enumerate()
        .map(|(i, p)| (p.to_vec(), i as FileId))
        .collect();
    expected.sort();
    assert_eq!(yielded, expected);
}

#[test]
fn differing_run_lengths_of_same_byte_coexist() {
    let mut trie = PathTrie::new();
    trie.insert(b"aab", 1);
    trie.insert(b"aaab", 2); // longer run than the existing edge
    trie.insert(b"ab", 3);

    assert_eq!(trie.lookup_exact(b"aab"), Some(1));
    assert_eq!(trie.lookup_exact(b"aaab"), Some(2));
    assert_eq!(trie.lookup_exact(b"ab"), Some(3));

    let mut ids = trie.find_prefix(b"aa", 10);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn shorter_run_than_existing_edge_falls_back_to_plain_edges() {
    let mut trie = PathTrie::new();
    trie.insert(b"aaaab", 1); // run(a,4) claims the slot
    trie.insert(b"aab", 2); // shorter run expands byte-wise

    assert_eq!(trie.lookup_exact(b"aaaab"), Some(1));
    assert_eq!(trie.lookup_exact(b"aab"), Some(2));

    let mut ids = trie.find_prefix(b"aa", 10);
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn query_ending_inside_a_run_is_a_prefix_match() {
    let mut trie = PathTrie::new();
    trie.insert(b"zaaaa", 9);

    assert_eq!(trie.find_prefix(b"za", 10), vec![9]);
    assert_eq!(trie.find_prefix(b"zaa", 10), vec![9]);
    assert_eq!(trie.find_prefix(b"zaaaa", 10), vec![9]);
    assert!(trie.find_prefix(b"zaaaaa", 10).is_empty());
}

#[test]
fn literal_0xff_bytes_use_the_run_slot() {
    let mut trie = PathTrie::new();
    let path = [b'/', 0xFF, b'x'];
    trie.insert(&path, 4);

    assert_eq!(trie.lookup_exact(&path), Some(4));
    assert_eq!(trie.find_prefix(&path[..2], 10), vec![4]);
}

#[test]
fn empty_path_is_ignored() {
    let mut trie = PathTrie::new();
    trie.insert(b"", 1);
    assert_eq!(trie.lookup_exact(b""), None);
    assert!(trie.paths().is_empty());
}
