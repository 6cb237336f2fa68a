use super::*;

#[test]
fn insert_then_get_finds_entry() {
    let mut table = EntryTable::new();
    assert!(table.is_empty());

    let e = table.get_or_insert(0x616263);
    e.buffer = Some(vec![1, 2, 3]);

    assert_eq!(table.len(), 1);
    let found = table.get(0x616263).expect("entry");
    assert_eq!(found.trigram, 0x616263);
    assert_eq!(found.buffer.as_deref(), Some(&[1u64, 2, 3][..]));

    assert!(table.get(0x717273).is_none());
}

#[test]
fn get_or_insert_is_idempotent_per_key() {
    let mut table = EntryTable::new();
    table.get_or_insert(7).buffer = Some(vec![1]);
    table
        .get_or_insert(7)
        .buffer
        .as_mut()
        .expect("existing buffer")
        .push(2);

    assert_eq!(table.len(), 1);
    assert_eq!(table.get(7).unwrap().buffer.as_deref(), Some(&[1u64, 2][..]));
}

#[test]
fn growth_preserves_all_entries() {
    let mut table = EntryTable::new();
    let initial_capacity = table.capacity();

    // Push well past the 0.7 load cap of the initial table.
    let n = initial_capacity * 2;
    for tri in 0..n as u32 {
        table.get_or_insert(tri).buffer = Some(vec![tri as u64]);
    }

    assert_eq!(table.len(), n);
    assert!(table.capacity() > initial_capacity);
    assert!(
        table.len() * 10 <= table.capacity() * 7,
        "load cap violated after growth"
    );

    for tri in 0..n as u32 {
        let entry = table.get(tri).expect("entry survives growth");
        assert_eq!(entry.buffer.as_deref(), Some(&[tri as u64][..]));
    }
}

#[test]
fn widely_spread_keys_all_resolve() {
    let mut table = EntryTable::new();
    let mask = table.capacity() as u32;
    let keys: Vec<u32> = (0..8).map(|i| 5 + i * mask).collect();

    for &k in &keys {
        table.get_or_insert(k).file_count = k;
    }
    for &k in &keys {
        assert_eq!(table.get(k).expect("colliding key").file_count, k);
    }
    assert_eq!(table.len(), keys.len());
}

#[test]
fn iter_yields_only_live_entries() {
    let mut table = EntryTable::new();
    for tri in [1u32, 100, 10_000] {
        table.get_or_insert(tri);
    }

    let mut seen: Vec<u32> = table.iter().map(|e| e.trigram).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 100, 10_000]);
}
