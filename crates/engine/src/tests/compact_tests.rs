use super::helpers::{map_of, tree_of};
use crate::{Store, StoreOptions};
use arena::{MAX_PACKED_LEN, SUBTREE_SENTINEL};
use tree::{EncodedStr, Tree, Value};

fn store_with(locale: &str, data: Tree) -> Store {
    let mut store = Store::new();
    store
        .store_translations(locale, data, &StoreOptions::default())
        .unwrap();
    store.compact().unwrap();
    store
}

#[test]
fn leaf_and_subtree_lookup_after_compaction() {
    let store = store_with(
        "en",
        tree_of(vec![("foo", map_of(vec![("bar", Value::str("baz"))]))]),
    );

    assert_eq!(store.lookup("en", "foo.bar", &[]), Some(Value::str("baz")));
    assert_eq!(
        store.lookup("en", "foo", &[]),
        Some(map_of(vec![("bar", Value::str("baz"))]))
    );
}

#[test]
fn identical_strings_share_one_arena_copy() {
    let store = store_with(
        "en",
        tree_of(vec![("a", Value::str("hello")), ("b", Value::str("hello"))]),
    );

    let index = store.index().unwrap();
    assert_eq!(index.arena_bytes(), 5);

    let idx_a = index.schema.lookup("a").unwrap();
    let idx_b = index.schema.lookup("b").unwrap();
    let column = index.columns.get("en").unwrap();
    // Bit-for-bit equal packed words.
    assert_eq!(column.get(idx_a), column.get(idx_b));
}

#[test]
fn arrays_round_trip_as_object_slots() {
    let items = Value::Array(vec![
        Value::str("red"),
        Value::str("green"),
        Value::str("blue"),
    ]);
    let store = store_with("en", tree_of(vec![("items", items.clone())]));

    assert_eq!(store.lookup("en", "items", &[]), Some(items));
    assert_eq!(store.index().unwrap().object_count(), 1);
}

#[test]
fn oversize_string_spills_to_object_table() {
    let long = "x".repeat(70_000);
    let store = store_with("en", tree_of(vec![("big", Value::str(long.clone()))]));

    let index = store.index().unwrap();
    assert_eq!(index.object_count(), 1);
    assert_eq!(index.arena_bytes(), 0);

    // The packed word must be an object reference, never a string ref.
    let idx = index.schema.lookup("big").unwrap();
    assert!(index.columns.get("en").unwrap().get(idx) < 0);

    match store.lookup("en", "big", &[]) {
        Some(Value::Str(s)) => {
            assert_eq!(s.len(), 70_000);
            assert_eq!(s.as_str(), Some(long.as_str()));
        }
        other => panic!("expected the long string back, got {other:?}"),
    }
}

#[test]
fn packed_length_boundary() {
    let exact = "y".repeat(MAX_PACKED_LEN);
    let over = "y".repeat(MAX_PACKED_LEN + 1);
    let store = store_with(
        "en",
        tree_of(vec![
            ("exact", Value::str(exact.clone())),
            ("over", Value::str(over)),
        ]),
    );

    let index = store.index().unwrap();
    // 65 535 bytes packs into the arena; 65 536 spills.
    assert_eq!(index.arena_bytes(), MAX_PACKED_LEN as u64);
    assert_eq!(index.object_count(), 1);

    let idx_exact = index.schema.lookup("exact").unwrap();
    assert!(index.columns.get("en").unwrap().get(idx_exact) >= 0);
    assert_eq!(store.lookup("en", "exact", &[]), Some(Value::str(exact)));
}

#[test]
fn empty_locale_compacts_to_an_empty_column() {
    let store = store_with("en", Tree::new());

    assert!(store.is_compacted("en"));
    assert_eq!(store.index().unwrap().column_len("en"), Some(0));
    assert_eq!(store.lookup("en", "anything", &[]), None);
}

#[test]
fn single_root_leaf() {
    let store = store_with("en", tree_of(vec![("hello", Value::str("world"))]));
    assert_eq!(store.lookup("en", "hello", &[]), Some(Value::str("world")));
    assert_eq!(store.index().unwrap().schema_len(), 1);
}

#[test]
fn interior_keys_hold_the_subtree_sentinel() {
    let store = store_with(
        "en",
        tree_of(vec![(
            "menu",
            map_of(vec![("file", map_of(vec![("open", Value::str("Open"))]))]),
        )]),
    );

    let index = store.index().unwrap();
    let column = index.columns.get("en").unwrap();

    // Every schema key with a descendant holds the sentinel, never a leaf.
    for (idx, key) in index.schema.iter() {
        let has_descendant = index
            .schema
            .iter()
            .any(|(_, other)| other.len() > key.len() && other.starts_with(&format!("{key}.")));
        if has_descendant {
            assert_eq!(column.get(idx), SUBTREE_SENTINEL, "key {key}");
        } else {
            assert_ne!(column.get(idx), SUBTREE_SENTINEL, "key {key}");
        }
    }
}

#[test]
fn compact_is_idempotent() {
    let mut store = store_with("en", tree_of(vec![("k", Value::str("v"))]));
    let before = store.index().unwrap().arena_bytes();

    store.compact().unwrap();
    store.compact().unwrap();

    assert_eq!(store.index().unwrap().arena_bytes(), before);
    assert_eq!(store.lookup("en", "k", &[]), Some(Value::str("v")));
}

#[test]
fn mixed_state_rebuilds_every_locale() {
    let mut store = store_with("en", tree_of(vec![("k", Value::str("english"))]));

    store
        .store_translations(
            "fr",
            tree_of(vec![("k", Value::str("français"))]),
            &StoreOptions::default(),
        )
        .unwrap();
    assert!(store.is_compacted("en"));
    assert_eq!(store.pending_locales(), vec!["fr"]);

    store.compact().unwrap();

    assert!(store.is_compacted("en"));
    assert!(store.is_compacted("fr"));
    assert!(store.pending_locales().is_empty());
    assert_eq!(store.lookup("en", "k", &[]), Some(Value::str("english")));
    assert_eq!(store.lookup("fr", "k", &[]), Some(Value::str("français")));
}

#[test]
fn shared_schema_across_locales() {
    let mut store = Store::new();
    store
        .store_translations(
            "en",
            tree_of(vec![("common", Value::str("yes")), ("only_en", Value::str("en"))]),
            &StoreOptions::default(),
        )
        .unwrap();
    store
        .store_translations(
            "fr",
            tree_of(vec![("common", Value::str("oui"))]),
            &StoreOptions::default(),
        )
        .unwrap();
    store.compact().unwrap();

    let index = store.index().unwrap();
    // One schema column for the shared key; the sparse locale simply has
    // no word for the other column.
    assert_eq!(index.schema_len(), 2);
    assert_eq!(store.lookup("fr", "common", &[]), Some(Value::str("oui")));
    assert_eq!(store.lookup("fr", "only_en", &[]), None);
}

#[test]
fn explicit_nil_occupies_an_object_slot_but_reads_as_missing() {
    let store = store_with("en", tree_of(vec![("gone", Value::Nil)]));

    let index = store.index().unwrap();
    assert_eq!(index.object_count(), 1);
    assert_eq!(store.lookup("en", "gone", &[]), None);
}

#[test]
fn non_utf8_encodings_survive_compaction() {
    let binary = Value::Str(EncodedStr::binary(vec![0xde, 0xad, 0xbe, 0xef]));
    let store = store_with("en", tree_of(vec![("blob", binary.clone())]));

    assert_eq!(store.lookup("en", "blob", &[]), Some(binary));
}

#[test]
fn compact_on_an_empty_store_is_a_no_op() {
    let mut store = Store::new();
    store.compact().unwrap();
    assert!(store.index().is_none());
}
