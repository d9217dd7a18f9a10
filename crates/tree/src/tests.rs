use super::*;

fn leaf_map(entries: &[(&str, Value)]) -> Tree {
    entries
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn encoded_str_views() {
    let s = EncodedStr::utf8("héllo");
    assert_eq!(s.as_str(), Some("héllo"));
    assert_eq!(s.encoding(), Encoding::Utf8);

    let b = EncodedStr::binary(vec![0xff, 0xfe]);
    assert_eq!(b.as_str(), None);
    assert_eq!(b.bytes(), &[0xff, 0xfe]);
}

#[test]
fn rules_compare_by_identity() {
    let a = Rule::new(|_| Value::str("a"));
    let b = Rule::new(|_| Value::str("a"));
    let a2 = a.clone();

    assert_eq!(a, a2);
    assert_ne!(a, b);
    assert_eq!(a.call(&[]).as_str(), Some("a"));
}

#[test]
fn object_table_push_get_replace() {
    let mut t = ObjectTable::new();
    assert_eq!(t.push(Value::Int(1)), 0);
    assert_eq!(t.push(Value::Bool(true)), 1);
    assert_eq!(t.len(), 2);

    assert_eq!(t.get(0), Some(&Value::Int(1)));
    assert_eq!(t.get(2), None);

    t.replace(0, Value::RulePlaceholder);
    assert_eq!(t.get(0), Some(&Value::RulePlaceholder));
}

#[test]
fn deep_merge_merges_maps_and_overwrites_leaves() {
    let mut target = leaf_map(&[
        ("greeting", Value::str("Hi")),
        (
            "menu",
            Value::Map(leaf_map(&[("open", Value::str("Open")), ("close", Value::str("Close"))])),
        ),
    ]);

    deep_merge(
        &mut target,
        leaf_map(&[
            ("greeting", Value::str("Hello")),
            ("menu", Value::Map(leaf_map(&[("open", Value::str("Ouvrir"))]))),
        ]),
    );

    assert_eq!(target["greeting"], Value::str("Hello"));
    let Value::Map(menu) = &target["menu"] else {
        panic!("menu should still be a map");
    };
    // Merged, not replaced: the untouched sibling survives.
    assert_eq!(menu["open"], Value::str("Ouvrir"));
    assert_eq!(menu["close"], Value::str("Close"));
}

#[test]
fn deep_merge_leaf_overwrites_map() {
    let mut target = leaf_map(&[("a", Value::Map(leaf_map(&[("b", Value::str("x"))])))]);
    deep_merge(&mut target, leaf_map(&[("a", Value::str("flat"))]));
    assert_eq!(target["a"], Value::str("flat"));
}
