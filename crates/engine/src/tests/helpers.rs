use tree::{Tree, Value};

/// Builds a tree from `(key, value)` pairs.
pub fn tree_of(entries: Vec<(&str, Value)>) -> Tree {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// A nested-map value from `(key, value)` pairs.
pub fn map_of(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(tree_of(entries))
}

/// Collects every leaf `(flat key, value)` pair of a nested tree.
pub fn leaf_paths(tree: &Tree, separator: &str) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    collect(tree, None, separator, &mut out);
    out
}

fn collect(tree: &Tree, prefix: Option<&str>, separator: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in tree {
        let flat = match prefix {
            Some(p) => format!("{p}{separator}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Map(children) => collect(children, Some(&flat), separator, out),
            leaf => out.push((flat, leaf.clone())),
        }
    }
}
