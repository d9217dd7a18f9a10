//! # Schema — flat-key dictionary and subtree child index
//!
//! [`KeySchema`] is the shared mapping from dotted flat keys to dense column
//! indices. Forward lookups (index → key) are a `Vec` index; reverse lookups
//! (key → index) are a single `HashMap` probe. The `Arc<str>` is shared
//! between both sides, so each key is allocated once.
//!
//! Indices are assigned by insertion order and are contiguous `0..N` — the
//! value columns rely on that to stay flat arrays.
//!
//! [`ChildIndex`] maps each interior flat key to its direct children, in
//! schema insertion order. It exists only to make subtree reconstruction
//! deterministic and O(subtree).

use std::collections::HashMap;
use std::sync::Arc;

/// Insertion-ordered bidirectional dictionary: flat key ⇄ dense column index.
///
/// Interning happens only while the index is being built; once the schema is
/// moved into a finalized index nothing holds a `&mut` to it, which is what
/// freezes it.
#[derive(Debug, Default, Clone)]
pub struct KeySchema {
    keys: Vec<Arc<str>>,
    index: HashMap<Arc<str>, u32>,
}

impl KeySchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a schema from keys in index order (cache reload path).
    /// Entry `i` gets index `i`, which is the only safe way to reseed a
    /// schema from persisted data.
    #[must_use]
    pub fn from_ordered_keys(keys: Vec<String>) -> Self {
        let mut schema = Self::new();
        for key in keys {
            schema.intern(&key);
        }
        schema
    }

    /// Returns the column index for `key`, interning it if new.
    pub fn intern(&mut self, key: &str) -> u32 {
        if let Some(&idx) = self.index.get(key) {
            return idx;
        }
        let idx = self.keys.len() as u32;
        let shared: Arc<str> = Arc::from(key);
        self.keys.push(Arc::clone(&shared));
        self.index.insert(shared, idx);
        idx
    }

    /// Looks a key up without interning.
    #[must_use]
    pub fn lookup(&self, key: &str) -> Option<u32> {
        self.index.get(key).copied()
    }

    /// The key at a column index.
    #[must_use]
    pub fn key_at(&self, idx: u32) -> Option<&str> {
        self.keys.get(idx as usize).map(|k| k.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.keys.len() as u32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `(index, key)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.keys.iter().enumerate().map(|(i, k)| (i as u32, k.as_ref()))
    }

    /// Shared handles to the keys, in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Arc<str>> {
        self.keys.iter()
    }
}

/// Map from each interior flat key to its direct-child flat keys.
///
/// An entry exists for `K` exactly when some `K<sep>X` (single path
/// component `X`) exists in the schema. Child lists keep schema insertion
/// order.
#[derive(Debug, Default, Clone)]
pub struct ChildIndex {
    children: HashMap<Arc<str>, Vec<Arc<str>>>,
}

impl ChildIndex {
    /// Builds the index by splitting every schema key on its **last**
    /// separator occurrence and appending the full key to its parent's list.
    #[must_use]
    pub fn build(schema: &KeySchema, separator: &str) -> Self {
        let mut children: HashMap<Arc<str>, Vec<Arc<str>>> = HashMap::new();
        for key in schema.keys() {
            if let Some((parent, _)) = key.rsplit_once(separator) {
                children
                    .entry(Arc::from(parent))
                    .or_default()
                    .push(Arc::clone(key));
            }
        }
        Self { children }
    }

    /// Rehydrates from `(parent, children)` pairs (cache reload path).
    #[must_use]
    pub fn from_entries(entries: Vec<(String, Vec<String>)>) -> Self {
        let mut children = HashMap::new();
        for (parent, kids) in entries {
            children.insert(
                Arc::from(parent.as_str()),
                kids.into_iter().map(|k| Arc::from(k.as_str())).collect(),
            );
        }
        Self { children }
    }

    /// The direct children of `parent`, or `None` for leaves and unknown keys.
    #[must_use]
    pub fn children(&self, parent: &str) -> Option<&[Arc<str>]> {
        self.children.get(parent).map(|v| v.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// All `(parent, children)` entries, unordered (serialization path).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Arc<str>])> {
        self.children.iter().map(|(k, v)| (k.as_ref(), v.as_slice()))
    }
}
