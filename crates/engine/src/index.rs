//! The frozen columnar index and its per-locale value columns.

use arena::packed::{self, Ref};
use arena::{Arena, ABSENT};
use cache::Snapshot;
use schema::{ChildIndex, KeySchema};
use std::collections::BTreeMap;
use tree::{EncodedStr, ObjectTable, Value};

/// One locale's packed words, indexed by schema column index.
///
/// Columns are sparse at the tail: slots past `len()` read as [`ABSENT`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Column {
    words: Vec<i64>,
}

impl Column {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_words(words: Vec<i64>) -> Self {
        Self { words }
    }

    /// The word at `idx`; [`ABSENT`] past the end.
    #[must_use]
    pub fn get(&self, idx: u32) -> i64 {
        self.words.get(idx as usize).copied().unwrap_or(ABSENT)
    }

    /// Writes `word` at `idx`, padding any gap with [`ABSENT`].
    pub fn set(&mut self, idx: u32, word: i64) {
        let idx = idx as usize;
        if idx >= self.words.len() {
            self.words.resize(idx + 1, ABSENT);
        }
        self.words[idx] = word;
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        self.words.len() as u32
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    #[must_use]
    pub fn words(&self) -> &[i64] {
        &self.words
    }
}

/// The finalized compacted index.
///
/// Arena, schema, object table, and child index are immutable for the
/// index's lifetime. The locale → column map is the one mutable root: a
/// column is removed when its locale is decompacted.
pub struct CompactedIndex {
    pub(crate) arena: Arena,
    pub(crate) schema: KeySchema,
    pub(crate) objects: ObjectTable,
    pub(crate) children: ChildIndex,
    pub(crate) columns: BTreeMap<String, Column>,
    pub(crate) separator: String,
}

impl CompactedIndex {
    #[must_use]
    pub fn has_locale(&self, locale: &str) -> bool {
        self.columns.contains_key(locale)
    }

    /// Compacted locales in sorted order.
    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    #[must_use]
    pub fn schema_len(&self) -> u32 {
        self.schema.len()
    }

    #[must_use]
    pub fn arena_bytes(&self) -> u64 {
        self.arena.len()
    }

    #[must_use]
    pub fn object_count(&self) -> u32 {
        self.objects.len()
    }

    #[must_use]
    pub fn column_len(&self, locale: &str) -> Option<u32> {
        self.columns.get(locale).map(Column::len)
    }

    /// Decodes a leaf word into a fresh value. String slices are copied out
    /// of the arena so the caller may freely mutate the result.
    ///
    /// # Panics
    ///
    /// Panics on the subtree sentinel (callers dispatch on it first) and on
    /// references outside the arena or object table — those words cannot
    /// come from a correct build, so the index is no longer trustworthy.
    pub(crate) fn decode_leaf(&self, word: i64) -> Option<Value> {
        match packed::decode(word)? {
            Ref::Str {
                encoding,
                offset,
                len,
            } => {
                let bytes = self.arena.slice(offset, len).to_vec();
                Some(Value::Str(EncodedStr::new(bytes, encoding)))
            }
            Ref::Obj(index) => {
                let value = self
                    .objects
                    .get(index)
                    .unwrap_or_else(|| panic!("object reference {index} out of table bounds"));
                Some(value.clone())
            }
            Ref::Subtree => panic!("decode_leaf called on the subtree sentinel"),
        }
    }

    /// Flattens the index into its on-disk image. Executable rules become
    /// placeholders; their `(locale, flat key)` positions are recorded so a
    /// later load can patch re-extracted rules back in.
    #[must_use]
    pub fn to_snapshot(&self, fingerprint: String) -> Snapshot {
        let keys = self.schema.keys().map(|k| k.to_string()).collect();

        let columns = self
            .columns
            .iter()
            .map(|(locale, column)| (locale.clone(), column.words().to_vec()))
            .collect();

        let objects = self.objects.iter().map(|(_, v)| v.clone()).collect();

        let mut children: Vec<(String, Vec<String>)> = self
            .children
            .iter()
            .map(|(parent, kids)| {
                (
                    parent.to_string(),
                    kids.iter().map(|k| k.to_string()).collect(),
                )
            })
            .collect();
        children.sort();

        let mut rule_positions: BTreeMap<u32, Vec<(String, String)>> = BTreeMap::new();
        for (locale, column) in &self.columns {
            for (idx, &word) in column.words().iter().enumerate() {
                if let Some(Ref::Obj(object_index)) = packed::decode(word) {
                    if matches!(self.objects.get(object_index), Some(Value::Rule(_))) {
                        let key = self
                            .schema
                            .key_at(idx as u32)
                            .expect("column index within schema")
                            .to_string();
                        rule_positions
                            .entry(object_index)
                            .or_default()
                            .push((locale.clone(), key));
                    }
                }
            }
        }

        Snapshot {
            fingerprint,
            separator: self.separator.clone(),
            keys,
            columns,
            arena: self.arena.as_bytes().to_vec(),
            objects,
            children,
            rule_positions: rule_positions.into_iter().collect(),
        }
    }

    /// Rebuilds an index from a validated snapshot (cache hit path).
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let Snapshot {
            separator,
            keys,
            columns,
            arena,
            objects,
            children,
            ..
        } = snapshot;

        Self {
            arena: Arena::from_bytes(arena),
            schema: KeySchema::from_ordered_keys(keys),
            objects: ObjectTable::from_values(objects),
            children: ChildIndex::from_entries(children),
            columns: columns
                .into_iter()
                .map(|(locale, words)| (locale, Column::from_words(words)))
                .collect(),
            separator,
        }
    }
}

impl std::fmt::Debug for CompactedIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompactedIndex")
            .field("schema_len", &self.schema_len())
            .field("arena_bytes", &self.arena_bytes())
            .field("object_count", &self.object_count())
            .field("locales", &self.columns.keys().collect::<Vec<_>>())
            .finish()
    }
}
