//! # Engine — Lingua translation store
//!
//! The central orchestrator that ties together the [`arena`], [`schema`],
//! [`tree`], and [`cache`] crates into a compacted translation index with
//! an optional persistent cache.
//!
//! ## Architecture
//!
//! ```text
//! store_translations(locale, data)
//!   |
//!   v
//! ┌───────────────────────────────────────────────────┐
//! │                     STORE                         │
//! │                                                   │
//! │ pending trees: locale → nested Tree (mutable)     │
//! │        |                                          │
//! │        | compact() / compact_with_cache()         │
//! │        v                                          │
//! │ ┌───────────────────────────────────────────────┐ │
//! │ │           COMPACTED INDEX (frozen)            │ │
//! │ │  schema: flat key → column index              │ │
//! │ │  columns[locale]: packed i64 words            │ │
//! │ │  arena: deduplicated string bytes             │ │
//! │ │  objects: non-string leaves                   │ │
//! │ │  children: parent → direct child keys         │ │
//! │ └───────────────────────────────────────────────┘ │
//! │                                                   │
//! │ lookup() → compacted path (O(1) leaf decode,      │
//! │            on-demand subtree reconstruction)      │
//! │         → nested path for pending locales         │
//! │                                                   │
//! │ store_translations() on a compacted locale        │
//! │   → decompact that locale back to a nested Tree   │
//! │     (other locales stay compacted)                │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module         | Purpose                                               |
//! |----------------|-------------------------------------------------------|
//! | [`lib.rs`]     | `Store` struct, constructors, accessors, `Debug`      |
//! | [`index`]      | `CompactedIndex`, `Column`, snapshot conversion       |
//! | [`compact`]    | compaction, cache-backed compaction, `eager_load`     |
//! | [`lookup`]     | key normalization, leaf decode, subtree rebuild, links|
//! | [`decompact`]  | `store_translations`, per-locale decompaction, reload |
//!
//! ## Concurrency
//!
//! Single-writer, read-mostly. Everything inside a finalized
//! [`CompactedIndex`] is immutable except the locale → column map, which
//! shrinks when a locale is decompacted. Callers that share a `Store`
//! across threads must wrap it (for example copy-on-write replacement of
//! the whole store); the engine itself performs no synchronization.

mod compact;
mod decompact;
mod index;
mod lookup;

pub use cache::{NoRules, RuleSource};
pub use compact::{CacheConfig, SourceLoader};
pub use index::CompactedIndex;

use std::collections::BTreeMap;
use tree::Tree;

/// Default flat-key separator.
pub const DEFAULT_SEPARATOR: &str = ".";

/// Options for a single [`Store::store_translations`] call.
#[derive(Debug, Default, Clone)]
pub struct StoreOptions {
    /// Per-operation separator. Must equal the store's configured
    /// separator; a mismatch is rejected rather than silently producing
    /// flat keys no lookup can find again.
    pub separator: Option<String>,
}

/// A translation store: pending nested trees plus, after compaction, the
/// frozen columnar index.
///
/// Pending locales live in a `BTreeMap` so that compacting the same inputs
/// always produces the same schema order, arena layout, and cache bytes.
pub struct Store {
    separator: String,
    /// Locales awaiting compaction (or decompacted for mutation).
    trees: BTreeMap<String, Tree>,
    /// The finalized index, present once `compact` has run.
    index: Option<CompactedIndex>,
}

impl Store {
    /// Creates an empty store with the default `.` separator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_separator(DEFAULT_SEPARATOR)
    }

    /// Creates an empty store with a custom flat-key separator. The same
    /// separator is used for compaction, lookup, and cache validation.
    #[must_use]
    pub fn with_separator(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            trees: BTreeMap::new(),
            index: None,
        }
    }

    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// `true` if `locale` is served from the compacted index.
    #[must_use]
    pub fn is_compacted(&self, locale: &str) -> bool {
        self.index
            .as_ref()
            .is_some_and(|index| index.has_locale(locale))
    }

    /// Locales currently compacted, sorted.
    #[must_use]
    pub fn compacted_locales(&self) -> Vec<String> {
        match &self.index {
            Some(index) => index.locales().map(str::to_string).collect(),
            None => Vec::new(),
        }
    }

    /// Locales awaiting compaction (stored or decompacted), sorted.
    #[must_use]
    pub fn pending_locales(&self) -> Vec<String> {
        self.trees.keys().cloned().collect()
    }

    /// All known locales, compacted or pending, sorted and deduplicated.
    #[must_use]
    pub fn available_locales(&self) -> Vec<String> {
        let mut locales = self.pending_locales();
        locales.extend(self.compacted_locales());
        locales.sort();
        locales.dedup();
        locales
    }

    /// The finalized index, if compaction has run.
    #[must_use]
    pub fn index(&self) -> Option<&CompactedIndex> {
        self.index.as_ref()
    }

    pub(crate) fn index_mut(&mut self) -> Option<&mut CompactedIndex> {
        self.index.as_mut()
    }

    pub(crate) fn trees(&self) -> &BTreeMap<String, Tree> {
        &self.trees
    }

    pub(crate) fn trees_mut(&mut self) -> &mut BTreeMap<String, Tree> {
        &mut self.trees
    }

    pub(crate) fn set_index(&mut self, index: Option<CompactedIndex>) {
        self.index = index;
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Store");
        s.field("separator", &self.separator)
            .field("pending_locales", &self.pending_locales())
            .field("compacted_locales", &self.compacted_locales());
        if let Some(index) = &self.index {
            s.field("schema_len", &index.schema_len())
                .field("arena_bytes", &index.arena_bytes())
                .field("object_count", &index.object_count());
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests;
