//! Compaction: flattening pending nested trees into the columnar index,
//! optionally backed by the persistent cache.

use crate::index::{Column, CompactedIndex};
use crate::Store;
use anyhow::{Context, Result};
use arena::packed::{self, SUBTREE_SENTINEL};
use arena::{ArenaBuilder, MAX_PACKED_LEN};
use cache::fingerprint::{fingerprint, Mode};
use cache::RuleSource;
use schema::{ChildIndex, KeySchema};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tree::{ObjectTable, Tree, Value};

/// Cache configuration for [`Store::compact_with_cache`] and
/// [`Store::eager_load`].
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Absolute path of the cache file.
    pub path: PathBuf,
    /// When `true`, fingerprint file contents (digest mode) instead of
    /// path + mtime.
    pub digest: bool,
    /// The ordered source file list the fingerprint covers.
    pub sources: Vec<PathBuf>,
}

impl CacheConfig {
    fn mode(&self) -> Mode {
        if self.digest {
            Mode::Digest
        } else {
            Mode::Mtime
        }
    }
}

/// Supplies source trees for [`Store::eager_load`]. Extends [`RuleSource`]
/// because a cache hit still needs executable rules re-extracted.
pub trait SourceLoader: RuleSource {
    /// Loads every source file into `(locale, tree)` pairs.
    fn load(&self) -> Result<Vec<(String, Tree)>>;
}

impl Store {
    /// Finalizes the index for all currently loaded locales.
    ///
    /// Idempotent: with no pending locales this is a no-op. With pending
    /// locales *and* an existing index (mixed state), every compacted
    /// locale is decompacted first and the whole index is rebuilt from
    /// scratch — remapping packed references across a grown schema is not
    /// worth the complexity for an operation that runs at most once per
    /// boot.
    ///
    /// # Errors
    ///
    /// Fails only if the string arena overflows its 36-bit offset space.
    /// The store is left in its pre-call state in that case.
    pub fn compact(&mut self) -> Result<()> {
        if self.trees().is_empty() {
            return Ok(());
        }

        if self.index().is_some() {
            let compacted = self.compacted_locales();
            tracing::debug!(locales = compacted.len(), "mixed state: rebuilding from scratch");
            for locale in compacted {
                self.decompact_into_trees(&locale);
            }
            self.set_index(None);
        }

        self.rebuild()
    }

    /// [`compact`](Store::compact) backed by a cache file.
    ///
    /// On a cache hit (magic, version, fingerprint, separator, and every
    /// packed reference check out) the snapshot is installed wholesale and
    /// pending trees are dropped — they were loaded from the same sources
    /// the fingerprint covers. On a miss the store compacts normally and
    /// then writes the cache; write failures are swallowed.
    ///
    /// `rules` re-attaches executable rules after a hit; pass
    /// [`NoRules`](cache::NoRules) when the sources contain none.
    pub fn compact_with_cache(&mut self, config: &CacheConfig, rules: &dyn RuleSource) -> Result<()> {
        let fp = match fingerprint(&config.sources, config.mode()) {
            Ok(fp) => fp,
            Err(e) => {
                tracing::warn!(error = %e, "fingerprint unavailable; compacting without cache");
                return self.compact();
            }
        };

        if let Some(snapshot) = cache::load(&config.path, &fp, self.separator(), rules) {
            tracing::debug!(path = %config.path.display(), "cache hit");
            self.install_snapshot(snapshot);
            return Ok(());
        }

        self.compact()?;

        if let Some(index) = self.index() {
            cache::save(&index.to_snapshot(fp), &config.path);
        }
        Ok(())
    }

    /// Loads every source file through `loader`, then compacts. On a cache
    /// hit the load step is skipped entirely.
    pub fn eager_load<L: SourceLoader>(&mut self, loader: &L, config: Option<&CacheConfig>) -> Result<()> {
        if let Some(config) = config {
            if let Ok(fp) = fingerprint(&config.sources, config.mode()) {
                if let Some(snapshot) = cache::load(&config.path, &fp, self.separator(), loader) {
                    tracing::debug!(path = %config.path.display(), "cache hit; skipping source load");
                    self.install_snapshot(snapshot);
                    return Ok(());
                }
            }
        }

        for (locale, data) in loader.load().context("loading translation sources")? {
            let target = self.trees_mut().entry(locale).or_default();
            tree::deep_merge(target, data);
        }

        match config {
            Some(config) => self.compact_with_cache(config, loader),
            None => self.compact(),
        }
    }

    pub(crate) fn install_snapshot(&mut self, snapshot: cache::Snapshot) {
        self.trees_mut().clear();
        self.set_index(Some(CompactedIndex::from_snapshot(snapshot)));
    }

    /// The core compactor: drains pending trees into a fresh index.
    fn rebuild(&mut self) -> Result<()> {
        let trees = std::mem::take(self.trees_mut());

        let mut builder = IndexBuilder::new(self.separator().to_string());
        let mut failure = Ok(());
        for (locale, tree) in &trees {
            if let Err(e) = builder.add_locale(locale, tree) {
                failure = Err(e);
                break;
            }
        }
        if let Err(e) = failure {
            // Leave the store as it was; the caller can still serve nested
            // lookups.
            *self.trees_mut() = trees;
            return Err(e);
        }

        let index = builder.finish();
        tracing::debug!(
            locales = index.columns.len(),
            keys = index.schema_len(),
            arena_bytes = index.arena_bytes(),
            objects = index.object_count(),
            "compacted"
        );
        self.set_index(Some(index));
        Ok(())
    }
}

/// Accumulates one locale tree at a time, then freezes into a
/// [`CompactedIndex`].
struct IndexBuilder {
    separator: String,
    arena: ArenaBuilder,
    schema: KeySchema,
    objects: ObjectTable,
    columns: BTreeMap<String, Column>,
}

impl IndexBuilder {
    fn new(separator: String) -> Self {
        Self {
            separator,
            arena: ArenaBuilder::new(),
            schema: KeySchema::new(),
            objects: ObjectTable::new(),
            columns: BTreeMap::new(),
        }
    }

    fn add_locale(&mut self, locale: &str, data: &Tree) -> Result<()> {
        let mut column = Column::new();
        self.walk(&mut column, None, data)?;
        self.columns.insert(locale.to_string(), column);
        Ok(())
    }

    /// Depth-first flatten. For each entry the flat key is interned, then
    /// the value is classified:
    ///
    /// - nested map → subtree sentinel, recurse;
    /// - string that fits the 16-bit length field → arena reference;
    /// - everything else (long strings, arrays, links, rules, numbers,
    ///   booleans, explicit nils) → object-table reference.
    fn walk(&mut self, column: &mut Column, prefix: Option<&str>, map: &Tree) -> Result<()> {
        for (key, value) in map {
            let flat = match prefix {
                Some(p) => format!("{p}{}{key}", self.separator),
                None => key.clone(),
            };
            let idx = self.schema.intern(&flat);

            match value {
                Value::Map(children) => {
                    column.set(idx, SUBTREE_SENTINEL);
                    self.walk(column, Some(&flat), children)?;
                }
                Value::Str(s) if s.len() <= MAX_PACKED_LEN => {
                    let r = self
                        .arena
                        .intern(s.bytes(), s.encoding())
                        .with_context(|| format!("interning value of {flat:?}"))?;
                    column.set(idx, r.packed());
                }
                other => {
                    let object_index = self.objects.push(other.clone());
                    column.set(idx, packed::encode_obj(object_index));
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> CompactedIndex {
        let children = ChildIndex::build(&self.schema, &self.separator);
        CompactedIndex {
            arena: self.arena.finalize(),
            schema: self.schema,
            objects: self.objects,
            children,
            columns: self.columns,
            separator: self.separator,
        }
    }
}
