//! Mutation path: `store_translations`, per-locale decompaction, and
//! `reload`.
//!
//! A compacted locale cannot be mutated in place — its strings live in the
//! shared arena and its schema is frozen. Storing into a compacted locale
//! first reverts that one locale to a nested tree (leaving every other
//! locale compacted), then deep-merges the incoming data.

use crate::index::CompactedIndex;
use crate::{Store, StoreOptions};
use anyhow::{ensure, Result};
use arena::{ABSENT, SUBTREE_SENTINEL};
use tree::{deep_merge, Tree, Value};

impl Store {
    /// Merges `data` into `locale`, decompacting the locale first if it is
    /// currently served from the index. Other locales stay compacted.
    ///
    /// # Errors
    ///
    /// Fails if `options.separator` is set and differs from the store's
    /// configured separator — flat keys built with a different separator
    /// could never be found again.
    pub fn store_translations(
        &mut self,
        locale: &str,
        data: Tree,
        options: &StoreOptions,
    ) -> Result<()> {
        if let Some(separator) = &options.separator {
            ensure!(
                separator == self.separator(),
                "separator {:?} does not match the store separator {:?}",
                separator,
                self.separator()
            );
        }

        if self.is_compacted(locale) {
            self.decompact_into_trees(locale);
        }

        let target = self.trees_mut().entry(locale.to_string()).or_default();
        deep_merge(target, data);
        Ok(())
    }

    /// Drops every piece of state — compacted and pending — returning the
    /// store to its freshly constructed state.
    pub fn reload(&mut self) {
        self.trees_mut().clear();
        self.set_index(None);
    }

    /// Moves one locale out of the index and into the pending trees.
    pub(crate) fn decompact_into_trees(&mut self, locale: &str) {
        let Some(index) = self.index_mut() else {
            return;
        };
        let Some(tree) = index.decompact(locale) else {
            return;
        };
        tracing::debug!(locale, "decompacted");
        self.trees_mut().insert(locale.to_string(), tree);
    }
}

impl CompactedIndex {
    /// Removes `locale`'s column and rebuilds its nested tree from schema
    /// order. The arena, schema, object table, child index, and every other
    /// locale are untouched.
    ///
    /// Subtree sentinels and absent slots contribute nothing; explicit nil
    /// leaves are reinstated at their nested positions.
    pub(crate) fn decompact(&mut self, locale: &str) -> Option<Tree> {
        let column = self.columns.remove(locale)?;

        let mut tree = Tree::new();
        for (idx, key) in self.schema.iter() {
            match column.get(idx) {
                ABSENT | SUBTREE_SENTINEL => {}
                word => {
                    if let Some(value) = self.decode_leaf(word) {
                        insert_nested(&mut tree, key, &self.separator, value);
                    }
                }
            }
        }
        Some(tree)
    }
}

/// Inserts `value` at the nested position named by `flat`, creating
/// interior maps along the way.
fn insert_nested(tree: &mut Tree, flat: &str, separator: &str, value: Value) {
    let mut node = tree;
    let mut rest = flat;

    while let Some((head, tail)) = rest.split_once(separator) {
        let entry = node
            .entry(head.to_string())
            .or_insert_with(|| Value::Map(Tree::new()));
        if !matches!(entry, Value::Map(_)) {
            // A well-formed index never holds a leaf at an interior key.
            *entry = Value::Map(Tree::new());
        }
        let Value::Map(next) = entry else { unreachable!() };
        node = next;
        rest = tail;
    }

    node.insert(rest.to_string(), value);
}
