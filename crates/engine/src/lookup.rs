//! Read path: key normalization, O(1) leaf decode, on-demand subtree
//! reconstruction, and transitive symbol-link resolution.
//!
//! A compacted leaf lookup is one schema probe, one column index, and one
//! arena slice copy. Subtree lookups rebuild a nested map on demand in
//! O(subtree). Locales that are not compacted (pending or decompacted) are
//! served from their nested trees with the same semantics.

use crate::index::CompactedIndex;
use crate::Store;
use arena::{ABSENT, SUBTREE_SENTINEL};
use tree::{Tree, Value};

/// Symbol-link chains longer than this are treated as missing. Links are
/// expected to be one or two hops; a longer chain is almost always a cycle.
const MAX_LINK_DEPTH: u32 = 16;

impl Store {
    /// Resolves `(locale, key)` under `scope` to a value.
    ///
    /// `scope` components and `key` are joined with the store separator; a
    /// leading `<locale><separator>` prefix is stripped, so fully qualified
    /// keys like `"en.foo.bar"` behave like `"foo.bar"`.
    ///
    /// Returns `None` for unknown locales, unknown keys, and nil values —
    /// a missing translation is not an error. Interior keys return the
    /// reconstructed subtree as [`Value::Map`]. Symbol-links re-enter the
    /// lookup transitively.
    #[must_use]
    pub fn lookup(&self, locale: &str, key: &str, scope: &[&str]) -> Option<Value> {
        let flat = self.normalize(locale, key, scope);
        self.lookup_flat(locale, &flat, 0)
    }

    fn lookup_flat(&self, locale: &str, flat: &str, link_depth: u32) -> Option<Value> {
        if link_depth > MAX_LINK_DEPTH {
            tracing::debug!(locale, key = flat, "symbol-link chain too deep; treating as missing");
            return None;
        }

        let value = if self.is_compacted(locale) {
            self.index()?.lookup_flat(locale, flat)
        } else {
            nested_lookup(self.trees().get(locale)?, flat, self.separator())
        }?;

        match value {
            Value::Link(target) => self.lookup_flat(locale, &target, link_depth + 1),
            other => Some(other),
        }
    }

    fn normalize(&self, locale: &str, key: &str, scope: &[&str]) -> String {
        let separator = self.separator();
        let mut flat = String::with_capacity(key.len() + 16);
        for part in scope {
            flat.push_str(part);
            flat.push_str(separator);
        }
        flat.push_str(key);

        let locale_prefix = format!("{locale}{separator}");
        match flat.strip_prefix(&locale_prefix) {
            Some(stripped) => stripped.to_string(),
            None => flat,
        }
    }
}

impl CompactedIndex {
    /// Compacted-path lookup for an already normalized flat key.
    #[must_use]
    pub fn lookup_flat(&self, locale: &str, flat: &str) -> Option<Value> {
        let idx = self.schema.lookup(flat)?;
        let column = self.columns.get(locale)?;

        match column.get(idx) {
            ABSENT => None,
            SUBTREE_SENTINEL => Some(Value::Map(self.reconstruct(locale, flat))),
            // An explicit nil leaf occupies an object slot but reads as
            // missing, the same as an absent column.
            word => self.decode_leaf(word).filter(|v| !v.is_nil()),
        }
    }

    /// Rebuilds the nested map under `parent` for one locale.
    ///
    /// Children come from the child index in schema insertion order, so the
    /// result is deterministic. Children this locale does not define, and
    /// children whose value decodes to nil, are omitted.
    fn reconstruct(&self, locale: &str, parent: &str) -> Tree {
        let mut out = Tree::new();
        let Some(kids) = self.children.children(parent) else {
            return out;
        };
        let Some(column) = self.columns.get(locale) else {
            return out;
        };

        for kid in kids {
            let local = &kid[parent.len() + self.separator.len()..];
            let Some(idx) = self.schema.lookup(kid) else {
                continue;
            };
            match column.get(idx) {
                ABSENT => {}
                SUBTREE_SENTINEL => {
                    out.insert(local.to_string(), Value::Map(self.reconstruct(locale, kid)));
                }
                word => {
                    if let Some(value) = self.decode_leaf(word) {
                        if !value.is_nil() {
                            out.insert(local.to_string(), value);
                        }
                    }
                }
            }
        }
        out
    }
}

/// Nested-tree lookup for locales that are not compacted.
fn nested_lookup(tree: &Tree, flat: &str, separator: &str) -> Option<Value> {
    let mut node = tree;
    let mut rest = flat;

    while let Some((head, tail)) = rest.split_once(separator) {
        match node.get(head)? {
            Value::Map(next) => {
                node = next;
                rest = tail;
            }
            _ => return None,
        }
    }

    let value = node.get(rest)?;
    if value.is_nil() {
        return None;
    }
    Some(value.clone())
}
