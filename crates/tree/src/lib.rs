//! # Tree — the leaf value model
//!
//! The value kinds a translation tree can hold, shared by every layer of the
//! workspace: the compactor classifies them, the object side table stores
//! the non-string ones, the cache serializes them, and lookups return them.
//!
//! A nested tree is a [`Tree`] (`BTreeMap<String, Value>`); interior nodes
//! are [`Value::Map`], everything else is a leaf:
//!
//! | Variant           | Meaning                                            |
//! |-------------------|----------------------------------------------------|
//! | `Str`             | string with an explicit encoding tag               |
//! | `Int` / `Float`   | numeric leaves                                     |
//! | `Bool` / `Nil`    | boolean / explicit nil                             |
//! | `Array`           | ordered leaf values (maps allowed inside)          |
//! | `Link`            | symbol-link: payload is another flat key           |
//! | `Rule`            | executable rule (opaque callable, not serializable)|
//! | `RulePlaceholder` | stand-in for a rule the cache could not restore    |
//! | `Map`             | nested map                                         |

use arena::Encoding;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

mod object_table;

pub use object_table::ObjectTable;

/// A nested translation tree. `BTreeMap` keeps iteration deterministic.
pub type Tree = BTreeMap<String, Value>;

/// A string with an explicit character encoding.
///
/// The encoding participates in arena deduplication: equal bytes under
/// different encodings are distinct strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedStr {
    bytes: Vec<u8>,
    encoding: Encoding,
}

impl EncodedStr {
    #[must_use]
    pub fn new(bytes: Vec<u8>, encoding: Encoding) -> Self {
        Self { bytes, encoding }
    }

    /// UTF-8 string from native Rust text.
    #[must_use]
    pub fn utf8(s: impl Into<String>) -> Self {
        Self {
            bytes: s.into().into_bytes(),
            encoding: Encoding::Utf8,
        }
    }

    /// US-ASCII string. The caller asserts the bytes are 7-bit.
    #[must_use]
    pub fn ascii(s: impl Into<String>) -> Self {
        Self {
            bytes: s.into().into_bytes(),
            encoding: Encoding::Ascii,
        }
    }

    /// Raw bytes with no character semantics.
    #[must_use]
    pub fn binary(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            encoding: Encoding::Binary,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the text when the encoding permits a `str` view
    /// (UTF-8 and US-ASCII).
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self.encoding {
            Encoding::Utf8 | Encoding::Ascii => std::str::from_utf8(&self.bytes).ok(),
            Encoding::Binary | Encoding::Other => None,
        }
    }
}

/// An executable rule: an opaque callable attached to a translation leaf.
///
/// Rules cannot be serialized. The cache stores a placeholder in their slot
/// and records where they came from, so the loader can re-attach rules
/// re-extracted from source files. Rules compare by identity.
#[derive(Clone)]
pub struct Rule(Arc<dyn Fn(&[Value]) -> Value + Send + Sync>);

impl Rule {
    pub fn new(f: impl Fn(&[Value]) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Invokes the rule.
    #[must_use]
    pub fn call(&self, args: &[Value]) -> Value {
        (self.0)(args)
    }
}

impl PartialEq for Rule {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Rule(..)")
    }
}

/// A leaf (or interior) value of a translation tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicit nil. Distinct from an undefined key: a compacted nil leaf
    /// occupies an object-table slot, while an undefined key has no column
    /// entry at all.
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(EncodedStr),
    Array(Vec<Value>),
    /// Symbol-link: the payload names another flat key the lookup engine
    /// resolves transitively.
    Link(String),
    Rule(Rule),
    /// What a [`Rule`] slot decays to after a cache reload when no
    /// re-extracted rule matched its recorded position. Surfacing this from
    /// a lookup is documented behavior; callers expecting a callable must
    /// check.
    RulePlaceholder,
    Map(Tree),
}

impl Value {
    /// UTF-8 string leaf.
    #[must_use]
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(EncodedStr::utf8(s))
    }

    #[must_use]
    pub fn map(tree: Tree) -> Self {
        Value::Map(tree)
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Borrows the text of a UTF-8/ASCII string leaf.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => s.as_str(),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Deep-merges `incoming` into `target`.
///
/// Maps merge recursively; any other value kind overwrites the existing
/// entry wholesale. This is the nested-tree half of `store_translations`.
pub fn deep_merge(target: &mut Tree, incoming: Tree) {
    for (key, value) in incoming {
        match (target.get_mut(&key), value) {
            (Some(Value::Map(existing)), Value::Map(new)) => deep_merge(existing, new),
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests;
