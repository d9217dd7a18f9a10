//! Packed 64-bit reference words.
//!
//! Every value column slot is one signed 64-bit word:
//!
//! ```text
//! word >= 0            string reference   [0:7 | enc_id:4 | offset:36 | length:16]
//! word < 0, not the    object reference   index = -(word + 1) into the
//!   sentinel                              object side table
//! SUBTREE_SENTINEL     interior node      children live at longer flat keys
//! ABSENT               nil                this locale does not define the column
//! ```
//!
//! The string layout keeps the sign bit and the top 7 bits clear, so every
//! string reference is a non-negative 56-bit immediate. Object references
//! start at `-1` (index 0) and grow downward, never reaching the sentinel
//! at `-(1 << 62)`. `ABSENT` is `i64::MIN`, which no encoder produces.

use crate::Encoding;

/// Marks a column position whose children live at longer flat keys.
pub const SUBTREE_SENTINEL: i64 = -(1 << 62);

/// In-column nil: the locale does not define this column.
pub const ABSENT: i64 = i64::MIN;

/// Maximum byte length of a packable string (16-bit length field).
pub const MAX_PACKED_LEN: usize = (1 << LEN_BITS) - 1;

/// Maximum arena size in bytes (36-bit offset field).
pub const MAX_ARENA_BYTES: u64 = 1 << OFF_BITS;

const LEN_BITS: u32 = 16;
const OFF_BITS: u32 = 36;
const ENC_BITS: u32 = 4;

const LEN_MASK: i64 = (1 << LEN_BITS) - 1;
const OFF_MASK: i64 = (1 << OFF_BITS) - 1;
const ENC_MASK: i64 = (1 << ENC_BITS) - 1;

const OFF_SHIFT: u32 = LEN_BITS;
const ENC_SHIFT: u32 = LEN_BITS + OFF_BITS;

/// A decoded packed word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ref {
    /// A slice of the string arena.
    Str {
        encoding: Encoding,
        offset: u64,
        len: u16,
    },
    /// An index into the object side table.
    Obj(u32),
    /// Interior node marker.
    Subtree,
}

/// Encodes a string reference.
///
/// # Panics
///
/// Panics if `offset` exceeds the 36-bit field. The arena builder caps its
/// buffer below that, so this can only fire on a builder bug.
#[must_use]
pub fn encode_str(encoding: Encoding, offset: u64, len: u16) -> i64 {
    assert!(offset < MAX_ARENA_BYTES, "arena offset {offset} exceeds 36-bit field");
    ((encoding.id() as i64) << ENC_SHIFT) | ((offset as i64) << OFF_SHIFT) | (len as i64)
}

/// Encodes an object-table index. Adds 1 before negation so index 0 does
/// not collide with the positive-zero string reference.
#[must_use]
pub fn encode_obj(index: u32) -> i64 {
    -(index as i64 + 1)
}

/// Decodes a packed word. `ABSENT` decodes to `None`.
///
/// # Panics
///
/// Panics on words no encoder can produce (garbage high bits, object index
/// past `u32::MAX`). Such a word means the index is corrupted; cache data is
/// range-checked with [`is_valid`] before it ever reaches this function.
#[must_use]
pub fn decode(word: i64) -> Option<Ref> {
    if word == ABSENT {
        return None;
    }
    if word == SUBTREE_SENTINEL {
        return Some(Ref::Subtree);
    }
    if word < 0 {
        let index = -(word + 1);
        assert!(
            (0..=u32::MAX as i64).contains(&index),
            "object reference out of range: {word}"
        );
        return Some(Ref::Obj(index as u32));
    }

    let enc_id = ((word >> ENC_SHIFT) & ENC_MASK) as u8;
    let high = word >> (ENC_SHIFT + ENC_BITS);
    assert!(high == 0, "string reference has garbage high bits: {word:#x}");
    let encoding = Encoding::from_id(enc_id)
        .unwrap_or_else(|| panic!("string reference has unassigned encoding id {enc_id}"));

    Some(Ref::Str {
        encoding,
        offset: ((word >> OFF_SHIFT) & OFF_MASK) as u64,
        len: (word & LEN_MASK) as u16,
    })
}

/// Total validity check for untrusted (cache-loaded) words. Never panics.
///
/// A word is valid when it is `ABSENT`, the sentinel, an object reference
/// within `object_count`, or a string reference whose slice fits in
/// `arena_len` bytes and whose encoding id is assigned.
#[must_use]
pub fn is_valid(word: i64, arena_len: u64, object_count: u32) -> bool {
    if word == ABSENT || word == SUBTREE_SENTINEL {
        return true;
    }
    if word < 0 {
        let index = -(word as i128 + 1);
        return index >= 0 && index < object_count as i128;
    }
    if word >> (ENC_SHIFT + ENC_BITS) != 0 {
        return false;
    }
    let enc_id = ((word >> ENC_SHIFT) & ENC_MASK) as u8;
    if Encoding::from_id(enc_id).is_none() {
        return false;
    }
    let offset = ((word >> OFF_SHIFT) & OFF_MASK) as u64;
    let len = (word & LEN_MASK) as u64;
    offset + len <= arena_len
}
