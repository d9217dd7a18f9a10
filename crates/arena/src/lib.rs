//! # Arena — deduplicated string storage
//!
//! One large append-only byte buffer holding every packed translation
//! string, plus the 64-bit packed-reference encoding that points into it.
//!
//! During a build, [`ArenaBuilder`] receives `(bytes, encoding)` pairs and
//! returns [`StrRef`] triples. Identical inputs (same bytes **and** same
//! encoding) always return the same triple — the arena stores at most one
//! copy per `(bytes, encoding)` pair. On [`finalize`](ArenaBuilder::finalize)
//! the buffer is frozen into an immutable [`Arena`] that serves
//! bounds-checked byte slices for the lifetime of the index.
//!
//! ## Limits
//!
//! ```text
//! max string length   65_535 bytes   (16-bit length field)
//! max arena size      2^36 bytes     (36-bit offset field)
//! ```
//!
//! Longer strings are rejected with [`ArenaError::TooLarge`]; the caller
//! routes them through the object side table instead.
//!
//! ## Example
//!
//! ```rust
//! use arena::{ArenaBuilder, Encoding};
//!
//! let mut b = ArenaBuilder::new();
//! let a = b.intern(b"hello", Encoding::Utf8).unwrap();
//! let c = b.intern(b"hello", Encoding::Utf8).unwrap();
//! assert_eq!(a, c); // deduplicated
//!
//! let arena = b.finalize();
//! assert_eq!(arena.slice(a.offset, a.len), b"hello");
//! ```

pub mod packed;

pub use packed::{Ref, ABSENT, MAX_ARENA_BYTES, MAX_PACKED_LEN, SUBTREE_SENTINEL};

use std::collections::HashMap;
use thiserror::Error;

/// Character encoding tag carried alongside every packed string.
///
/// The four ids fit the 4-bit `enc_id` field of a packed reference.
/// `Other` is the fallback for encodings outside the fixed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Encoding {
    /// UTF-8 (id 0). The default for Rust string data.
    Utf8 = 0,
    /// US-ASCII (id 1).
    Ascii = 1,
    /// Raw bytes with no character semantics (id 2).
    Binary = 2,
    /// Any other encoding (id 3).
    Other = 3,
}

impl Encoding {
    /// Returns the numeric id stored in the packed reference.
    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Maps a stored id back to its encoding. Ids above 3 are unassigned.
    #[must_use]
    pub fn from_id(id: u8) -> Option<Encoding> {
        match id {
            0 => Some(Encoding::Utf8),
            1 => Some(Encoding::Ascii),
            2 => Some(Encoding::Binary),
            3 => Some(Encoding::Other),
            _ => None,
        }
    }
}

/// Errors produced while interning strings into the arena.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The string exceeds the 16-bit packed length field. The caller must
    /// spill it to the object side table.
    #[error("string too large to pack: {len} bytes (max {MAX_PACKED_LEN})")]
    TooLarge {
        /// Byte length of the rejected string.
        len: usize,
    },

    /// Appending would push the buffer past the 36-bit offset space.
    #[error("arena full: {needed} bytes needed (max {MAX_ARENA_BYTES})")]
    Full {
        /// Total bytes the arena would need to hold the string.
        needed: u64,
    },
}

/// Location of one interned string: `(offset, length, encoding)`.
///
/// Two interning calls with identical `(bytes, encoding)` inputs return
/// equal `StrRef`s, so the packed forms are bit-for-bit equal as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrRef {
    /// Byte offset into the arena.
    pub offset: u64,
    /// Byte length of the string.
    pub len: u16,
    /// Encoding tag.
    pub encoding: Encoding,
}

impl StrRef {
    /// Encodes this reference into its packed 64-bit word.
    #[must_use]
    pub fn packed(&self) -> i64 {
        packed::encode_str(self.encoding, self.offset, self.len)
    }
}

/// One dedup slot per encoding id. Four encodings keep this a fixed array
/// instead of a nested map.
const ENCODING_SLOTS: usize = 4;

/// Streaming arena builder with content + encoding deduplication.
///
/// The buffer grows geometrically (`Vec` doubling). The dedup map is keyed
/// by the byte sequence alone, with one slot per encoding id in the value,
/// so a probe works on a borrowed `&[u8]` — a dedup hit touches no
/// allocator. The key is copied once, when a byte sequence is first seen.
#[derive(Debug, Default)]
pub struct ArenaBuilder {
    buf: Vec<u8>,
    dedup: HashMap<Box<[u8]>, [Option<StrRef>; ENCODING_SLOTS]>,
    distinct: usize,
}

impl ArenaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a string, returning its `(offset, len, encoding)` triple.
    ///
    /// On a dedup hit the existing triple is returned and the buffer is
    /// untouched. On a miss the bytes are appended and a new triple is
    /// recorded.
    ///
    /// # Errors
    ///
    /// [`ArenaError::TooLarge`] if `bytes` exceeds 65 535 bytes,
    /// [`ArenaError::Full`] if the arena would exceed 2^36 bytes.
    pub fn intern(&mut self, bytes: &[u8], encoding: Encoding) -> Result<StrRef, ArenaError> {
        if bytes.len() > MAX_PACKED_LEN {
            return Err(ArenaError::TooLarge { len: bytes.len() });
        }

        let slot = encoding.id() as usize;
        if let Some(slots) = self.dedup.get(bytes) {
            if let Some(existing) = slots[slot] {
                return Ok(existing);
            }
        }

        let offset = self.buf.len() as u64;
        let needed = offset + bytes.len() as u64;
        if needed > MAX_ARENA_BYTES {
            return Err(ArenaError::Full { needed });
        }

        self.buf.extend_from_slice(bytes);
        let r = StrRef {
            offset,
            len: bytes.len() as u16,
            encoding,
        };

        match self.dedup.get_mut(bytes) {
            // Same bytes under a new encoding: fill the slot, no new key.
            Some(slots) => slots[slot] = Some(r),
            None => {
                let mut slots = [None; ENCODING_SLOTS];
                slots[slot] = Some(r);
                self.dedup.insert(Box::from(bytes), slots);
            }
        }
        self.distinct += 1;
        Ok(r)
    }

    /// Current buffer length in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Number of distinct `(bytes, encoding)` entries interned so far.
    #[must_use]
    pub fn distinct(&self) -> usize {
        self.distinct
    }

    /// Freezes the buffer into an immutable [`Arena`], dropping the dedup map.
    #[must_use]
    pub fn finalize(self) -> Arena {
        Arena {
            bytes: self.buf.into_boxed_slice(),
        }
    }
}

/// The frozen arena: an immutable byte slice shared by all readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena {
    bytes: Box<[u8]>,
}

impl Arena {
    /// Rehydrates an arena from raw bytes (cache reload path). The caller is
    /// responsible for having validated every packed reference against
    /// `bytes.len()` first.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: bytes.into_boxed_slice(),
        }
    }

    /// Returns the bytes at `[offset, offset + len)`.
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside the arena. A finalized index never
    /// holds such a reference; hitting this means the builder broke its
    /// invariant and the index is no longer trustworthy.
    #[must_use]
    pub fn slice(&self, offset: u64, len: u16) -> &[u8] {
        let start = offset as usize;
        let end = start + len as usize;
        assert!(
            end <= self.bytes.len(),
            "packed reference out of arena bounds: {}..{} (arena {} bytes)",
            start,
            end,
            self.bytes.len()
        );
        &self.bytes[start..end]
    }

    /// Total arena size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The whole buffer (serialization path).
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
