//! Binary frame codec.
//!
//! All integers are little-endian. Strings are `[len: u32][utf8 bytes]`.
//! Value kinds are tagged with one byte:
//!
//! ```text
//! 0 nil   1 false   2 true   3 int(i64)   4 float(f64 bits)
//! 5 string(enc: u8, len: u32, bytes)      6 array(count, values…)
//! 7 link(str)       8 rule placeholder    9 map(count, (key, value)…)
//! ```
//!
//! Executable rules are written as tag 8; their positions are recorded in
//! the rule-position map so the loader can patch re-extracted rules back.

use crate::CacheError;
use arena::Encoding;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use std::io::{Read, Write};
use tree::{EncodedStr, Tree, Value};

/// Cache file magic: `49 31 38 4E 43`.
pub const MAGIC: [u8; 5] = *b"I18NC";

/// Current frame version.
pub const VERSION: u32 = 1;

// Absurd-size rejects: a length prefix past these is corruption, not data.
const MAX_TEXT_BYTES: u32 = 64 * 1024 * 1024;
const MAX_BULK_BYTES: u64 = 1 << 36;
const MAX_COUNT: u32 = 1 << 24;
const MAX_VALUE_DEPTH: u32 = 128;

const TAG_NIL: u8 = 0;
const TAG_FALSE: u8 = 1;
const TAG_TRUE: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_FLOAT: u8 = 4;
const TAG_STR: u8 = 5;
const TAG_ARRAY: u8 = 6;
const TAG_LINK: u8 = 7;
const TAG_RULE: u8 = 8;
const TAG_MAP: u8 = 9;

/// Plain-data image of a compacted index, as held on disk.
///
/// The engine converts its rich types to and from this shape; the codec
/// below only sees flat vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Fingerprint of the source file list the index was built from.
    pub fingerprint: String,
    /// Flat-key separator the index was built with.
    pub separator: String,
    /// Schema keys in column-index order (entry `i` has index `i`).
    pub keys: Vec<String>,
    /// Per-locale packed value columns. Columns may be shorter than
    /// `keys.len()`; missing tail slots read as nil.
    pub columns: Vec<(String, Vec<i64>)>,
    /// The string arena bytes.
    pub arena: Vec<u8>,
    /// The object side table. Rule slots hold `Value::RulePlaceholder`.
    pub objects: Vec<Value>,
    /// Subtree child index as `(parent, children)` pairs.
    pub children: Vec<(String, Vec<String>)>,
    /// `{object index → [(locale, flat key)]}` for slots that held
    /// executable rules when the snapshot was written.
    pub rule_positions: Vec<(u32, Vec<(String, String)>)>,
}

/// Writes a complete frame (magic through payload).
pub(crate) fn write_frame<W: Write>(w: &mut W, snap: &Snapshot) -> Result<(), CacheError> {
    let mut payload = Vec::with_capacity(snap.arena.len() + 4096);
    write_payload(&mut payload, snap)?;

    let mut hasher = Crc32::new();
    hasher.update(&payload);
    let crc = hasher.finalize();

    w.write_all(&MAGIC)?;
    w.write_u32::<LittleEndian>(VERSION)?;
    write_str(w, &snap.fingerprint)?;
    w.write_u64::<LittleEndian>(payload.len() as u64)?;
    w.write_u32::<LittleEndian>(crc)?;
    w.write_all(&payload)?;
    Ok(())
}

/// Reads and verifies a complete frame.
pub(crate) fn read_frame<R: Read>(r: &mut R) -> Result<Snapshot, CacheError> {
    let mut magic = [0u8; 5];
    r.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(CacheError::Corrupt("bad magic"));
    }

    let version = r.read_u32::<LittleEndian>()?;
    if version != VERSION {
        return Err(CacheError::Version(version));
    }

    let fingerprint = read_str(r)?;

    let payload_len = r.read_u64::<LittleEndian>()?;
    if payload_len > MAX_BULK_BYTES {
        return Err(CacheError::Corrupt("payload length absurd"));
    }
    let crc = r.read_u32::<LittleEndian>()?;

    let mut payload = vec![0u8; payload_len as usize];
    r.read_exact(&mut payload)?;

    let mut hasher = Crc32::new();
    hasher.update(&payload);
    if hasher.finalize() != crc {
        return Err(CacheError::Corrupt("payload crc mismatch"));
    }

    let mut p = payload.as_slice();
    let mut snap = read_payload(&mut p)?;
    if !p.is_empty() {
        return Err(CacheError::Corrupt("trailing payload bytes"));
    }
    snap.fingerprint = fingerprint;
    Ok(snap)
}

fn write_payload<W: Write>(w: &mut W, snap: &Snapshot) -> Result<(), CacheError> {
    write_str(w, &snap.separator)?;

    write_count(w, snap.keys.len())?;
    for key in &snap.keys {
        write_str(w, key)?;
    }

    write_count(w, snap.columns.len())?;
    for (locale, column) in &snap.columns {
        write_str(w, locale)?;
        write_count(w, column.len())?;
        for &word in column {
            w.write_i64::<LittleEndian>(word)?;
        }
    }

    w.write_u64::<LittleEndian>(snap.arena.len() as u64)?;
    w.write_all(&snap.arena)?;

    write_count(w, snap.objects.len())?;
    for value in &snap.objects {
        write_value(w, value, 0)?;
    }

    write_count(w, snap.children.len())?;
    for (parent, kids) in &snap.children {
        write_str(w, parent)?;
        write_count(w, kids.len())?;
        for kid in kids {
            write_str(w, kid)?;
        }
    }

    write_count(w, snap.rule_positions.len())?;
    for (index, positions) in &snap.rule_positions {
        w.write_u32::<LittleEndian>(*index)?;
        write_count(w, positions.len())?;
        for (locale, key) in positions {
            write_str(w, locale)?;
            write_str(w, key)?;
        }
    }

    Ok(())
}

fn read_payload<R: Read>(r: &mut R) -> Result<Snapshot, CacheError> {
    let separator = read_str(r)?;

    let key_count = read_count(r)?;
    let mut keys = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        keys.push(read_str(r)?);
    }

    let column_count = read_count(r)?;
    let mut columns = Vec::with_capacity(column_count);
    for _ in 0..column_count {
        let locale = read_str(r)?;
        let len = read_count(r)?;
        let mut column = Vec::with_capacity(len);
        for _ in 0..len {
            column.push(r.read_i64::<LittleEndian>()?);
        }
        columns.push((locale, column));
    }

    let arena_len = r.read_u64::<LittleEndian>()?;
    if arena_len > MAX_BULK_BYTES {
        return Err(CacheError::Corrupt("arena length absurd"));
    }
    let mut arena = vec![0u8; arena_len as usize];
    r.read_exact(&mut arena)?;

    let object_count = read_count(r)?;
    let mut objects = Vec::with_capacity(object_count);
    for _ in 0..object_count {
        objects.push(read_value(r, 0)?);
    }

    let child_count = read_count(r)?;
    let mut children = Vec::with_capacity(child_count);
    for _ in 0..child_count {
        let parent = read_str(r)?;
        let n = read_count(r)?;
        let mut kids = Vec::with_capacity(n);
        for _ in 0..n {
            kids.push(read_str(r)?);
        }
        children.push((parent, kids));
    }

    let position_count = read_count(r)?;
    let mut rule_positions = Vec::with_capacity(position_count);
    for _ in 0..position_count {
        let index = r.read_u32::<LittleEndian>()?;
        let n = read_count(r)?;
        let mut positions = Vec::with_capacity(n);
        for _ in 0..n {
            let locale = read_str(r)?;
            let key = read_str(r)?;
            positions.push((locale, key));
        }
        rule_positions.push((index, positions));
    }

    Ok(Snapshot {
        fingerprint: String::new(), // the frame reader fills this in
        separator,
        keys,
        columns,
        arena,
        objects,
        children,
        rule_positions,
    })
}

fn write_value<W: Write>(w: &mut W, value: &Value, depth: u32) -> Result<(), CacheError> {
    if depth > MAX_VALUE_DEPTH {
        return Err(CacheError::Corrupt("value nesting too deep"));
    }
    match value {
        Value::Nil => w.write_u8(TAG_NIL)?,
        Value::Bool(false) => w.write_u8(TAG_FALSE)?,
        Value::Bool(true) => w.write_u8(TAG_TRUE)?,
        Value::Int(n) => {
            w.write_u8(TAG_INT)?;
            w.write_i64::<LittleEndian>(*n)?;
        }
        Value::Float(f) => {
            w.write_u8(TAG_FLOAT)?;
            w.write_u64::<LittleEndian>(f.to_bits())?;
        }
        Value::Str(s) => {
            w.write_u8(TAG_STR)?;
            w.write_u8(s.encoding().id())?;
            write_bytes(w, s.bytes())?;
        }
        Value::Array(items) => {
            w.write_u8(TAG_ARRAY)?;
            write_count(w, items.len())?;
            for item in items {
                write_value(w, item, depth + 1)?;
            }
        }
        Value::Link(target) => {
            w.write_u8(TAG_LINK)?;
            write_str(w, target)?;
        }
        // Rules cannot be serialized; both a live rule and an already
        // decayed placeholder persist as the placeholder tag.
        Value::Rule(_) | Value::RulePlaceholder => w.write_u8(TAG_RULE)?,
        Value::Map(map) => {
            w.write_u8(TAG_MAP)?;
            write_count(w, map.len())?;
            for (key, val) in map {
                write_str(w, key)?;
                write_value(w, val, depth + 1)?;
            }
        }
    }
    Ok(())
}

fn read_value<R: Read>(r: &mut R, depth: u32) -> Result<Value, CacheError> {
    if depth > MAX_VALUE_DEPTH {
        return Err(CacheError::Corrupt("value nesting too deep"));
    }
    let tag = r.read_u8()?;
    Ok(match tag {
        TAG_NIL => Value::Nil,
        TAG_FALSE => Value::Bool(false),
        TAG_TRUE => Value::Bool(true),
        TAG_INT => Value::Int(r.read_i64::<LittleEndian>()?),
        TAG_FLOAT => Value::Float(f64::from_bits(r.read_u64::<LittleEndian>()?)),
        TAG_STR => {
            let enc_id = r.read_u8()?;
            let encoding = Encoding::from_id(enc_id)
                .ok_or(CacheError::Corrupt("unassigned encoding id"))?;
            Value::Str(EncodedStr::new(read_bytes(r)?, encoding))
        }
        TAG_ARRAY => {
            let n = read_count(r)?;
            let mut items = Vec::with_capacity(n);
            for _ in 0..n {
                items.push(read_value(r, depth + 1)?);
            }
            Value::Array(items)
        }
        TAG_LINK => Value::Link(read_str(r)?),
        TAG_RULE => Value::RulePlaceholder,
        TAG_MAP => {
            let n = read_count(r)?;
            let mut map = Tree::new();
            for _ in 0..n {
                let key = read_str(r)?;
                map.insert(key, read_value(r, depth + 1)?);
            }
            Value::Map(map)
        }
        _ => return Err(CacheError::Corrupt("unknown value tag")),
    })
}

fn write_count<W: Write>(w: &mut W, n: usize) -> Result<(), CacheError> {
    if n as u64 > MAX_COUNT as u64 {
        return Err(CacheError::Corrupt("count exceeds frame limit"));
    }
    w.write_u32::<LittleEndian>(n as u32)?;
    Ok(())
}

fn read_count<R: Read>(r: &mut R) -> Result<usize, CacheError> {
    let n = r.read_u32::<LittleEndian>()?;
    if n > MAX_COUNT {
        return Err(CacheError::Corrupt("count absurd"));
    }
    Ok(n as usize)
}

fn write_bytes<W: Write>(w: &mut W, bytes: &[u8]) -> Result<(), CacheError> {
    if bytes.len() as u64 > MAX_TEXT_BYTES as u64 {
        return Err(CacheError::Corrupt("byte field exceeds frame limit"));
    }
    w.write_u32::<LittleEndian>(bytes.len() as u32)?;
    w.write_all(bytes)?;
    Ok(())
}

fn read_bytes<R: Read>(r: &mut R) -> Result<Vec<u8>, CacheError> {
    let len = r.read_u32::<LittleEndian>()?;
    if len > MAX_TEXT_BYTES {
        return Err(CacheError::Corrupt("byte field absurd"));
    }
    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

fn write_str<W: Write>(w: &mut W, s: &str) -> Result<(), CacheError> {
    write_bytes(w, s.as_bytes())
}

fn read_str<R: Read>(r: &mut R) -> Result<String, CacheError> {
    String::from_utf8(read_bytes(r)?).map_err(|_| CacheError::Corrupt("invalid utf-8 in string"))
}
