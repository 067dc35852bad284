//! Deterministic binary encoding of normal forms.
//!
//! ```text
//! record  := FORMAT_VERSION RECORD_TAG string(kind) u64(count) (string(slot) value)*
//! value   := 0x00                         absent
//!          | 0x01 u8(0|1)                 bool
//!          | 0x02 i64                     int, big-endian two's complement
//!          | 0x03 u64                     float bits, big-endian
//!          | 0x04 string                  NFC string
//!          | 0x05 u8(alg) [u8; 32]        cid
//!          | 0x06 u64(count) value*       list
//!          | 0x07 u64(count) (string value)*  map, keys strictly ascending
//! string  := u64(len) utf8
//! ```
//!
//! Lists and maps appear only as slot values and hold elements, never other
//! collections. There is exactly one encoding per normal form, and `decode`
//! accepts only that encoding.

use thiserror::Error;
use unicode_normalization::is_nfc;

use crate::cid::{Cid, CidAlg, DIGEST_LEN};
use crate::kind::NodeKind;
use crate::normal::{check_shape, is_canonical_float_bits, NormalForm, NormalValue};
use crate::schema;

/// Leading byte of every encoded record.
pub const FORMAT_VERSION: u8 = 0x01;

/// Record tag following the version byte (`'N'`).
pub const RECORD_TAG: u8 = 0x4e;

mod tags {
    pub const ABSENT: u8 = 0x00;
    pub const BOOL: u8 = 0x01;
    pub const INT: u8 = 0x02;
    pub const FLOAT: u8 = 0x03;
    pub const STR: u8 = 0x04;
    pub const CID: u8 = 0x05;
    pub const LIST: u8 = 0x06;
    pub const MAP: u8 = 0x07;
}

/// Errors produced when decoding canonical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input ended before a complete value was read.
    #[error("unexpected end of input at offset {offset}")]
    Truncated {
        /// Offset where more bytes were needed.
        offset: usize,
    },
    /// Bytes remained after the record.
    #[error("{remaining} trailing bytes after record")]
    TrailingBytes {
        /// Number of unread bytes.
        remaining: usize,
    },
    /// Unsupported format version byte.
    #[error("unsupported format version 0x{0:02x}")]
    Version(u8),
    /// Unknown record or value tag.
    #[error("unknown tag 0x{tag:02x} at offset {offset}")]
    UnknownTag {
        /// Offending tag.
        tag: u8,
        /// Offset of the tag.
        offset: usize,
    },
    /// A value was well-formed but not in canonical form.
    #[error("non-canonical encoding at offset {offset}: {reason}")]
    NonCanonical {
        /// Offset of the value.
        offset: usize,
        /// What was not canonical.
        reason: String,
    },
    /// The record does not match the kind's slot schema.
    #[error("schema mismatch: {0}")]
    Schema(String),
    /// Unknown node kind name.
    #[error("unknown node kind '{0}'")]
    UnknownKind(String),
}

/// Encodes a normal form to its canonical bytes.
pub fn encode(form: &NormalForm) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.push(FORMAT_VERSION);
    out.push(RECORD_TAG);
    put_str(&mut out, form.kind().qualified_name());
    put_len(&mut out, form.values().len());
    for (name, value) in form.slots() {
        put_str(&mut out, name);
        put_value(&mut out, value);
    }
    out
}

fn put_len(out: &mut Vec<u8>, len: usize) {
    out.extend_from_slice(&(len as u64).to_be_bytes());
}

fn put_str(out: &mut Vec<u8>, s: &str) {
    put_len(out, s.len());
    out.extend_from_slice(s.as_bytes());
}

fn put_value(out: &mut Vec<u8>, value: &NormalValue) {
    match value {
        NormalValue::Absent => out.push(tags::ABSENT),
        NormalValue::Bool(b) => {
            out.push(tags::BOOL);
            out.push(u8::from(*b));
        }
        NormalValue::Int(i) => {
            out.push(tags::INT);
            out.extend_from_slice(&i.to_be_bytes());
        }
        NormalValue::Float(bits) => {
            out.push(tags::FLOAT);
            out.extend_from_slice(&bits.to_be_bytes());
        }
        NormalValue::Str(s) => {
            out.push(tags::STR);
            put_str(out, s);
        }
        NormalValue::Cid(cid) => {
            out.push(tags::CID);
            out.push(cid.alg().to_byte());
            out.extend_from_slice(cid.digest());
        }
        NormalValue::List(items) => {
            out.push(tags::LIST);
            put_len(out, items.len());
            for item in items {
                put_value(out, item);
            }
        }
        NormalValue::Map(entries) => {
            out.push(tags::MAP);
            put_len(out, entries.len());
            for (key, item) in entries {
                put_str(out, key);
                put_value(out, item);
            }
        }
    }
}

/// Decodes canonical bytes back into a normal form.
///
/// # Errors
///
/// Returns [`DecodeError`] for truncated, trailing, malformed, or
/// non-canonical input.
pub fn decode(bytes: &[u8]) -> Result<NormalForm, DecodeError> {
    let mut reader = Reader { bytes, pos: 0 };
    let version = reader.u8()?;
    if version != FORMAT_VERSION {
        return Err(DecodeError::Version(version));
    }
    let tag_offset = reader.pos;
    let tag = reader.u8()?;
    if tag != RECORD_TAG {
        return Err(DecodeError::UnknownTag {
            tag,
            offset: tag_offset,
        });
    }

    let kind_name = reader.string()?;
    let kind = NodeKind::ALL
        .iter()
        .copied()
        .find(|k| k.qualified_name() == kind_name)
        .ok_or(DecodeError::UnknownKind(kind_name))?;

    let declared = schema::slots(kind);
    let count = reader.len()?;
    if count != declared.len() {
        return Err(DecodeError::Schema(format!(
            "{kind} declares {} slots, record has {count}",
            declared.len()
        )));
    }
    let mut values = Vec::with_capacity(count);
    for slot in declared {
        let name = reader.string()?;
        if name != slot.name {
            return Err(DecodeError::Schema(format!(
                "{kind} expected slot '{}', found '{name}'",
                slot.name
            )));
        }
        values.push(reader.value()?);
    }

    if reader.pos != bytes.len() {
        return Err(DecodeError::TrailingBytes {
            remaining: bytes.len() - reader.pos,
        });
    }
    check_shape(kind, &values).map_err(DecodeError::Schema)?;
    Ok(NormalForm::from_parts(kind, values))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DecodeError::Truncated { offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.array::<1>()?[0])
    }

    fn len(&mut self) -> Result<usize, DecodeError> {
        let offset = self.pos;
        let raw = u64::from_be_bytes(self.array()?);
        let len = usize::try_from(raw).map_err(|_| DecodeError::Truncated { offset })?;
        // Every element occupies at least one byte.
        if len > self.bytes.len() - self.pos {
            return Err(DecodeError::Truncated { offset });
        }
        Ok(len)
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let offset = self.pos;
        let len = self.len()?;
        let raw = self.take(len)?;
        let s = std::str::from_utf8(raw).map_err(|e| DecodeError::NonCanonical {
            offset,
            reason: format!("invalid UTF-8: {e}"),
        })?;
        if !is_nfc(s) {
            return Err(DecodeError::NonCanonical {
                offset,
                reason: "string is not NFC".to_string(),
            });
        }
        Ok(s.to_string())
    }

    /// Reads a slot value: an element or one level of list or map.
    fn value(&mut self) -> Result<NormalValue, DecodeError> {
        let offset = self.pos;
        match self.bytes.get(offset).copied() {
            Some(tags::LIST) => {
                self.pos += 1;
                let count = self.len()?;
                let items = (0..count)
                    .map(|_| self.element())
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(NormalValue::List(items))
            }
            Some(tags::MAP) => {
                self.pos += 1;
                let count = self.len()?;
                let mut entries: Vec<(String, NormalValue)> = Vec::with_capacity(count);
                for _ in 0..count {
                    let key_offset = self.pos;
                    let key = self.string()?;
                    if let Some((prev, _)) = entries.last() {
                        if prev.as_bytes() >= key.as_bytes() {
                            return Err(DecodeError::NonCanonical {
                                offset: key_offset,
                                reason: format!("map key {key:?} is not strictly ascending"),
                            });
                        }
                    }
                    let item = self.element()?;
                    entries.push((key, item));
                }
                Ok(NormalValue::Map(entries))
            }
            _ => self.element(),
        }
    }

    /// Reads a single non-collection value.
    fn element(&mut self) -> Result<NormalValue, DecodeError> {
        let offset = self.pos;
        let tag = self.u8()?;
        match tag {
            tags::ABSENT => Ok(NormalValue::Absent),
            tags::BOOL => match self.u8()? {
                0 => Ok(NormalValue::Bool(false)),
                1 => Ok(NormalValue::Bool(true)),
                other => Err(DecodeError::NonCanonical {
                    offset,
                    reason: format!("bool byte 0x{other:02x}"),
                }),
            },
            tags::INT => Ok(NormalValue::Int(i64::from_be_bytes(self.array()?))),
            tags::FLOAT => {
                let bits = u64::from_be_bytes(self.array()?);
                if !is_canonical_float_bits(bits) {
                    return Err(DecodeError::NonCanonical {
                        offset,
                        reason: format!("NaN payload {bits:#018x}"),
                    });
                }
                Ok(NormalValue::Float(bits))
            }
            tags::STR => Ok(NormalValue::Str(self.string()?)),
            tags::CID => {
                let alg_byte = self.u8()?;
                let alg = CidAlg::from_byte(alg_byte).ok_or(DecodeError::NonCanonical {
                    offset,
                    reason: format!("unknown digest algorithm 0x{alg_byte:02x}"),
                })?;
                let digest: [u8; DIGEST_LEN] = self.array()?;
                Ok(NormalValue::Cid(Cid::new(alg, digest)))
            }
            tags::LIST | tags::MAP => Err(DecodeError::NonCanonical {
                offset,
                reason: "collection nested inside a collection".to_string(),
            }),
            other => Err(DecodeError::UnknownTag { tag: other, offset }),
        }
    }
}
