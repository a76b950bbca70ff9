// Copyright (C) Microsoft Corporation. All rights reserved.

//! Authorization sets: ordered multisets of typed tag/value pairs.
//!
//! # Wire format
//!
//! Callers persist serialized sets inside key blobs, so the format is
//! bit-exact and stable:
//!
//! ```text
//! le32 indirect_size | indirect bytes | le32 count | le32 elements_size |
//!     count x ( le32 tag | value )
//! ```
//!
//! Enum, uint and bool values occupy four bytes; uint64 and date values
//! eight; bignum and blob values are eight bytes of (length, offset) into
//! the indirect region, which holds their contents in entry order.

use crate::error::ErrorCode;
use crate::tag::Tag;
use crate::tag::TagType;

/// A typed value, one variant per [`TagType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyParamValue {
    /// 32-bit enumerated value.
    Enum(u32),
    /// Unsigned 32-bit integer.
    Uint(u32),
    /// Unsigned 64-bit integer.
    Ulong(u64),
    /// Milliseconds since the epoch.
    Date(u64),
    /// Presence is truth.
    Bool,
    /// Big-endian arbitrary-precision integer.
    Bignum(Vec<u8>),
    /// Byte blob.
    Bytes(Vec<u8>),
}

impl KeyParamValue {
    fn tag_type(&self) -> TagType {
        match self {
            KeyParamValue::Enum(_) => TagType::Enum,
            KeyParamValue::Uint(_) => TagType::Uint,
            KeyParamValue::Ulong(_) => TagType::Ulong,
            KeyParamValue::Date(_) => TagType::Date,
            KeyParamValue::Bool => TagType::Bool,
            KeyParamValue::Bignum(_) => TagType::Bignum,
            KeyParamValue::Bytes(_) => TagType::Bytes,
        }
    }
}

/// A single tag/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyParam {
    tag: Tag,
    value: KeyParamValue,
}

impl KeyParam {
    /// Pairs a tag with a value, rejecting type mismatches.
    ///
    /// A mismatch is a programming error in the caller; it surfaces as
    /// `ErrorCode::InvalidArgument` rather than a panic because params
    /// also arrive from the wire.
    pub fn new(tag: Tag, value: KeyParamValue) -> Result<Self, ErrorCode> {
        if tag.tag_type() != value.tag_type() {
            Err(ErrorCode::InvalidArgument)?;
        }
        Ok(Self { tag, value })
    }

    /// Enum-valued param.
    pub fn enumerated(tag: Tag, value: u32) -> Result<Self, ErrorCode> {
        Self::new(tag, KeyParamValue::Enum(value))
    }

    /// Uint-valued param.
    pub fn uint(tag: Tag, value: u32) -> Result<Self, ErrorCode> {
        Self::new(tag, KeyParamValue::Uint(value))
    }

    /// Uint64-valued param.
    pub fn ulong(tag: Tag, value: u64) -> Result<Self, ErrorCode> {
        Self::new(tag, KeyParamValue::Ulong(value))
    }

    /// Date-valued param.
    pub fn date(tag: Tag, value: u64) -> Result<Self, ErrorCode> {
        Self::new(tag, KeyParamValue::Date(value))
    }

    /// Boolean (presence) param.
    pub fn boolean(tag: Tag) -> Result<Self, ErrorCode> {
        Self::new(tag, KeyParamValue::Bool)
    }

    /// Blob-valued param.
    pub fn bytes(tag: Tag, value: impl Into<Vec<u8>>) -> Result<Self, ErrorCode> {
        Self::new(tag, KeyParamValue::Bytes(value.into()))
    }

    /// Bignum-valued param.
    pub fn bignum(tag: Tag, value: impl Into<Vec<u8>>) -> Result<Self, ErrorCode> {
        Self::new(tag, KeyParamValue::Bignum(value.into()))
    }

    /// The tag.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// The value.
    pub fn value(&self) -> &KeyParamValue {
        &self.value
    }
}

/// An ordered multiset of [`KeyParam`]s.
///
/// Insertion order is preserved for deterministic serialization; equality
/// ignores order but respects multiplicity.
#[derive(Debug, Clone, Default)]
pub struct AuthorizationSet {
    params: Vec<KeyParam>,
}

impl AuthorizationSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// True when the set has no entries.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Appends a param.
    pub fn push(&mut self, param: KeyParam) {
        self.params.push(param);
    }

    /// Appends every param of `other`.
    pub fn merge(&mut self, other: &AuthorizationSet) {
        self.params.extend(other.params.iter().cloned());
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.params.clear();
    }

    /// Iterates the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyParam> {
        self.params.iter()
    }

    /// True if any entry carries `tag`.
    pub fn contains_tag(&self, tag: Tag) -> bool {
        self.params.iter().any(|p| p.tag == tag)
    }

    /// True if some entry is exactly (`tag`, `value`).
    pub fn contains(&self, tag: Tag, value: &KeyParamValue) -> bool {
        self.params
            .iter()
            .any(|p| p.tag == tag && &p.value == value)
    }

    /// First entry carrying `tag`.
    pub fn get(&self, tag: Tag) -> Option<&KeyParam> {
        self.params.iter().find(|p| p.tag == tag)
    }

    /// First enum value under `tag`.
    pub fn get_enum(&self, tag: Tag) -> Option<u32> {
        self.get(tag).and_then(|p| match &p.value {
            KeyParamValue::Enum(v) => Some(*v),
            _ => None,
        })
    }

    /// Every enum value under `tag`, in insertion order.
    pub fn all_enums(&self, tag: Tag) -> Vec<u32> {
        self.params
            .iter()
            .filter(|p| p.tag == tag)
            .filter_map(|p| match &p.value {
                KeyParamValue::Enum(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    /// First uint value under `tag`.
    pub fn get_uint(&self, tag: Tag) -> Option<u32> {
        self.get(tag).and_then(|p| match &p.value {
            KeyParamValue::Uint(v) => Some(*v),
            _ => None,
        })
    }

    /// First uint64 value under `tag`.
    pub fn get_ulong(&self, tag: Tag) -> Option<u64> {
        self.get(tag).and_then(|p| match &p.value {
            KeyParamValue::Ulong(v) => Some(*v),
            _ => None,
        })
    }

    /// First blob value under `tag`.
    pub fn get_bytes(&self, tag: Tag) -> Option<&[u8]> {
        self.get(tag).and_then(|p| match &p.value {
            KeyParamValue::Bytes(v) => Some(v.as_slice()),
            _ => None,
        })
    }

    /// Serializes the set into its wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut indirect = Vec::new();
        let mut elements = Vec::new();

        for param in &self.params {
            elements.extend_from_slice(&(param.tag as u32).to_le_bytes());
            match &param.value {
                KeyParamValue::Enum(v) | KeyParamValue::Uint(v) => {
                    elements.extend_from_slice(&v.to_le_bytes());
                }
                KeyParamValue::Bool => {
                    elements.extend_from_slice(&1u32.to_le_bytes());
                }
                KeyParamValue::Ulong(v) | KeyParamValue::Date(v) => {
                    elements.extend_from_slice(&v.to_le_bytes());
                }
                KeyParamValue::Bignum(data) | KeyParamValue::Bytes(data) => {
                    elements.extend_from_slice(&(data.len() as u32).to_le_bytes());
                    elements.extend_from_slice(&(indirect.len() as u32).to_le_bytes());
                    indirect.extend_from_slice(data);
                }
            }
        }

        let mut out =
            Vec::with_capacity(12 + indirect.len() + elements.len());
        out.extend_from_slice(&(indirect.len() as u32).to_le_bytes());
        out.extend_from_slice(&indirect);
        out.extend_from_slice(&(self.params.len() as u32).to_le_bytes());
        out.extend_from_slice(&(elements.len() as u32).to_le_bytes());
        out.extend_from_slice(&elements);
        out
    }

    /// Parses a serialized set, consuming the whole buffer.
    pub fn deserialize(data: &[u8]) -> Result<Self, ErrorCode> {
        let (set, consumed) = Self::deserialize_prefix(data)?;
        if consumed != data.len() {
            Err(ErrorCode::InvalidKeyBlob)?;
        }
        Ok(set)
    }

    /// Parses a serialized set from the front of `data`, returning the
    /// set and the number of bytes consumed.
    pub fn deserialize_prefix(data: &[u8]) -> Result<(Self, usize), ErrorCode> {
        let mut cursor = Cursor::new(data);
        let indirect_size = cursor.read_u32()? as usize;
        let indirect = cursor.read_slice(indirect_size)?;
        let count = cursor.read_u32()? as usize;
        let elements_size = cursor.read_u32()? as usize;
        let elements_end = cursor
            .position()
            .checked_add(elements_size)
            .ok_or(ErrorCode::InvalidKeyBlob)?;
        if elements_end > data.len() {
            Err(ErrorCode::InvalidKeyBlob)?;
        }

        let mut params = Vec::with_capacity(count.min(64));
        for _ in 0..count {
            let tag_value = cursor.read_u32()?;
            let tag = Tag::from_value(tag_value).ok_or(ErrorCode::InvalidKeyBlob)?;
            let value = match tag.tag_type() {
                TagType::Enum => KeyParamValue::Enum(cursor.read_u32()?),
                TagType::Uint => KeyParamValue::Uint(cursor.read_u32()?),
                TagType::Ulong => KeyParamValue::Ulong(cursor.read_u64()?),
                TagType::Date => KeyParamValue::Date(cursor.read_u64()?),
                TagType::Bool => {
                    cursor.read_u32()?;
                    KeyParamValue::Bool
                }
                TagType::Bignum | TagType::Bytes => {
                    let len = cursor.read_u32()? as usize;
                    let offset = cursor.read_u32()? as usize;
                    let end = offset.checked_add(len).ok_or(ErrorCode::InvalidKeyBlob)?;
                    if end > indirect.len() {
                        Err(ErrorCode::InvalidKeyBlob)?;
                    }
                    let content = indirect[offset..end].to_vec();
                    if tag.tag_type() == TagType::Bignum {
                        KeyParamValue::Bignum(content)
                    } else {
                        KeyParamValue::Bytes(content)
                    }
                }
                TagType::Invalid => Err(ErrorCode::InvalidKeyBlob)?,
            };
            params.push(KeyParam { tag, value });
        }

        if cursor.position() != elements_end {
            Err(ErrorCode::InvalidKeyBlob)?;
        }
        Ok((Self { params }, cursor.position()))
    }
}

impl PartialEq for AuthorizationSet {
    fn eq(&self, other: &Self) -> bool {
        if self.params.len() != other.params.len() {
            return false;
        }
        // Order-insensitive, multiplicity-sensitive. Sets are small, so
        // the quadratic count is fine.
        self.params.iter().all(|param| {
            let mine = self.params.iter().filter(|p| *p == param).count();
            let theirs = other.params.iter().filter(|p| *p == param).count();
            mine == theirs
        })
    }
}

impl Eq for AuthorizationSet {}

impl FromIterator<KeyParam> for AuthorizationSet {
    fn from_iter<I: IntoIterator<Item = KeyParam>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ErrorCode> {
        let end = self.pos.checked_add(len).ok_or(ErrorCode::InvalidKeyBlob)?;
        if end > self.data.len() {
            Err(ErrorCode::InvalidKeyBlob)?;
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, ErrorCode> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64, ErrorCode> {
        let bytes = self.read_slice(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }
}
