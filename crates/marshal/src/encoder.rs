//! Walks a [`Value`] graph and writes tagged bytes.
//!
//! Wire layout per value: one tag byte, then the payload.
//!
//! - `N` `F` `T` `?`: no payload
//! - `i`: i32 LE; `l`: i32 LE signed digit count, then base-256 digits, least
//!   significant first
//! - `g`: f64 LE bit pattern; `y`: two of them (real, imaginary)
//! - `s` `u` `t`: u32 LE length, then raw bytes (UTF-8 for `u` and `t`)
//! - `z` `Z`: u8 length, then ASCII bytes
//! - `(` `[` `<` `>`: u32 LE count, then the items; `)`: u8 count, then the items
//! - `{`: u32 LE pair count, then key, value, key, value, ...
//! - `c`: six i32 LE counters, eight values, i32 LE first line, one value
//! - `r`: u32 LE index into the reference table
//!
//! When the version enables references, the tag byte of every container,
//! code object and interned string carries [`FLAG_REF`] on its first
//! occurrence, and later occurrences are written as `r`.

use marshal_buffers::Writer;
use num_bigint::{BigInt, Sign};
use num_traits::ToPrimitive;

use crate::constants::*;
use crate::error::{MarshalError, Result};
use crate::refs::{EncodeRefs, RefKey, Visit};
use crate::value::{Str, Value};
use crate::version::{IntWidth, VersionPolicy, DEFAULT_VERSION};

/// What to do with a value that has no wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnsupportedPolicy {
    /// Stop with [`MarshalError::UnsupportedType`]. Bytes written before the
    /// failure are not rolled back.
    #[default]
    Fail,
    /// Write the `?` marker in its place and continue. Decoders read the
    /// marker back as `None` when substitution is enabled.
    WriteMarker,
}

/// Options controlling encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    pub version: i32,
    pub unsupported: UnsupportedPolicy,
    /// Maximum container nesting before [`MarshalError::RecursionLimit`].
    pub max_depth: usize,
    /// Growth step of the output buffer.
    pub alloc_size: usize,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            unsupported: UnsupportedPolicy::Fail,
            max_depth: DEFAULT_MAX_DEPTH,
            alloc_size: 4 * 1024,
        }
    }
}

pub struct Encoder {
    pub writer: Writer,
    policy: VersionPolicy,
    options: EncoderOptions,
    refs: EncodeRefs,
    depth: usize,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Encoder for the latest format version.
    pub fn new() -> Self {
        let options = EncoderOptions::default();
        Self {
            writer: Writer::with_alloc_size(options.alloc_size),
            policy: VersionPolicy::latest(),
            options,
            refs: EncodeRefs::default(),
            depth: 0,
        }
    }

    pub fn with_version(version: i32) -> Result<Self> {
        Self::with_options(EncoderOptions {
            version,
            ..EncoderOptions::default()
        })
    }

    pub fn with_options(options: EncoderOptions) -> Result<Self> {
        Ok(Self {
            writer: Writer::with_alloc_size(options.alloc_size),
            policy: VersionPolicy::resolve(options.version)?,
            options,
            refs: EncodeRefs::default(),
            depth: 0,
        })
    }

    pub fn policy(&self) -> &VersionPolicy {
        &self.policy
    }

    /// Encodes `value` into a fresh byte vector.
    pub fn encode(&mut self, value: &Value) -> Result<Vec<u8>> {
        let (bytes, result) = self.encode_partial(value);
        result.map(|()| bytes)
    }

    /// Encodes `value` and returns whatever was written, even when the walk
    /// failed partway.
    pub fn encode_partial(&mut self, value: &Value) -> (Vec<u8>, Result<()>) {
        self.refs = EncodeRefs::default();
        self.depth = 0;
        let result = self.write_any(value);
        let bytes = self.writer.flush();
        match &result {
            Ok(()) => tracing::debug!(
                target: "marshal",
                version = self.policy.version,
                bytes = bytes.len(),
                refs = self.refs.len(),
                "encoded value"
            ),
            Err(err) => tracing::debug!(
                target: "marshal",
                version = self.policy.version,
                written = bytes.len(),
                error = %err,
                "encode failed"
            ),
        }
        (bytes, result)
    }

    pub fn write_any(&mut self, value: &Value) -> Result<()> {
        if self.depth >= self.options.max_depth {
            return Err(MarshalError::RecursionLimit {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = self.write_value(value);
        self.depth -= 1;
        result
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::None => self.writer.u8(TYPE_NONE),
            Value::Bool(b) => self.writer.u8(if *b { TYPE_TRUE } else { TYPE_FALSE }),
            Value::Int(i) => self.write_int(i)?,
            Value::Float(f) => {
                self.writer.u8(TYPE_FLOAT);
                self.writer.f64le(*f);
            }
            Value::Complex { re, im } => {
                self.writer.u8(TYPE_COMPLEX);
                self.writer.f64le(*re);
                self.writer.f64le(*im);
            }
            Value::Bytes(b) => {
                let len = self.size(b.len(), "bytes")?;
                self.writer.u8u32le(TYPE_BYTES, len);
                self.writer.buf(b);
            }
            Value::Str(s) => self.write_str(s)?,
            Value::Tuple(rc) => {
                let Some(flag) = self.begin_ref(value) else {
                    return Ok(());
                };
                let items = rc.borrow();
                if self.policy.compact && items.len() <= SHORT_MAX {
                    self.writer.u8(TYPE_SMALL_TUPLE | flag);
                    self.writer.u8(items.len() as u8);
                } else {
                    let len = self.size(items.len(), "tuple")?;
                    self.writer.u8u32le(TYPE_TUPLE | flag, len);
                }
                self.write_items(items.iter())?;
            }
            Value::List(rc) => {
                let Some(flag) = self.begin_ref(value) else {
                    return Ok(());
                };
                let items = rc.borrow();
                let len = self.size(items.len(), "list")?;
                self.writer.u8u32le(TYPE_LIST | flag, len);
                self.write_items(items.iter())?;
            }
            Value::Dict(rc) => {
                let Some(flag) = self.begin_ref(value) else {
                    return Ok(());
                };
                let dict = rc.borrow();
                let len = self.size(dict.len(), "dict")?;
                self.writer.u8u32le(TYPE_DICT | flag, len);
                for (k, v) in dict.iter() {
                    self.write_any(k)?;
                    self.write_any(v)?;
                }
            }
            Value::Set(rc) | Value::FrozenSet(rc) => {
                if !self.policy.sets {
                    return self.unsupported(value);
                }
                let Some(flag) = self.begin_ref(value) else {
                    return Ok(());
                };
                let tag = if matches!(value, Value::Set(_)) {
                    TYPE_SET
                } else {
                    TYPE_FROZENSET
                };
                let items = rc.borrow();
                let len = self.size(items.len(), value.kind_name())?;
                self.writer.u8u32le(tag | flag, len);
                self.write_items(items.iter())?;
            }
            Value::Code(code) => {
                let Some(flag) = self.begin_ref(value) else {
                    return Ok(());
                };
                let code = code.get()?;
                self.writer.u8(TYPE_CODE | flag);
                for counter in code.counters() {
                    self.writer.i32le(counter);
                }
                for field in code.fields() {
                    self.write_any(field)?;
                }
                self.writer.i32le(code.firstlineno);
                self.write_any(&code.lnotab)?;
            }
            Value::Reference(_) | Value::Opaque(_) => return self.unsupported(value),
        }
        Ok(())
    }

    fn write_items<'v>(&mut self, items: impl Iterator<Item = &'v Value>) -> Result<()> {
        for item in items {
            self.write_any(item)?;
        }
        Ok(())
    }

    pub fn write_int(&mut self, int: &BigInt) -> Result<()> {
        if self.policy.int_width == IntWidth::Fixed32 {
            if let Some(small) = int.to_i32() {
                self.writer.u8(TYPE_INT);
                self.writer.i32le(small);
                return Ok(());
            }
        }
        let (sign, digits) = int.to_bytes_le();
        let digits: &[u8] = if sign == Sign::NoSign { &[] } else { &digits };
        let count = i32::try_from(digits.len()).map_err(|_| self.too_large("int"))?;
        self.writer.u8(TYPE_LONG);
        self.writer.i32le(if sign == Sign::Minus { -count } else { count });
        self.writer.buf(digits);
        Ok(())
    }

    fn write_str(&mut self, s: &Str) -> Result<()> {
        let interned = s.interned && self.policy.interned_tag;
        let mut flag = 0;
        if interned && self.policy.references {
            match self.refs.visit(RefKey::Interned(s.text.clone())) {
                Visit::Seen(index) => {
                    self.writer.u8u32le(TYPE_REF, index);
                    return Ok(());
                }
                Visit::Assigned(_) => flag = FLAG_REF,
            }
        }
        let bytes = s.text.as_bytes();
        if self.policy.compact && s.text.is_ascii() && bytes.len() <= SHORT_MAX {
            let tag = if interned {
                TYPE_SHORT_ASCII_INTERNED
            } else {
                TYPE_SHORT_ASCII
            };
            self.writer.u8(tag | flag);
            self.writer.u8(bytes.len() as u8);
        } else {
            let tag = if interned { TYPE_INTERNED } else { TYPE_UNICODE };
            let len = self.size(bytes.len(), "str")?;
            self.writer.u8u32le(tag | flag, len);
        }
        self.writer.buf(bytes);
        Ok(())
    }

    /// Handles the reference table for a container or code object.
    ///
    /// Returns `None` when a back-reference was written instead of the
    /// object, otherwise the flag bits for its tag byte.
    fn begin_ref(&mut self, value: &Value) -> Option<u8> {
        if !self.policy.references {
            return Some(0);
        }
        let addr = value.handle_addr()?;
        match self.refs.visit(RefKey::Handle(addr)) {
            Visit::Seen(index) => {
                self.writer.u8u32le(TYPE_REF, index);
                None
            }
            Visit::Assigned(_) => Some(FLAG_REF),
        }
    }

    fn unsupported(&mut self, value: &Value) -> Result<()> {
        match self.options.unsupported {
            UnsupportedPolicy::Fail => Err(MarshalError::UnsupportedType {
                kind: value.kind_name(),
                version: self.policy.version,
            }),
            UnsupportedPolicy::WriteMarker => {
                tracing::warn!(
                    target: "marshal",
                    kind = value.kind_name(),
                    offset = self.writer.len(),
                    "writing unrepresentable marker"
                );
                self.writer.u8(TYPE_UNKNOWN);
                Ok(())
            }
        }
    }

    /// Lengths and counts are written as 32-bit values.
    fn size(&self, len: usize, kind: &'static str) -> Result<u32> {
        if len > i32::MAX as usize {
            return Err(self.too_large(kind));
        }
        Ok(len as u32)
    }

    fn too_large(&self, kind: &'static str) -> MarshalError {
        MarshalError::UnsupportedType {
            kind,
            version: self.policy.version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn encode(value: &Value, version: i32) -> Vec<u8> {
        Encoder::with_version(version).unwrap().encode(value).unwrap()
    }

    #[test]
    fn none_is_single_tag_byte() {
        assert_eq!(encode(&Value::None, 4), b"N");
        assert_eq!(encode(&Value::Bool(true), 4), b"T");
        assert_eq!(encode(&Value::Bool(false), 0), b"F");
    }

    #[test]
    fn small_int_width_depends_on_version() {
        assert_eq!(encode(&Value::int(1), 4), [b'i', 1, 0, 0, 0]);
        assert_eq!(encode(&Value::int(1), 0), [b'l', 1, 0, 0, 0, 1]);
        assert_eq!(encode(&Value::int(0), 0), [b'l', 0, 0, 0, 0]);
        assert_eq!(encode(&Value::int(-256), 0), [b'l', 0xfe, 0xff, 0xff, 0xff, 0, 1]);
    }

    #[test]
    fn large_int_uses_base_256_digits() {
        let big = Value::int(1u64 << 40);
        assert_eq!(encode(&big, 4), [b'l', 6, 0, 0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn float_is_little_endian_bit_pattern() {
        let mut expected = vec![b'g'];
        expected.extend_from_slice(&1.5f64.to_bits().to_le_bytes());
        assert_eq!(encode(&Value::Float(1.5), 4), expected);
    }

    #[test]
    fn short_ascii_only_in_compact_versions() {
        assert_eq!(encode(&Value::str("hello"), 4), b"z\x05hello");
        assert_eq!(encode(&Value::str("hello"), 3), b"u\x05\x00\x00\x00hello");
        assert_eq!(encode(&Value::str("é"), 4), b"u\x02\x00\x00\x00\xc3\xa9");
    }

    #[test]
    fn interned_strings_are_written_once() {
        let value = Value::tuple(vec![Value::interned("ab"), Value::interned("ab")]);
        assert_eq!(
            encode(&value, 4),
            [0x80 | b')', 2, 0x80 | b'Z', 2, b'a', b'b', b'r', 1, 0, 0, 0]
        );
        // Without references both copies are written in full.
        assert_eq!(
            encode(&value, 2),
            [b'(', 2, 0, 0, 0, b't', 2, 0, 0, 0, b'a', b'b', b't', 2, 0, 0, 0, b'a', b'b']
        );
    }

    #[test]
    fn shared_list_is_referenced() {
        let inner = Value::list(vec![]);
        let outer = Value::list(vec![inner.clone(), inner]);
        assert_eq!(
            encode(&outer, 3),
            [0x80 | b'[', 2, 0, 0, 0, 0x80 | b'[', 0, 0, 0, 0, b'r', 1, 0, 0, 0]
        );
    }

    #[test]
    fn self_reference_points_at_own_index() {
        let list = Value::list(vec![]);
        if let Value::List(rc) = &list {
            rc.borrow_mut().push(list.clone());
        }
        assert_eq!(encode(&list, 4), [0x80 | b'[', 1, 0, 0, 0, b'r', 0, 0, 0, 0]);
    }

    #[test]
    fn cycle_without_references_hits_depth_limit() {
        let list = Value::list(vec![]);
        if let Value::List(rc) = &list {
            rc.borrow_mut().push(list.clone());
        }
        let mut encoder = Encoder::with_options(EncoderOptions {
            version: 2,
            max_depth: 50,
            ..EncoderOptions::default()
        })
        .unwrap();
        let err = encoder.encode(&list).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Recursion);
    }

    #[test]
    fn unsupported_value_keeps_partial_output() {
        let value = Value::list(vec![Value::int(7), Value::Opaque("socket".into())]);
        let mut encoder = Encoder::new();
        let (bytes, result) = encoder.encode_partial(&value);
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedType);
        assert_eq!(bytes, [0x80 | b'[', 2, 0, 0, 0, b'i', 7, 0, 0, 0]);
    }

    #[test]
    fn sets_need_version_two() {
        let set = Value::set(vec![Value::int(1)]);
        let err = Encoder::with_version(1).unwrap().encode(&set).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::UnsupportedType { kind: "set", version: 1 }
        ));
        assert_eq!(encode(&set, 2), [b'<', 1, 0, 0, 0, b'i', 1, 0, 0, 0]);
    }

    #[test]
    fn marker_policy_writes_question_mark() {
        let mut encoder = Encoder::with_options(EncoderOptions {
            unsupported: UnsupportedPolicy::WriteMarker,
            ..EncoderOptions::default()
        })
        .unwrap();
        let value = Value::tuple(vec![Value::Reference(3), Value::None]);
        assert_eq!(
            encoder.encode(&value).unwrap(),
            [0x80 | b')', 2, b'?', b'N']
        );
    }

    #[test]
    fn small_alloc_size_grows_across_calls() {
        let mut encoder = Encoder::with_options(EncoderOptions {
            alloc_size: 16,
            ..EncoderOptions::default()
        })
        .unwrap();
        let long = Value::bytes(vec![0xab; 300]);
        let first = encoder.encode(&long).unwrap();
        assert_eq!(first.len(), 305);
        assert_eq!(first[..5], [b's', 44, 1, 0, 0]);
        assert_eq!(encoder.encode(&Value::None).unwrap(), b"N");
        assert_eq!(encoder.encode(&long).unwrap(), first);
    }

    #[test]
    fn rejects_bad_versions() {
        assert!(Encoder::with_version(-1).is_err());
        assert!(Encoder::with_version(5).is_err());
    }
}
