//! Rebuilds a [`Value`] graph from tagged bytes.
//!
//! A single forward cursor reads one tag byte, then dispatches to the reader
//! for that kind. Objects whose tag carries [`FLAG_REF`] claim the next
//! reference slot before their children are read. Lists, tuples, dicts and
//! sets are published into their slot as empty handles right away, so a
//! child referring back to its parent gets the same handle. Frozensets and
//! code objects are published only once complete.
//!
//! In [`LazyMode::Lazy`], nested code objects are scanned instead of built:
//! the scan validates their bytes and counts the slots they claim, and the
//! result is a [`CodeRef`] that decodes itself on first access.

use std::cell::RefCell;
use std::rc::Rc;

use marshal_buffers::Reader;
use num_bigint::{BigInt, Sign};

use crate::code::{CodeObject, CodeRef};
use crate::constants::*;
use crate::error::{MarshalError, Result};
use crate::refs::{DecodeRefs, Slot};
use crate::value::{Dict, SetItems, Str, Value};
use crate::version::{VersionPolicy, DEFAULT_VERSION};

/// When code objects are decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LazyMode {
    /// Per-kind default; code objects are decoded eagerly.
    #[default]
    Default,
    Eager,
    /// Nested code objects are decoded on first access.
    Lazy,
}

/// Options controlling decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Highest format version whose tags are accepted.
    pub version: i32,
    pub lazy: LazyMode,
    /// Read the `?` marker as `None` instead of failing.
    pub substitute_unrepresentable: bool,
    pub max_depth: usize,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            lazy: LazyMode::Default,
            substitute_unrepresentable: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug)]
pub struct Decoder {
    policy: VersionPolicy,
    options: DecoderOptions,
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            policy: VersionPolicy::latest(),
            options: DecoderOptions::default(),
        }
    }

    pub fn with_options(options: DecoderOptions) -> Result<Self> {
        Ok(Self {
            policy: VersionPolicy::resolve(options.version)?,
            options,
        })
    }

    pub fn policy(&self) -> &VersionPolicy {
        &self.policy
    }

    /// Decodes the first value in `input`. Trailing bytes are ignored.
    pub fn decode(&self, input: &[u8]) -> Result<Value> {
        self.decode_with_consumed(input).map(|(value, _)| value)
    }

    /// Decodes the first value in `input` and reports how many bytes it used.
    pub fn decode_with_consumed(&self, input: &[u8]) -> Result<(Value, usize)> {
        let mut state = ReadState::new(Reader::new(input), self.policy, self.options);
        let value = state.read_any()?;
        tracing::debug!(
            target: "marshal",
            version = self.policy.version,
            consumed = state.reader.x,
            trailing = state.reader.size(),
            refs = state.refs.len(),
            lazy = ?self.options.lazy,
            "decoded value"
        );
        Ok((value, state.reader.x))
    }
}

/// Everything needed to decode a skipped code object later.
pub(crate) struct Deferred {
    pub input: Rc<[u8]>,
    /// Offset of the code body (just past the tag byte).
    pub offset: usize,
    /// First reference slot claimed inside the body.
    pub first_slot: u32,
    pub refs: DecodeRefs,
    pub policy: VersionPolicy,
    pub options: DecoderOptions,
    pub depth: usize,
}

/// Decodes a deferred code object into the slots reserved for it.
pub(crate) fn realize(deferred: &Deferred) -> Result<CodeObject> {
    let reader = Reader::from_slice(&deferred.input, deferred.offset, deferred.input.len());
    let mut state = ReadState::new(reader, deferred.policy, deferred.options);
    state.refs = deferred.refs.clone();
    state.fill_from = Some(deferred.first_slot);
    state.shared = Some(deferred.input.clone());
    state.depth = deferred.depth;
    state.read_code_body()
}

struct ReadState<'a> {
    reader: Reader<'a>,
    policy: VersionPolicy,
    options: DecoderOptions,
    refs: DecodeRefs,
    /// Next pre-reserved slot to fill; set while realizing a deferred code object.
    fill_from: Option<u32>,
    /// Copy of the input shared by deferred code objects.
    shared: Option<Rc<[u8]>>,
    depth: usize,
}

impl<'a> ReadState<'a> {
    fn new(reader: Reader<'a>, policy: VersionPolicy, options: DecoderOptions) -> Self {
        Self {
            reader,
            policy,
            options,
            refs: DecodeRefs::default(),
            fill_from: None,
            shared: None,
            depth: 0,
        }
    }

    // ---- Cursor primitives ------------------------------------------------

    fn u8(&mut self) -> Result<u8> {
        let at = self.reader.x;
        self.reader
            .try_u8()
            .map_err(|e| MarshalError::from_buffer(e, at))
    }

    fn i32(&mut self) -> Result<i32> {
        let at = self.reader.x;
        self.reader
            .try_i32le()
            .map_err(|e| MarshalError::from_buffer(e, at))
    }

    fn u32(&mut self) -> Result<u32> {
        let at = self.reader.x;
        self.reader
            .try_u32le()
            .map_err(|e| MarshalError::from_buffer(e, at))
    }

    fn f64(&mut self) -> Result<f64> {
        let at = self.reader.x;
        self.reader
            .try_f64le()
            .map_err(|e| MarshalError::from_buffer(e, at))
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let at = self.reader.x;
        self.reader
            .try_buf(n)
            .map_err(|e| MarshalError::from_buffer(e, at))
    }

    fn utf8(&mut self, n: usize) -> Result<&'a str> {
        let at = self.reader.x;
        self.reader
            .try_utf8(n)
            .map_err(|e| MarshalError::from_buffer(e, at))
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        let at = self.reader.x;
        self.reader
            .try_skip(n)
            .map_err(|e| MarshalError::from_buffer(e, at))
    }

    /// Reads an i32 length. Negative lengths are malformed.
    fn size(&mut self) -> Result<usize> {
        let at = self.reader.x;
        let n = self.i32()?;
        if n < 0 {
            return Err(MarshalError::BadLength {
                declared: n as i64,
                offset: at,
            });
        }
        Ok(n as usize)
    }

    /// Reads an element count. Every element takes at least one byte, so a
    /// count above the remaining input means the stream was cut short.
    fn count(&mut self) -> Result<usize> {
        let n = self.size()?;
        let available = self.reader.size();
        if n > available {
            return Err(MarshalError::UnexpectedEof {
                offset: self.reader.x,
                needed: n,
                available,
            });
        }
        Ok(n)
    }

    // ---- Reference slots --------------------------------------------------

    fn claim(&mut self) -> u32 {
        match self.fill_from.as_mut() {
            Some(next) => {
                let index = *next;
                *next += 1;
                self.refs.set(index, Slot::Reserved);
                index
            }
            None => self.refs.push_reserved(),
        }
    }

    /// Number of slots claimed so far, in stream order.
    fn claimed(&self) -> usize {
        match self.fill_from {
            Some(next) => next as usize,
            None => self.refs.len(),
        }
    }

    fn publish(&self, slot: Option<u32>, value: &Value) {
        if let Some(index) = slot {
            self.refs.set(index, Slot::Ready(value.clone()));
        }
    }

    fn check_tag(&self, byte: u8, offset: usize) -> Result<(u8, bool)> {
        let tag = byte & !FLAG_REF;
        let flagged = byte & FLAG_REF != 0;
        if !self.policy.recognizes(tag)
            || (flagged && (!self.policy.references || tag == TYPE_REF))
        {
            return Err(MarshalError::UnknownTag { tag: byte, offset });
        }
        Ok((tag, flagged))
    }

    fn enter(&mut self) -> Result<()> {
        if self.depth >= self.options.max_depth {
            return Err(MarshalError::RecursionLimit {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    // ---- Values -----------------------------------------------------------

    fn read_any(&mut self) -> Result<Value> {
        self.enter()?;
        let result = self.read_value();
        self.depth -= 1;
        result
    }

    fn read_value(&mut self) -> Result<Value> {
        let offset = self.reader.x;
        let byte = self.u8()?;
        let (tag, flagged) = self.check_tag(byte, offset)?;
        let slot = if flagged { Some(self.claim()) } else { None };
        let value = match tag {
            TYPE_NONE => Value::None,
            TYPE_FALSE => Value::Bool(false),
            TYPE_TRUE => Value::Bool(true),
            TYPE_INT => Value::int(self.i32()?),
            TYPE_LONG => Value::Int(self.read_long()?),
            TYPE_FLOAT => Value::Float(self.f64()?),
            TYPE_COMPLEX => {
                let re = self.f64()?;
                let im = self.f64()?;
                Value::Complex { re, im }
            }
            TYPE_BYTES => {
                let n = self.size()?;
                Value::Bytes(self.bytes(n)?.to_vec())
            }
            TYPE_UNICODE | TYPE_INTERNED => {
                let n = self.size()?;
                let text = self.utf8(n)?;
                Value::Str(Str {
                    text: text.into(),
                    interned: tag == TYPE_INTERNED,
                })
            }
            TYPE_SHORT_ASCII | TYPE_SHORT_ASCII_INTERNED => {
                let n = self.u8()? as usize;
                let text = self.utf8(n)?;
                Value::Str(Str {
                    text: text.into(),
                    interned: tag == TYPE_SHORT_ASCII_INTERNED,
                })
            }
            TYPE_TUPLE => {
                let n = self.count()?;
                self.read_seq(n, slot, true)?
            }
            TYPE_SMALL_TUPLE => {
                let n = self.u8()? as usize;
                self.read_seq(n, slot, true)?
            }
            TYPE_LIST => {
                let n = self.count()?;
                self.read_seq(n, slot, false)?
            }
            TYPE_DICT => self.read_dict(slot)?,
            TYPE_SET => self.read_set(slot, false)?,
            TYPE_FROZENSET => self.read_set(slot, true)?,
            TYPE_CODE => self.read_code()?,
            TYPE_REF => return self.read_ref(offset),
            TYPE_UNKNOWN => {
                if !self.options.substitute_unrepresentable {
                    return Err(MarshalError::Unrepresentable { offset });
                }
                tracing::warn!(target: "marshal", offset, "substituting None for unrepresentable object");
                Value::None
            }
            _ => return Err(MarshalError::UnknownTag { tag: byte, offset }),
        };
        self.publish(slot, &value);
        Ok(value)
    }

    fn read_long(&mut self) -> Result<BigInt> {
        let offset = self.reader.x;
        let n = self.i32()?;
        let digits = self.bytes(n.unsigned_abs() as usize)?;
        if digits.last() == Some(&0) {
            return Err(MarshalError::UnnormalizedLong { offset });
        }
        let sign = match n {
            0 => Sign::NoSign,
            n if n < 0 => Sign::Minus,
            _ => Sign::Plus,
        };
        Ok(BigInt::from_bytes_le(sign, digits))
    }

    fn read_seq(&mut self, n: usize, slot: Option<u32>, tuple: bool) -> Result<Value> {
        let rc = Rc::new(RefCell::new(Vec::new()));
        let value = if tuple {
            Value::Tuple(rc.clone())
        } else {
            Value::List(rc.clone())
        };
        self.publish(slot, &value);
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(self.read_any()?);
        }
        *rc.borrow_mut() = items;
        Ok(value)
    }

    fn read_dict(&mut self, slot: Option<u32>) -> Result<Value> {
        let n = self.count()?;
        let rc = Rc::new(RefCell::new(Dict::new()));
        let value = Value::Dict(rc.clone());
        self.publish(slot, &value);
        let mut dict = Dict::new();
        for _ in 0..n {
            let key = self.read_any()?;
            let val = self.read_any()?;
            dict.insert(key, val);
        }
        *rc.borrow_mut() = dict;
        Ok(value)
    }

    fn read_set(&mut self, slot: Option<u32>, frozen: bool) -> Result<Value> {
        let n = self.count()?;
        let rc = Rc::new(RefCell::new(SetItems::new()));
        let value = if frozen {
            Value::FrozenSet(rc.clone())
        } else {
            Value::Set(rc.clone())
        };
        if !frozen {
            self.publish(slot, &value);
        }
        let mut items = SetItems::new();
        for _ in 0..n {
            items.insert(self.read_any()?);
        }
        *rc.borrow_mut() = items;
        Ok(value)
    }

    fn read_ref(&mut self, offset: usize) -> Result<Value> {
        let index = self.u32()?;
        let populated = self.claimed();
        if index as usize >= populated {
            return Err(MarshalError::BadReference {
                index,
                offset,
                populated,
            });
        }
        let mut slot = self.refs.get(index);
        loop {
            match slot {
                Some(Slot::Ready(value)) => return Ok(value),
                Some(Slot::Deferred(code)) => {
                    // The target sits inside a skipped code object. Decoding
                    // it fills its slots, possibly with deeper deferred code.
                    code.get()?;
                    let next = self.refs.get(index);
                    if matches!(&next, Some(Slot::Deferred(again)) if again.ptr_eq(&code)) {
                        return Err(MarshalError::ReservedReference { index, offset });
                    }
                    slot = next;
                }
                Some(Slot::Reserved) | None => {
                    return Err(MarshalError::ReservedReference { index, offset })
                }
            }
        }
    }

    fn read_code(&mut self) -> Result<Value> {
        // depth 1 is the top-level value
        if self.options.lazy == LazyMode::Lazy && self.depth > 1 {
            return self.defer_code();
        }
        Ok(Value::Code(CodeRef::new(self.read_code_body()?)))
    }

    fn read_code_body(&mut self) -> Result<CodeObject> {
        let mut counters = [0i32; 6];
        for counter in counters.iter_mut() {
            *counter = self.i32()?;
        }
        let code = self.read_any()?;
        let consts = self.read_any()?;
        let names = self.read_any()?;
        let varnames = self.read_any()?;
        let freevars = self.read_any()?;
        let cellvars = self.read_any()?;
        let filename = self.read_any()?;
        let name = self.read_any()?;
        let firstlineno = self.i32()?;
        let lnotab = self.read_any()?;
        let [argcount, posonlyargcount, kwonlyargcount, nlocals, stacksize, flags] = counters;
        Ok(CodeObject {
            argcount,
            posonlyargcount,
            kwonlyargcount,
            nlocals,
            stacksize,
            flags,
            code,
            consts,
            names,
            varnames,
            freevars,
            cellvars,
            filename,
            name,
            firstlineno,
            lnotab,
        })
    }

    // ---- Lazy code objects ------------------------------------------------

    fn defer_code(&mut self) -> Result<Value> {
        let offset = self.reader.x;
        let base = self.claimed();
        let mut scan = Scan {
            base,
            claimed: 0,
            building: Vec::new(),
        };
        self.skip_code_body(&mut scan)?;
        let inner = scan.claimed;

        let data = self.reader.uint8;
        let input = self.shared.get_or_insert_with(|| Rc::from(data)).clone();
        let code = CodeRef::deferred(Deferred {
            input,
            offset,
            first_slot: base as u32,
            refs: self.refs.clone(),
            policy: self.policy,
            options: self.options,
            depth: self.depth,
        });
        for _ in 0..inner {
            let index = self.claim();
            self.refs.set(index, Slot::Deferred(code.clone()));
        }
        tracing::trace!(target: "marshal", offset, slots = inner, "deferred code object");
        Ok(Value::Code(code))
    }

    fn skip_code_body(&mut self, scan: &mut Scan) -> Result<()> {
        self.skip(6 * 4)?;
        for _ in 0..8 {
            self.skip_any(scan)?;
        }
        self.skip(4)?;
        self.skip_any(scan)
    }

    /// Walks one value without building it, counting the slots it would claim.
    fn skip_any(&mut self, scan: &mut Scan) -> Result<()> {
        self.enter()?;
        let result = self.skip_value(scan);
        self.depth -= 1;
        result
    }

    fn skip_value(&mut self, scan: &mut Scan) -> Result<()> {
        let offset = self.reader.x;
        let byte = self.u8()?;
        let (tag, flagged) = self.check_tag(byte, offset)?;
        // Frozensets and code objects are published only once built.
        let building = flagged && matches!(tag, TYPE_FROZENSET | TYPE_CODE);
        if flagged {
            if building {
                scan.building.push(scan.base + scan.claimed as usize);
            }
            scan.claimed += 1;
        }
        let result = self.skip_payload(tag, byte, offset, scan);
        if building {
            scan.building.pop();
        }
        result
    }

    fn skip_payload(&mut self, tag: u8, byte: u8, offset: usize, scan: &mut Scan) -> Result<()> {
        match tag {
            TYPE_NONE | TYPE_FALSE | TYPE_TRUE => {}
            TYPE_UNKNOWN => {
                if !self.options.substitute_unrepresentable {
                    return Err(MarshalError::Unrepresentable { offset });
                }
            }
            TYPE_INT => self.skip(4)?,
            TYPE_LONG => {
                self.read_long()?;
            }
            TYPE_FLOAT => self.skip(8)?,
            TYPE_COMPLEX => self.skip(16)?,
            TYPE_BYTES => {
                let n = self.size()?;
                self.skip(n)?;
            }
            TYPE_UNICODE | TYPE_INTERNED => {
                let n = self.size()?;
                self.utf8(n)?;
            }
            TYPE_SHORT_ASCII | TYPE_SHORT_ASCII_INTERNED => {
                let n = self.u8()? as usize;
                self.utf8(n)?;
            }
            TYPE_TUPLE | TYPE_LIST | TYPE_SET | TYPE_FROZENSET => {
                let n = self.count()?;
                for _ in 0..n {
                    self.skip_any(scan)?;
                }
            }
            TYPE_SMALL_TUPLE => {
                let n = self.u8()?;
                for _ in 0..n {
                    self.skip_any(scan)?;
                }
            }
            TYPE_DICT => {
                let n = self.count()?;
                for _ in 0..2 * n {
                    self.skip_any(scan)?;
                }
            }
            TYPE_CODE => self.skip_code_body(scan)?,
            TYPE_REF => {
                let index = self.u32()?;
                let slot = index as usize;
                let populated = scan.base + scan.claimed as usize;
                if slot >= populated {
                    return Err(MarshalError::BadReference {
                        index,
                        offset,
                        populated,
                    });
                }
                let reserved = if slot < scan.base {
                    matches!(self.refs.get(index), Some(Slot::Reserved))
                } else {
                    scan.building.contains(&slot)
                };
                if reserved {
                    return Err(MarshalError::ReservedReference { index, offset });
                }
            }
            _ => return Err(MarshalError::UnknownTag { tag: byte, offset }),
        }
        Ok(())
    }
}

/// Slot bookkeeping for the walk over a deferred code body.
struct Scan {
    /// Slots claimed before the walk.
    base: usize,
    /// Slots the walked bytes claim.
    claimed: u32,
    /// Frozenset and code slots whose bodies are being walked.
    building: Vec<usize>,
}
