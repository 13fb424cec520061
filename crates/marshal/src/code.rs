//! Code objects and their lazily decoded handle.

use std::cell::{OnceCell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use crate::decoder::{realize, Deferred};
use crate::error::{MarshalError, Result};
use crate::value::{eq_inner, EqGuard, Value};

/// A compiled-code record. Field order is wire order.
#[derive(Debug, Clone)]
pub struct CodeObject {
    pub argcount: i32,
    pub posonlyargcount: i32,
    pub kwonlyargcount: i32,
    pub nlocals: i32,
    pub stacksize: i32,
    pub flags: i32,
    /// Bytecode, normally `Value::Bytes`.
    pub code: Value,
    pub consts: Value,
    pub names: Value,
    pub varnames: Value,
    pub freevars: Value,
    pub cellvars: Value,
    pub filename: Value,
    pub name: Value,
    pub firstlineno: i32,
    pub lnotab: Value,
}

impl CodeObject {
    /// A code object with the given bytecode, empty name tables and
    /// zeroed counters.
    pub fn new(name: &str, filename: &str, bytecode: Vec<u8>) -> Self {
        Self {
            argcount: 0,
            posonlyargcount: 0,
            kwonlyargcount: 0,
            nlocals: 0,
            stacksize: 0,
            flags: 0,
            code: Value::Bytes(bytecode),
            consts: Value::tuple(vec![]),
            names: Value::tuple(vec![]),
            varnames: Value::tuple(vec![]),
            freevars: Value::tuple(vec![]),
            cellvars: Value::tuple(vec![]),
            filename: Value::interned(filename),
            name: Value::interned(name),
            firstlineno: 1,
            lnotab: Value::Bytes(Vec::new()),
        }
    }

    /// The six leading counters, in wire order.
    pub(crate) fn counters(&self) -> [i32; 6] {
        [
            self.argcount,
            self.posonlyargcount,
            self.kwonlyargcount,
            self.nlocals,
            self.stacksize,
            self.flags,
        ]
    }

    /// The tagged fields between the counters and `firstlineno`, in wire order.
    pub(crate) fn fields(&self) -> [&Value; 8] {
        [
            &self.code,
            &self.consts,
            &self.names,
            &self.varnames,
            &self.freevars,
            &self.cellvars,
            &self.filename,
            &self.name,
        ]
    }

    pub(crate) fn eq_with(&self, other: &CodeObject, guard: &mut EqGuard) -> bool {
        self.counters() == other.counters()
            && self.firstlineno == other.firstlineno
            && self
                .fields()
                .iter()
                .zip(other.fields().iter())
                .all(|(a, b)| eq_inner(a, b, guard))
            && eq_inner(&self.lnotab, &other.lnotab, guard)
    }
}

impl PartialEq for CodeObject {
    fn eq(&self, other: &Self) -> bool {
        self.eq_with(other, &mut EqGuard::new())
    }
}

struct LazyCode {
    value: OnceCell<CodeObject>,
    pending: RefCell<Option<Deferred>>,
    /// Body offset in the decoded input; 0 for eagerly built code.
    offset: usize,
}

/// Shared handle to a code object that may not be decoded yet.
///
/// Lazily decoded handles keep a copy of the input and the decode-time
/// reference table until first access.
#[derive(Clone)]
pub struct CodeRef(Rc<LazyCode>);

impl CodeRef {
    pub fn new(code: CodeObject) -> Self {
        Self(Rc::new(LazyCode {
            value: OnceCell::from(code),
            pending: RefCell::new(None),
            offset: 0,
        }))
    }

    pub(crate) fn deferred(deferred: Deferred) -> Self {
        let offset = deferred.offset;
        Self(Rc::new(LazyCode {
            value: OnceCell::new(),
            pending: RefCell::new(Some(deferred)),
            offset,
        }))
    }

    /// Returns the code object, decoding it on first access.
    pub fn get(&self) -> Result<&CodeObject> {
        if let Some(code) = self.0.value.get() {
            return Ok(code);
        }
        // Taken while decoding; a nested request for the same object means
        // the stream references it from inside itself.
        let Some(deferred) = self.0.pending.borrow_mut().take() else {
            return Err(MarshalError::ReservedReference {
                index: 0,
                offset: self.0.offset,
            });
        };
        match realize(&deferred) {
            Ok(code) => {
                tracing::trace!(target: "marshal", offset = self.0.offset, "realized deferred code object");
                Ok(self.0.value.get_or_init(|| code))
            }
            Err(err) => {
                *self.0.pending.borrow_mut() = Some(deferred);
                Err(err)
            }
        }
    }

    /// The code object if it has been decoded.
    pub fn realized(&self) -> Option<&CodeObject> {
        self.0.value.get()
    }

    pub fn is_realized(&self) -> bool {
        self.0.value.get().is_some()
    }

    pub fn ptr_eq(&self, other: &CodeRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for CodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.realized() {
            Some(code) => fmt::Debug::fmt(code, f),
            None => f.write_str("CodeRef(<deferred>)"),
        }
    }
}

impl Value {
    /// Forces every deferred code object reachable from this value.
    ///
    /// Realization also drops each object's copy of the input.
    pub fn realize_all(&self) -> Result<()> {
        let mut seen = HashSet::new();
        realize_walk(self, &mut seen)
    }
}

fn realize_walk(value: &Value, seen: &mut HashSet<usize>) -> Result<()> {
    if let Some(addr) = value.handle_addr() {
        if !seen.insert(addr) {
            return Ok(());
        }
    }
    match value {
        Value::Tuple(rc) | Value::List(rc) => {
            for item in rc.borrow().iter() {
                realize_walk(item, seen)?;
            }
        }
        Value::Dict(rc) => {
            for (k, v) in rc.borrow().iter() {
                realize_walk(k, seen)?;
                realize_walk(v, seen)?;
            }
        }
        Value::Set(rc) | Value::FrozenSet(rc) => {
            for item in rc.borrow().iter() {
                realize_walk(item, seen)?;
            }
        }
        Value::Code(code) => {
            let code = code.get()?;
            for field in code.fields() {
                realize_walk(field, seen)?;
            }
            realize_walk(&code.lnotab, seen)?;
        }
        _ => {}
    }
    Ok(())
}
