//! The closed set of kinds the codec can serialize.
//!
//! Containers are shared handles (`Rc<RefCell<_>>`), so one container can
//! appear under several parents, or under itself. Cloning a `Value` clones
//! the handle, not the contents; use [`Value::is_same`] to test identity and
//! `==` for structural equality.
//!
//! A cyclic graph is an `Rc` cycle and is not reclaimed when dropped.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use num_bigint::BigInt;

use crate::code::{CodeObject, CodeRef};

/// Shared, interiorly mutable container storage.
pub type Shared<T> = Rc<RefCell<T>>;

/// A text string plus its interning flag.
#[derive(Clone)]
pub struct Str {
    pub text: Rc<str>,
    /// Interned strings with equal text are one object: the encoder writes
    /// them once per call when the version supports references.
    pub interned: bool,
}

impl Str {
    pub fn new(text: impl Into<Rc<str>>) -> Self {
        Self {
            text: text.into(),
            interned: false,
        }
    }

    pub fn interned(text: impl Into<Rc<str>>) -> Self {
        Self {
            text: text.into(),
            interned: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Hashable projection of a value, consistent with structural equality:
/// two hashable values are `==` exactly when their keys are equal.
///
/// Lists, dicts, sets, code objects, references, opaque values and cyclic
/// tuples have no key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum HashKey {
    None,
    Bool(bool),
    Int(BigInt),
    Float(u64),
    Complex(u64, u64),
    Bytes(Vec<u8>),
    Str(Rc<str>),
    Tuple(Vec<HashKey>),
    /// Member keys, sorted.
    FrozenSet(Vec<HashKey>),
}

impl Value {
    pub(crate) fn hash_key(&self) -> Option<HashKey> {
        hash_key_inner(self, &mut Vec::new())
    }
}

fn hash_key_inner(value: &Value, active: &mut Vec<usize>) -> Option<HashKey> {
    let key = match value {
        Value::None => HashKey::None,
        Value::Bool(b) => HashKey::Bool(*b),
        Value::Int(i) => HashKey::Int(i.clone()),
        Value::Float(f) => HashKey::Float(f.to_bits()),
        Value::Complex { re, im } => HashKey::Complex(re.to_bits(), im.to_bits()),
        Value::Bytes(b) => HashKey::Bytes(b.clone()),
        Value::Str(s) => HashKey::Str(s.text.clone()),
        Value::Tuple(rc) => HashKey::Tuple(member_keys(addr(rc), rc.borrow().iter(), active)?),
        Value::FrozenSet(rc) => {
            let mut keys = member_keys(addr(rc), rc.borrow().iter(), active)?;
            keys.sort_unstable();
            HashKey::FrozenSet(keys)
        }
        _ => return None,
    };
    Some(key)
}

fn member_keys<'a>(
    handle: usize,
    members: impl Iterator<Item = &'a Value>,
    active: &mut Vec<usize>,
) -> Option<Vec<HashKey>> {
    if active.contains(&handle) {
        return None;
    }
    active.push(handle);
    let keys = members.map(|v| hash_key_inner(v, active)).collect();
    active.pop();
    keys
}

/// Index key of a `Dict` entry or set member. Unhashable keys are numbered
/// by insertion position.
#[derive(Clone, PartialEq, Eq, Hash)]
enum EntryKey {
    Hashed(HashKey),
    Unhashed(usize),
}

/// Finds the entry equal to `key`: by hash for hashable keys, otherwise by a
/// structural scan over the unhashable entries only. On a miss, returns the
/// key to insert under.
fn locate<T>(
    entries: &IndexMap<EntryKey, T>,
    unhashed: &[usize],
    key: &Value,
    key_of: impl Fn(&T) -> &Value,
    guard: &mut EqGuard,
) -> Result<usize, EntryKey> {
    match key.hash_key() {
        Some(hash) => {
            let slot = EntryKey::Hashed(hash);
            entries.get_index_of(&slot).ok_or(slot)
        }
        None => unhashed
            .iter()
            .copied()
            .find(|&i| {
                entries
                    .get_index(i)
                    .is_some_and(|(_, e)| eq_inner(key_of(e), key, guard))
            })
            .ok_or(EntryKey::Unhashed(entries.len())),
    }
}

/// Insertion-ordered mapping with unique keys.
#[derive(Clone, Default)]
pub struct Dict {
    entries: IndexMap<EntryKey, (Value, Value)>,
    unhashed: Vec<usize>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `key`, replacing (in place) the value of an equal key.
    /// Returns the replaced value.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        match self.locate(&key, &mut EqGuard::new()) {
            Ok(index) => Some(std::mem::replace(&mut self.entries[index].1, value)),
            Err(slot) => {
                if let EntryKey::Unhashed(index) = slot {
                    self.unhashed.push(index);
                }
                self.entries.insert(slot, (key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.get_with(key, &mut EqGuard::new())
    }

    fn get_with(&self, key: &Value, guard: &mut EqGuard) -> Option<&Value> {
        let index = self.locate(key, guard).ok()?;
        Some(&self.entries[index].1)
    }

    fn locate(&self, key: &Value, guard: &mut EqGuard) -> Result<usize, EntryKey> {
        locate(&self.entries, &self.unhashed, key, |(k, _)| k, guard)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.values()
    }
}

impl FromIterator<(Value, Value)> for Dict {
    fn from_iter<I: IntoIterator<Item = (Value, Value)>>(iter: I) -> Self {
        let mut dict = Dict::new();
        for (k, v) in iter {
            dict.insert(k, v);
        }
        dict
    }
}

/// Unordered collection of unique members. Iteration follows insertion.
#[derive(Clone, Default)]
pub struct SetItems {
    items: IndexMap<EntryKey, Value>,
    unhashed: Vec<usize>,
}

impl SetItems {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` unless an equal member exists. Returns whether it was added.
    pub fn insert(&mut self, value: Value) -> bool {
        match self.locate(&value, &mut EqGuard::new()) {
            Ok(_) => false,
            Err(slot) => {
                if let EntryKey::Unhashed(index) = slot {
                    self.unhashed.push(index);
                }
                self.items.insert(slot, value);
                true
            }
        }
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.locate(value, &mut EqGuard::new()).is_ok()
    }

    fn locate(&self, value: &Value, guard: &mut EqGuard) -> Result<usize, EntryKey> {
        locate(&self.items, &self.unhashed, value, |v| v, guard)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.items.values()
    }
}

impl FromIterator<Value> for SetItems {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut set = SetItems::new();
        for v in iter {
            set.insert(v);
        }
        set
    }
}

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(BigInt),
    Float(f64),
    Complex { re: f64, im: f64 },
    Bytes(Vec<u8>),
    Str(Str),
    Tuple(Shared<Vec<Value>>),
    List(Shared<Vec<Value>>),
    Dict(Shared<Dict>),
    Set(Shared<SetItems>),
    FrozenSet(Shared<SetItems>),
    Code(CodeRef),
    /// Index into a decode-time reference table. Decoders resolve these to
    /// the referenced object; encoders reject them.
    Reference(u32),
    /// A host value kind with no wire form, identified by its type name.
    Opaque(String),
}

impl Value {
    pub fn int(i: impl Into<BigInt>) -> Self {
        Value::Int(i.into())
    }

    pub fn str(text: impl Into<Rc<str>>) -> Self {
        Value::Str(Str::new(text))
    }

    pub fn interned(text: impl Into<Rc<str>>) -> Self {
        Value::Str(Str::interned(text))
    }

    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(data.into())
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::new(RefCell::new(items)))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(pairs: Vec<(Value, Value)>) -> Self {
        Value::Dict(Rc::new(RefCell::new(pairs.into_iter().collect())))
    }

    pub fn set(items: Vec<Value>) -> Self {
        Value::Set(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn frozenset(items: Vec<Value>) -> Self {
        Value::FrozenSet(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn code(code: CodeObject) -> Self {
        Value::Code(CodeRef::new(code))
    }

    /// Type name used in errors and `Debug` output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Complex { .. } => "complex",
            Value::Bytes(_) => "bytes",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Set(_) => "set",
            Value::FrozenSet(_) => "frozenset",
            Value::Code(_) => "code",
            Value::Reference(_) => "reference",
            Value::Opaque(_) => "opaque",
        }
    }

    /// Address of the shared handle for container and code values.
    pub(crate) fn handle_addr(&self) -> Option<usize> {
        match self {
            Value::Tuple(rc) | Value::List(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Dict(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Set(rc) | Value::FrozenSet(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Code(code) => Some(code.addr()),
            _ => None,
        }
    }

    /// Identity test: true when both values are the same container or code
    /// handle, or both are `None`.
    pub fn is_same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            _ => match (self.handle_addr(), other.handle_addr()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Items of a tuple or list.
    pub fn as_seq(&self) -> Option<&Shared<Vec<Value>>> {
        match self {
            Value::Tuple(rc) | Value::List(rc) => Some(rc),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Shared<Dict>> {
        match self {
            Value::Dict(rc) => Some(rc),
            _ => None,
        }
    }

    pub fn as_code(&self) -> Option<&CodeRef> {
        match self {
            Value::Code(code) => Some(code),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i.into())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i.into())
    }
}

impl From<u64> for Value {
    fn from(i: u64) -> Self {
        Value::Int(i.into())
    }
}

impl From<BigInt> for Value {
    fn from(i: BigInt) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
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

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

// ---------------------------------------------------------------------------
// Structural equality

/// Pairs of handles currently under comparison. A pair met again while still
/// in progress is a cycle and compares equal.
pub(crate) type EqGuard = HashSet<(usize, usize)>;

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        let mut guard = EqGuard::new();
        eq_inner(self, other, &mut guard)
    }
}

/// Compares two handles with `compare`, treating a pair already in progress
/// as equal. The pair leaves the guard once its comparison is done.
fn guarded(
    a: usize,
    b: usize,
    guard: &mut EqGuard,
    compare: impl FnOnce(&mut EqGuard) -> bool,
) -> bool {
    if a == b || !guard.insert((a, b)) {
        return true;
    }
    let equal = compare(guard);
    guard.remove(&(a, b));
    equal
}

fn addr<T>(rc: &Shared<T>) -> usize {
    Rc::as_ptr(rc) as *const () as usize
}

pub(crate) fn eq_inner(a: &Value, b: &Value, guard: &mut EqGuard) -> bool {
    match (a, b) {
        (Value::None, Value::None) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x.to_bits() == y.to_bits(),
        (Value::Complex { re: ar, im: ai }, Value::Complex { re: br, im: bi }) => {
            ar.to_bits() == br.to_bits() && ai.to_bits() == bi.to_bits()
        }
        (Value::Bytes(x), Value::Bytes(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x.text == y.text,
        (Value::Reference(x), Value::Reference(y)) => x == y,
        (Value::Opaque(x), Value::Opaque(y)) => x == y,
        (Value::Tuple(x), Value::Tuple(y)) | (Value::List(x), Value::List(y)) => {
            guarded(addr(x), addr(y), guard, |guard| {
                let (xs, ys) = (x.borrow(), y.borrow());
                xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(l, r)| eq_inner(l, r, guard))
            })
        }
        (Value::Dict(x), Value::Dict(y)) => guarded(addr(x), addr(y), guard, |guard| {
            let (xd, yd) = (x.borrow(), y.borrow());
            xd.len() == yd.len()
                && xd
                    .iter()
                    .all(|(k, v)| yd.get_with(k, guard).is_some_and(|v2| eq_inner(v, v2, guard)))
        }),
        (Value::Set(x), Value::Set(y)) | (Value::FrozenSet(x), Value::FrozenSet(y)) => {
            guarded(addr(x), addr(y), guard, |guard| {
                let (xs, ys) = (x.borrow(), y.borrow());
                xs.len() == ys.len() && xs.iter().all(|item| ys.locate(item, guard).is_ok())
            })
        }
        (Value::Code(x), Value::Code(y)) => {
            guarded(x.addr(), y.addr(), guard, |guard| match (x.get(), y.get()) {
                (Ok(cx), Ok(cy)) => cx.eq_with(cy, guard),
                _ => false,
            })
        }
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Debug

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stack = Vec::new();
        fmt_inner(self, f, &mut stack)
    }
}

fn fmt_items<'v>(
    items: impl Iterator<Item = &'v Value>,
    f: &mut fmt::Formatter<'_>,
    stack: &mut Vec<usize>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        fmt_inner(item, f, stack)?;
    }
    Ok(())
}

fn fmt_inner(value: &Value, f: &mut fmt::Formatter<'_>, stack: &mut Vec<usize>) -> fmt::Result {
    if let Some(addr) = value.handle_addr() {
        if stack.contains(&addr) {
            return match value {
                Value::Tuple(_) => f.write_str("(...)"),
                Value::List(_) => f.write_str("[...]"),
                _ => f.write_str("{...}"),
            };
        }
        stack.push(addr);
        let result = fmt_container(value, f, stack);
        stack.pop();
        return result;
    }
    match value {
        Value::None => f.write_str("None"),
        Value::Bool(true) => f.write_str("True"),
        Value::Bool(false) => f.write_str("False"),
        Value::Int(i) => write!(f, "{i}"),
        Value::Float(x) => write!(f, "{x:?}"),
        Value::Complex { re, im } => write!(f, "({re:?}{im:+?}j)"),
        Value::Bytes(b) => write!(f, "b\"{}\"", b.escape_ascii()),
        Value::Str(s) => write!(f, "{:?}", s.as_str()),
        Value::Reference(i) => write!(f, "<ref {i}>"),
        Value::Opaque(name) => write!(f, "<{name} object>"),
        _ => Ok(()),
    }
}

fn fmt_container(value: &Value, f: &mut fmt::Formatter<'_>, stack: &mut Vec<usize>) -> fmt::Result {
    match value {
        Value::Tuple(rc) => {
            let items = rc.borrow();
            f.write_str("(")?;
            fmt_items(items.iter(), f, stack)?;
            if items.len() == 1 {
                f.write_str(",")?;
            }
            f.write_str(")")
        }
        Value::List(rc) => {
            f.write_str("[")?;
            fmt_items(rc.borrow().iter(), f, stack)?;
            f.write_str("]")
        }
        Value::Dict(rc) => {
            f.write_str("{")?;
            for (i, (k, v)) in rc.borrow().iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                fmt_inner(k, f, stack)?;
                f.write_str(": ")?;
                fmt_inner(v, f, stack)?;
            }
            f.write_str("}")
        }
        Value::Set(rc) => {
            let items = rc.borrow();
            if items.is_empty() {
                return f.write_str("set()");
            }
            f.write_str("{")?;
            fmt_items(items.iter(), f, stack)?;
            f.write_str("}")
        }
        Value::FrozenSet(rc) => {
            f.write_str("frozenset({")?;
            fmt_items(rc.borrow().iter(), f, stack)?;
            f.write_str("})")
        }
        Value::Code(code) => match code.realized() {
            Some(c) => write!(f, "<code object {:?}>", c.name.as_str().unwrap_or("?")),
            None => f.write_str("<code object (deferred)>"),
        },
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floats_compare_bit_exact() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(0.0), Value::Float(-0.0));
        assert_ne!(Value::Bool(true), Value::int(1));
    }

    #[test]
    fn tuple_and_list_are_distinct() {
        let t = Value::tuple(vec![Value::int(1)]);
        let l = Value::list(vec![Value::int(1)]);
        assert_ne!(t, l);
    }

    #[test]
    fn interning_flag_does_not_affect_equality() {
        assert_eq!(Value::str("x"), Value::interned("x"));
    }

    #[test]
    fn dict_insert_replaces_equal_key() {
        let mut d = Dict::new();
        assert!(d.insert(Value::str("a"), Value::int(1)).is_none());
        assert!(d.insert(Value::str("b"), Value::int(2)).is_none());
        let old = d.insert(Value::str("a"), Value::int(3));
        assert_eq!(old, Some(Value::int(1)));
        let keys: Vec<_> = d.iter().map(|(k, _)| k.as_str().unwrap().to_owned()).collect();
        assert_eq!(keys, ["a", "b"]);
        assert_eq!(d.get(&Value::str("a")), Some(&Value::int(3)));
    }

    #[test]
    fn dict_equality_ignores_order() {
        let a = Value::dict(vec![(Value::int(1), Value::None), (Value::int(2), Value::None)]);
        let b = Value::dict(vec![(Value::int(2), Value::None), (Value::int(1), Value::None)]);
        assert_eq!(a, b);
    }

    #[test]
    fn set_deduplicates_and_compares_by_membership() {
        let a = Value::set(vec![Value::int(1), Value::int(2), Value::int(1)]);
        let b = Value::set(vec![Value::int(2), Value::int(1)]);
        assert_eq!(a, b);
        assert_ne!(a, Value::frozenset(vec![Value::int(1), Value::int(2)]));
    }

    #[test]
    fn hash_keys_follow_equality() {
        let pairs = [
            (Value::str("k"), Value::interned("k")),
            (
                Value::tuple(vec![Value::int(1), Value::bytes(b"x".to_vec())]),
                Value::tuple(vec![Value::int(1), Value::bytes(b"x".to_vec())]),
            ),
            (
                Value::frozenset(vec![Value::int(1), Value::str("a")]),
                Value::frozenset(vec![Value::str("a"), Value::int(1)]),
            ),
        ];
        for (a, b) in &pairs {
            assert_eq!(a, b);
            assert!(a.hash_key().is_some());
            assert!(a.hash_key() == b.hash_key());
        }
        assert!(Value::Bool(true).hash_key() != Value::int(1).hash_key());
        assert!(Value::Float(0.0).hash_key() != Value::Float(-0.0).hash_key());
        assert!(Value::list(vec![]).hash_key().is_none());
        assert!(Value::tuple(vec![Value::list(vec![])]).hash_key().is_none());
    }

    #[test]
    fn cyclic_tuple_has_no_hash_key() {
        let t = Value::tuple(vec![]);
        if let Value::Tuple(rc) = &t {
            rc.borrow_mut().push(t.clone());
        }
        assert!(t.hash_key().is_none());
    }

    #[test]
    fn unhashable_keys_fall_back_to_structural_lookup() {
        let mut d = Dict::new();
        d.insert(Value::list(vec![Value::int(1)]), Value::str("one"));
        d.insert(Value::int(1), Value::str("int"));
        d.insert(Value::tuple(vec![Value::int(1)]), Value::str("tuple"));
        let old = d.insert(Value::list(vec![Value::int(1)]), Value::str("again"));
        assert_eq!(old, Some(Value::str("one")));
        assert_eq!(d.len(), 3);
        assert_eq!(d.get(&Value::list(vec![Value::int(1)])), Some(&Value::str("again")));
        assert_eq!(d.get(&Value::tuple(vec![Value::int(1)])), Some(&Value::str("tuple")));
        assert_eq!(d.get(&Value::list(vec![Value::int(2)])), None);

        let s: SetItems = [Value::list(vec![]), Value::list(vec![]), Value::None]
            .into_iter()
            .collect();
        assert_eq!(s.len(), 2);
        assert!(s.contains(&Value::list(vec![])));
    }

    #[test]
    fn large_dicts_and_sets_build_in_linear_time() {
        let n = 100_000;
        let started = std::time::Instant::now();
        let d: Dict = (0..n)
            .map(|i| (Value::int(i), Value::tuple(vec![Value::str(i.to_string())])))
            .collect();
        let s: SetItems = (0..n).map(|i| Value::str(format!("m{i}"))).collect();
        let a = Value::Dict(Rc::new(RefCell::new(d.clone())));
        let b = Value::Dict(Rc::new(RefCell::new(d)));
        assert_eq!(a, b);
        assert_eq!(s.len(), n as usize);
        assert!(s.contains(&Value::str("m99999")));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }

    #[test]
    fn cyclic_lists_compare_and_print() {
        let make = || {
            let l = Value::list(vec![Value::int(1)]);
            if let Value::List(rc) = &l {
                rc.borrow_mut().push(l.clone());
            }
            l
        };
        let (a, b) = (make(), make());
        assert_eq!(a, b);
        assert!(!a.is_same(&b));
        assert_eq!(format!("{a:?}"), "[1, [...]]");
    }

    #[test]
    fn identity_follows_handles() {
        let inner = Value::list(vec![]);
        let copy = inner.clone();
        assert!(inner.is_same(&copy));
        assert!(!inner.is_same(&Value::list(vec![])));
        assert!(Value::None.is_same(&Value::None));
        assert!(!Value::int(1).is_same(&Value::int(1)));
    }

    #[test]
    fn debug_renders_repr_like_forms() {
        let v = Value::tuple(vec![
            Value::bytes(b"a\x00".to_vec()),
            Value::str("s"),
            Value::Complex { re: 1.0, im: -2.0 },
            Value::set(vec![]),
        ]);
        assert_eq!(format!("{v:?}"), r#"(b"a\x00", "s", (1.0-2.0j), set())"#);
        assert_eq!(format!("{:?}", Value::tuple(vec![Value::None])), "(None,)");
    }
}
