//! Reference tables for shared and cyclic objects.
//!
//! Both sides number objects in pre-order: an object gets its index when it
//! is first visited, before any of its children. The encoder maps identity
//! to index; the decoder keeps an indexable list of slots.

use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::rc::Rc;

use crate::code::CodeRef;
use crate::value::Value;

/// Identity of a reference-eligible object on the encode side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RefKey {
    /// Container or code handle, by address.
    Handle(usize),
    /// Interned strings are one object per distinct text.
    Interned(Rc<str>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visit {
    /// Already written; emit a reference to this index.
    Seen(u32),
    /// First visit; the object now owns this index.
    Assigned(u32),
}

#[derive(Debug, Default)]
pub(crate) struct EncodeRefs {
    indices: HashMap<RefKey, u32>,
    next: u32,
}

impl EncodeRefs {
    pub fn visit(&mut self, key: RefKey) -> Visit {
        match self.indices.entry(key) {
            Entry::Occupied(entry) => Visit::Seen(*entry.get()),
            Entry::Vacant(entry) => {
                let index = self.next;
                self.next += 1;
                entry.insert(index);
                tracing::trace!(target: "marshal", index, "assigned reference");
                Visit::Assigned(index)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.next as usize
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Slot {
    /// Claimed by an object that is still being built.
    Reserved,
    Ready(Value),
    /// Belongs to the subtree of a code object that has not been decoded.
    Deferred(CodeRef),
}

/// Decode-side table. The handle is shared with deferred code objects so
/// they can fill their slots when realized.
#[derive(Debug, Clone, Default)]
pub(crate) struct DecodeRefs(Rc<RefCell<Vec<Slot>>>);

impl DecodeRefs {
    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    /// Appends a reserved slot and returns its index.
    pub fn push_reserved(&self) -> u32 {
        let mut slots = self.0.borrow_mut();
        slots.push(Slot::Reserved);
        (slots.len() - 1) as u32
    }

    pub fn set(&self, index: u32, slot: Slot) {
        if let Some(entry) = self.0.borrow_mut().get_mut(index as usize) {
            *entry = slot;
        }
    }

    pub fn get(&self, index: u32) -> Option<Slot> {
        self.0.borrow().get(index as usize).cloned()
    }
}
