//! Wire tag bytes.

pub const TYPE_NONE: u8 = b'N';
pub const TYPE_FALSE: u8 = b'F';
pub const TYPE_TRUE: u8 = b'T';
pub const TYPE_INT: u8 = b'i';
pub const TYPE_LONG: u8 = b'l';
pub const TYPE_FLOAT: u8 = b'g';
pub const TYPE_COMPLEX: u8 = b'y';
pub const TYPE_BYTES: u8 = b's';
pub const TYPE_UNICODE: u8 = b'u';
pub const TYPE_INTERNED: u8 = b't';
pub const TYPE_SHORT_ASCII: u8 = b'z';
pub const TYPE_SHORT_ASCII_INTERNED: u8 = b'Z';
pub const TYPE_TUPLE: u8 = b'(';
pub const TYPE_SMALL_TUPLE: u8 = b')';
pub const TYPE_LIST: u8 = b'[';
pub const TYPE_DICT: u8 = b'{';
pub const TYPE_SET: u8 = b'<';
pub const TYPE_FROZENSET: u8 = b'>';
pub const TYPE_CODE: u8 = b'c';
pub const TYPE_REF: u8 = b'r';
/// Written in place of a value the encoder could not represent.
pub const TYPE_UNKNOWN: u8 = b'?';

/// Set on a tag byte when the object claims a reference-table slot.
pub const FLAG_REF: u8 = 0x80;

/// Largest payload the compact one-byte length forms can carry.
pub const SHORT_MAX: usize = 0xff;

/// Default nesting limit for encode and decode.
pub const DEFAULT_MAX_DEPTH: usize = 1000;
