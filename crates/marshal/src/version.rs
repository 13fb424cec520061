//! Per-version wire-format rules.
//!
//! | version | integers            | references | interned tag | sets | compact forms |
//! |---------|---------------------|------------|--------------|------|---------------|
//! | 0       | variable (`l`) only | no         | no           | no   | no            |
//! | 1       | `i` if it fits i32  | no         | `t`          | no   | no            |
//! | 2       | as 1                | no         | `t`          | yes  | no            |
//! | 3       | as 1                | yes        | `t`          | yes  | no            |
//! | 4       | as 1                | yes        | `t`          | yes  | `z` `Z` `)`   |

use crate::constants::*;
use crate::error::{MarshalError, Result};

/// Highest format version this implementation reads and writes.
pub const MAX_VERSION: u32 = 4;

/// Version used when the caller does not pick one.
pub const DEFAULT_VERSION: i32 = MAX_VERSION as i32;

/// How integers that fit in 32 bits are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntWidth {
    /// Every integer uses the variable-length digit form.
    Variable,
    /// Integers in `i32` range use the fixed 4-byte form, the rest the
    /// variable-length form.
    Fixed32,
}

/// Immutable rule set bound to one format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionPolicy {
    pub version: u32,
    pub int_width: IntWidth,
    /// Shared and cyclic objects are written once and referenced thereafter.
    pub references: bool,
    /// Interned strings keep their own tag.
    pub interned_tag: bool,
    pub sets: bool,
    /// Short ASCII strings and small tuples use one-byte length prefixes.
    pub compact: bool,
}

impl VersionPolicy {
    /// Resolves the rule set for `version`.
    ///
    /// Negative versions and versions above [`MAX_VERSION`] are rejected.
    pub fn resolve(version: i32) -> Result<Self> {
        if version < 0 || version as u32 > MAX_VERSION {
            return Err(MarshalError::UnsupportedVersion {
                version,
                max: MAX_VERSION,
            });
        }
        let v = version as u32;
        Ok(Self {
            version: v,
            int_width: if v >= 1 {
                IntWidth::Fixed32
            } else {
                IntWidth::Variable
            },
            references: v >= 3,
            interned_tag: v >= 1,
            sets: v >= 2,
            compact: v >= 4,
        })
    }

    pub fn latest() -> Self {
        Self {
            version: MAX_VERSION,
            int_width: IntWidth::Fixed32,
            references: true,
            interned_tag: true,
            sets: true,
            compact: true,
        }
    }

    /// Whether `tag` (with the reference flag stripped) belongs to this
    /// version's tag set.
    pub fn recognizes(&self, tag: u8) -> bool {
        match tag {
            TYPE_NONE | TYPE_FALSE | TYPE_TRUE | TYPE_LONG | TYPE_FLOAT | TYPE_COMPLEX
            | TYPE_BYTES | TYPE_UNICODE | TYPE_TUPLE | TYPE_LIST | TYPE_DICT | TYPE_CODE
            | TYPE_UNKNOWN => true,
            TYPE_INT => self.int_width == IntWidth::Fixed32,
            TYPE_INTERNED => self.interned_tag,
            TYPE_SET | TYPE_FROZENSET => self.sets,
            TYPE_REF => self.references,
            TYPE_SHORT_ASCII | TYPE_SHORT_ASCII_INTERNED | TYPE_SMALL_TUPLE => self.compact,
            _ => false,
        }
    }
}

impl Default for VersionPolicy {
    fn default() -> Self {
        Self::latest()
    }
}
