//! Codec error type.

use marshal_buffers::BufferError;
use thiserror::Error;

/// The caller-facing classification of a [`MarshalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Encode-time: the value (or something nested in it) has no wire form.
    UnsupportedType,
    /// Structurally invalid stream, or a rejected version number.
    Value,
    /// The stream ended before a complete value was read.
    Eof,
    /// The caller's input is not a contiguous byte buffer.
    Type,
    /// Nesting exceeded the configured depth limit.
    Recursion,
    /// The underlying sink or source failed.
    Io,
}

#[derive(Debug, Error)]
pub enum MarshalError {
    #[error("unmarshallable object: {kind} is not supported by format version {version}")]
    UnsupportedType { kind: &'static str, version: u32 },

    #[error("unsupported format version {version} (supported: 0..={max})")]
    UnsupportedVersion { version: i32, max: u32 },

    #[error("marshal data too short at offset {offset}: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("bad marshal data (unknown type code 0x{tag:02x} at offset {offset})")]
    UnknownTag { tag: u8, offset: usize },

    #[error("bad marshal data (invalid reference {index} at offset {offset}, {populated} populated)")]
    BadReference {
        index: u32,
        offset: usize,
        populated: usize,
    },

    #[error("bad marshal data (reference {index} at offset {offset} points to an object still being built)")]
    ReservedReference { index: u32, offset: usize },

    #[error("bad marshal data (size {declared} out of range at offset {offset})")]
    BadLength { declared: i64, offset: usize },

    #[error("bad marshal data (unnormalized long data at offset {offset})")]
    UnnormalizedLong { offset: usize },

    #[error("bad marshal data (invalid UTF-8 string at offset {offset})")]
    InvalidUtf8 { offset: usize },

    #[error("bad marshal data (unrepresentable object marker at offset {offset})")]
    Unrepresentable { offset: usize },

    #[error("maximum nesting depth {limit} exceeded")]
    RecursionLimit { limit: usize },

    #[error("{kind} has no JSON form")]
    NotJson { kind: &'static str },

    #[error("input is not a contiguous byte buffer")]
    NotContiguous,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MarshalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MarshalError::UnsupportedType { .. } | MarshalError::NotJson { .. } => {
                ErrorKind::UnsupportedType
            }
            MarshalError::UnexpectedEof { .. } => ErrorKind::Eof,
            MarshalError::NotContiguous => ErrorKind::Type,
            MarshalError::RecursionLimit { .. } => ErrorKind::Recursion,
            MarshalError::Io(_) => ErrorKind::Io,
            MarshalError::UnsupportedVersion { .. }
            | MarshalError::UnknownTag { .. }
            | MarshalError::BadReference { .. }
            | MarshalError::ReservedReference { .. }
            | MarshalError::BadLength { .. }
            | MarshalError::UnnormalizedLong { .. }
            | MarshalError::InvalidUtf8 { .. }
            | MarshalError::Unrepresentable { .. } => ErrorKind::Value,
        }
    }

    /// Converts a reader failure at `offset` into a codec error.
    pub(crate) fn from_buffer(err: BufferError, offset: usize) -> Self {
        match err {
            BufferError::EndOfBuffer { needed, available } => MarshalError::UnexpectedEof {
                offset,
                needed,
                available,
            },
            BufferError::InvalidUtf8 => MarshalError::InvalidUtf8 { offset },
        }
    }
}

pub type Result<T> = std::result::Result<T, MarshalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let eof = MarshalError::from_buffer(
            BufferError::EndOfBuffer {
                needed: 4,
                available: 1,
            },
            7,
        );
        assert_eq!(eof.kind(), ErrorKind::Eof);
        assert_eq!(
            eof.to_string(),
            "marshal data too short at offset 7: needed 4 bytes, 1 available"
        );
        assert_eq!(
            MarshalError::from_buffer(BufferError::InvalidUtf8, 3).kind(),
            ErrorKind::Value
        );
        assert_eq!(
            MarshalError::UnknownTag { tag: 0xff, offset: 0 }.kind(),
            ErrorKind::Value
        );
        assert_eq!(MarshalError::NotContiguous.kind(), ErrorKind::Type);
        assert_eq!(
            MarshalError::UnsupportedType {
                kind: "set",
                version: 1
            }
            .kind(),
            ErrorKind::UnsupportedType
        );
    }

    #[test]
    fn unknown_tag_message_names_byte_and_offset() {
        let err = MarshalError::UnknownTag { tag: 0xff, offset: 12 };
        assert_eq!(
            err.to_string(),
            "bad marshal data (unknown type code 0xff at offset 12)"
        );
    }
}
