//! Byte buffers for the marshal wire format.
//!
//! [`Writer`] is an auto-growing output buffer, [`Reader`] a cursor over a
//! borrowed input slice. All multi-byte primitives are little-endian.

mod reader;
mod writer;

pub use reader::Reader;
pub use writer::Writer;

use thiserror::Error;

/// Errors produced by the bounds-checked [`Reader`] methods.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BufferError {
    #[error("end of buffer: needed {needed} bytes, {available} available")]
    EndOfBuffer { needed: usize, available: usize },
    #[error("invalid UTF-8")]
    InvalidUtf8,
}
