//! Versioned binary serialization for dynamically-typed value graphs.
//!
//! A [`Value`] tree (or graph: shared and cyclic containers are supported
//! from format version 3) is written as a stream of tag-prefixed records and
//! read back into a structurally equal graph with the same sharing.
//!
//! ```
//! use marshal_codec::{dumps, loads, LazyMode, Value};
//!
//! let value = Value::list(vec![Value::int(1), Value::str("two"), Value::None]);
//! let bytes = dumps(&value, 4).unwrap();
//! assert_eq!(loads(&bytes, LazyMode::Default).unwrap(), value);
//! ```

mod buffer;
mod code;
pub mod constants;
mod convert;
mod decoder;
mod encoder;
mod error;
mod refs;
mod value;
mod version;

use std::io::{Read, Write};

pub use buffer::ByteBuffer;
pub use code::{CodeObject, CodeRef};
pub use decoder::{Decoder, DecoderOptions, LazyMode};
pub use encoder::{Encoder, EncoderOptions, UnsupportedPolicy};
pub use error::{ErrorKind, MarshalError, Result};
pub use value::{Dict, SetItems, Shared, Str, Value};
pub use version::{IntWidth, VersionPolicy, DEFAULT_VERSION, MAX_VERSION};

/// Writes `value` to `sink` in format `version`.
///
/// Not atomic: if encoding fails partway, the bytes produced up to the
/// failure are still written before the error is returned.
pub fn dump<W: Write + ?Sized>(value: &Value, sink: &mut W, version: i32) -> Result<()> {
    let mut encoder = Encoder::with_version(version)?;
    let (bytes, result) = encoder.encode_partial(value);
    sink.write_all(&bytes)?;
    result
}

/// Reads `source` to its end and decodes the first value in it.
pub fn load<R: Read + ?Sized>(source: &mut R) -> Result<Value> {
    let mut input = Vec::new();
    source.read_to_end(&mut input)?;
    Decoder::new().decode(&input)
}

/// Encodes `value` in format `version`.
pub fn dumps(value: &Value, version: i32) -> Result<Vec<u8>> {
    Encoder::with_version(version)?.encode(value)
}

/// Decodes the first value in `input`. Trailing bytes are ignored.
pub fn loads<B: ByteBuffer + ?Sized>(input: &B, lazy: LazyMode) -> Result<Value> {
    let bytes = input.contiguous().ok_or(MarshalError::NotContiguous)?;
    Decoder::with_options(DecoderOptions {
        lazy,
        ..DecoderOptions::default()
    })?
    .decode(bytes)
}

/// Same as [`dumps`].
pub fn dumps_to_bytes(value: &Value, version: i32) -> Result<Vec<u8>> {
    dumps(value, version)
}

/// Same as [`loads`].
pub fn load_from_bytes<B: ByteBuffer + ?Sized>(input: &B, lazy: LazyMode) -> Result<Value> {
    loads(input, lazy)
}
