//! Byte-level layer for rootio
//!
//! This crate reads the raw bytes of a record before any schema is applied:
//! - [`ByteCursor`]: positioned big-endian reads over a borrowed buffer
//! - [`BlockDecompressor`]: chained compressed sub-blocks into one buffer
//! - `framing`: envelope and reference-tag constants
//! - `testing`: a fixture encoder used by tests across the workspace

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compression; // Block codecs and the sub-block walker
pub mod cursor; // Positioned reader
pub mod framing; // Envelope and tag constants
pub mod testing; // Fixture encoder

pub use compression::{
    BlockCodec, BlockDecompressor, BlockHeader, CodecError, Lz4Codec, OldDeflateCodec, ZlibCodec,
    ZstdCodec, BLOCK_HEADER_SIZE,
};
pub use cursor::ByteCursor;
