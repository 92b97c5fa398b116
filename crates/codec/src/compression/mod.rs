//! Compressed payload handling
//!
//! - `traits`: the [`BlockCodec`] seam and [`CodecError`]
//! - `header`: the 9-byte sub-block header
//! - `deflate`, `zstandard`, `lz4`: built-in codecs
//! - `decompressor`: [`BlockDecompressor`], which walks sub-block chains

pub mod decompressor;
pub mod deflate;
pub mod header;
pub mod lz4;
pub mod traits;
pub mod zstandard;

pub use decompressor::BlockDecompressor;
pub use deflate::{OldDeflateCodec, ZlibCodec};
pub use header::{BlockHeader, BLOCK_HEADER_SIZE, MAX_BLOCK_SIZE};
pub use lz4::Lz4Codec;
pub use traits::{BlockCodec, CodecError};
pub use zstandard::ZstdCodec;
