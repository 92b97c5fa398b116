//! Chained sub-block decompression
//!
//! A compressed payload is a run of sub-blocks laid back to back, each with
//! its own [`BlockHeader`]. The decompressor walks them in order, routes
//! each to the codec registered for its tag and appends the output until
//! the declared total is reached.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let decompressor = BlockDecompressor::default();
//! let flat = decompressor.decompress(&compressed, key.uncompressed_len as usize)?;
//!
//! // Plug in a codec the reader does not ship
//! let mut custom = BlockDecompressor::default();
//! custom.register(Arc::new(MyXzCodec));
//! ```

use super::deflate::{OldDeflateCodec, ZlibCodec};
use super::header::{BlockHeader, BLOCK_HEADER_SIZE};
use super::lz4::Lz4Codec;
use super::traits::BlockCodec;
use super::zstandard::ZstdCodec;
use rootio_core::{Error, Result};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// Registry of block codecs keyed by their two-character tag
pub struct BlockDecompressor {
    codecs: FxHashMap<[u8; 2], Arc<dyn BlockCodec>>,
}

impl BlockDecompressor {
    /// Create a decompressor with no codecs registered
    pub fn empty() -> Self {
        BlockDecompressor {
            codecs: FxHashMap::default(),
        }
    }

    /// Register a codec, replacing any codec with the same tag
    pub fn register(&mut self, codec: Arc<dyn BlockCodec>) {
        self.codecs.insert(codec.tag(), codec);
    }

    /// Get the codec for a tag
    pub fn get(&self, tag: [u8; 2]) -> Option<Arc<dyn BlockCodec>> {
        self.codecs.get(&tag).cloned()
    }

    /// Check if a tag has a codec
    pub fn is_registered(&self, tag: [u8; 2]) -> bool {
        self.codecs.contains_key(&tag)
    }

    /// All registered tags, sorted
    pub fn tags(&self) -> Vec<[u8; 2]> {
        let mut tags: Vec<[u8; 2]> = self.codecs.keys().copied().collect();
        tags.sort();
        tags
    }

    /// Decompress a chain of sub-blocks into exactly `total_len` bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::TruncatedData`] if the input ends before `total_len` bytes
    ///   have been produced
    /// - [`Error::UnsupportedCodec`] for a tag with no codec, or a method the
    ///   codec does not accept
    /// - [`Error::CorruptBlock`] if a codec fails or produces a size other
    ///   than its header declared
    /// - [`Error::Malformed`] if the sub-blocks declare more than `total_len`
    pub fn decompress(&self, input: &[u8], total_len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(total_len);
        let mut pos = 0usize;

        while out.len() < total_len {
            if input.len() - pos < BLOCK_HEADER_SIZE {
                return Err(Error::truncated(pos, BLOCK_HEADER_SIZE, input.len() - pos));
            }
            let header = BlockHeader::from_bytes(&input[pos..])?;
            let payload_start = pos + BLOCK_HEADER_SIZE;
            let payload_len = header.compressed_len as usize;
            if input.len() - payload_start < payload_len {
                return Err(Error::truncated(
                    payload_start,
                    payload_len,
                    input.len() - payload_start,
                ));
            }

            let codec = match self.codecs.get(&header.tag) {
                Some(codec) if codec.accepts_method(header.method) => codec,
                _ => {
                    return Err(Error::UnsupportedCodec {
                        tag: header.tag_str(),
                        method: header.method,
                        offset: pos as u64,
                    })
                }
            };

            let expected = header.uncompressed_len as usize;
            if out.len() + expected > total_len {
                return Err(Error::malformed(format!(
                    "sub-block at offset {} declares {} bytes, only {} of {} left",
                    pos,
                    expected,
                    total_len - out.len(),
                    total_len
                )));
            }

            let payload = &input[payload_start..payload_start + payload_len];
            let block = codec.decompress(payload, expected)?;
            if block.len() != expected {
                return Err(Error::CorruptBlock {
                    codec: codec.codec_id().to_string(),
                    detail: format!(
                        "sub-block at offset {} produced {} bytes, header declared {}",
                        pos,
                        block.len(),
                        expected
                    ),
                });
            }

            trace!(
                codec = codec.codec_id(),
                offset = pos,
                compressed = payload_len,
                uncompressed = expected,
                "Decompressed sub-block"
            );

            out.extend_from_slice(&block);
            pos = payload_start + payload_len;

            if expected == 0 && payload_len == 0 {
                return Err(Error::malformed(format!(
                    "empty sub-block at offset {} cannot make progress",
                    pos - BLOCK_HEADER_SIZE
                )));
            }
        }

        Ok(out)
    }
}

impl Default for BlockDecompressor {
    /// Decompressor with the built-in `ZL`, `CS`, `ZS` and `L4` codecs
    fn default() -> Self {
        let mut d = BlockDecompressor::empty();
        d.register(Arc::new(ZlibCodec));
        d.register(Arc::new(OldDeflateCodec));
        d.register(Arc::new(ZstdCodec));
        d.register(Arc::new(Lz4Codec));
        d
    }
}

impl fmt::Debug for BlockDecompressor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<String> = self
            .tags()
            .iter()
            .map(|t| String::from_utf8_lossy(t).into_owned())
            .collect();
        f.debug_struct("BlockDecompressor")
            .field("codecs", &tags)
            .finish()
    }
}
