//! Compressed sub-block header.
//!
//! # Binary Format (9 bytes)
//!
//! ```text
//! ┌─────┬─────┬────────┬──────────────────┬────────────────────┐
//! │ c0  │ c1  │ method │ compressed (u24) │ uncompressed (u24) │
//! └─────┴─────┴────────┴──────────────────┴────────────────────┘
//!   tag         1 byte   little-endian       little-endian
//! ```
//!
//! The two size fields are the only little-endian values in the format.

use rootio_core::{Error, Result};

/// Size of a sub-block header in bytes
pub const BLOCK_HEADER_SIZE: usize = 9;

/// Largest size a 3-byte field can declare
pub const MAX_BLOCK_SIZE: u32 = 0x00FF_FFFF;

/// Header preceding every compressed sub-block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Two-character codec tag
    pub tag: [u8; 2],
    /// Codec method byte
    pub method: u8,
    /// Payload bytes following the header
    pub compressed_len: u32,
    /// Bytes the payload expands to
    pub uncompressed_len: u32,
}

impl BlockHeader {
    /// Parse a header from the start of `bytes`
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_HEADER_SIZE {
            return Err(Error::truncated(0, BLOCK_HEADER_SIZE, bytes.len()));
        }
        Ok(BlockHeader {
            tag: [bytes[0], bytes[1]],
            method: bytes[2],
            compressed_len: read_u24(&bytes[3..6]),
            uncompressed_len: read_u24(&bytes[6..9]),
        })
    }

    /// Serialize to the 9-byte wire form.
    ///
    /// Sizes above [`MAX_BLOCK_SIZE`] are truncated to 24 bits.
    pub fn to_bytes(&self) -> [u8; BLOCK_HEADER_SIZE] {
        let c = self.compressed_len.to_le_bytes();
        let u = self.uncompressed_len.to_le_bytes();
        [
            self.tag[0], self.tag[1], self.method, c[0], c[1], c[2], u[0], u[1], u[2],
        ]
    }

    /// Tag rendered as text for diagnostics
    pub fn tag_str(&self) -> String {
        String::from_utf8_lossy(&self.tag).into_owned()
    }

    /// Header plus payload length
    pub fn block_len(&self) -> usize {
        BLOCK_HEADER_SIZE + self.compressed_len as usize
    }
}

fn read_u24(b: &[u8]) -> u32 {
    u32::from(b[0]) | (u32::from(b[1]) << 8) | (u32::from(b[2]) << 16)
}
