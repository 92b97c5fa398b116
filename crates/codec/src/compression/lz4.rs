//! LZ4 codec (`L4`).
//!
//! ```text
//! ┌──────────────────────┬─────────────────────┐
//! │ xxh64 (u64, BE)      │ LZ4 block           │
//! └──────────────────────┴─────────────────────┘
//!   checksum of the block  counted in the header's compressed size
//! ```

use super::traits::{BlockCodec, CodecError};
use byteorder::{BigEndian, ByteOrder};
use xxhash_rust::xxh64::xxh64;

/// Size of the checksum prefix
pub const LZ4_CHECKSUM_SIZE: usize = 8;

/// LZ4 block with an xxh64 checksum prefix
#[derive(Debug, Clone, Copy, Default)]
pub struct Lz4Codec;

impl BlockCodec for Lz4Codec {
    fn tag(&self) -> [u8; 2] {
        *b"L4"
    }

    fn accepts_method(&self, _method: u8) -> bool {
        true
    }

    fn decompress(&self, payload: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, CodecError> {
        if payload.len() < LZ4_CHECKSUM_SIZE {
            return Err(CodecError::decode(
                "payload shorter than checksum prefix",
                self.codec_id(),
                payload.len(),
            ));
        }
        let (prefix, block) = payload.split_at(LZ4_CHECKSUM_SIZE);
        let stored = BigEndian::read_u64(prefix);
        let computed = xxh64(block, 0);
        if stored != computed {
            return Err(CodecError::ChecksumMismatch {
                codec_id: self.codec_id().to_string(),
                stored,
                computed,
            });
        }
        lz4_flex::block::decompress(block, uncompressed_len)
            .map_err(|e| CodecError::decode(e.to_string(), self.codec_id(), payload.len()))
    }

    fn codec_id(&self) -> &str {
        "lz4"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(data: &[u8]) -> Vec<u8> {
        let block = lz4_flex::block::compress(data);
        let mut out = xxh64(&block, 0).to_be_bytes().to_vec();
        out.extend_from_slice(&block);
        out
    }

    #[test]
    fn test_lz4_decompress() {
        let data: Vec<u8> = (0..1000u32).map(|i| (i % 13) as u8).collect();
        let out = Lz4Codec.decompress(&encode(&data), data.len()).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_lz4_checksum_mismatch() {
        let data = vec![42u8; 500];
        let mut payload = encode(&data);
        payload[0] ^= 0xFF;
        let err = Lz4Codec.decompress(&payload, data.len()).unwrap_err();
        assert!(matches!(err, CodecError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_lz4_short_payload() {
        assert!(Lz4Codec.decompress(&[1, 2, 3], 10).is_err());
    }
}
