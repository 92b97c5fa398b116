//! Zstandard codec (`ZS`).

use super::traits::{BlockCodec, CodecError};

/// Zstandard frame per sub-block
#[derive(Debug, Clone, Copy, Default)]
pub struct ZstdCodec;

impl BlockCodec for ZstdCodec {
    fn tag(&self) -> [u8; 2] {
        *b"ZS"
    }

    fn accepts_method(&self, method: u8) -> bool {
        method == 1
    }

    fn decompress(&self, payload: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, CodecError> {
        zstd::bulk::decompress(payload, uncompressed_len)
            .map_err(|e| CodecError::decode(e.to_string(), self.codec_id(), payload.len()))
    }

    fn codec_id(&self) -> &str {
        "zstd"
    }
}
