//! Deflate-family codecs.
//!
//! `ZL` blocks wrap a zlib stream (2-byte header, adler32 trailer). `CS`
//! blocks come from the oldest writers and hold a bare deflate stream.

use super::traits::{BlockCodec, CodecError};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::io::Read;

/// Method byte written by every deflate-based writer
pub const DEFLATE_METHOD: u8 = 8;

/// zlib-wrapped deflate (`ZL`)
#[derive(Debug, Clone, Copy, Default)]
pub struct ZlibCodec;

impl BlockCodec for ZlibCodec {
    fn tag(&self) -> [u8; 2] {
        *b"ZL"
    }

    fn accepts_method(&self, method: u8) -> bool {
        method == DEFLATE_METHOD
    }

    fn decompress(&self, payload: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, CodecError> {
        inflate(ZlibDecoder::new(payload), payload.len(), uncompressed_len, self.codec_id())
    }

    fn codec_id(&self) -> &str {
        "zlib"
    }
}

/// Raw deflate from legacy writers (`CS`)
#[derive(Debug, Clone, Copy, Default)]
pub struct OldDeflateCodec;

impl BlockCodec for OldDeflateCodec {
    fn tag(&self) -> [u8; 2] {
        *b"CS"
    }

    fn accepts_method(&self, method: u8) -> bool {
        method == DEFLATE_METHOD
    }

    fn decompress(&self, payload: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, CodecError> {
        inflate(DeflateDecoder::new(payload), payload.len(), uncompressed_len, self.codec_id())
    }

    fn codec_id(&self) -> &str {
        "deflate"
    }
}

fn inflate<R: Read>(
    mut reader: R,
    data_len: usize,
    uncompressed_len: usize,
    codec_id: &str,
) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(uncompressed_len);
    // One byte past the declared size is enough to detect an overrun
    reader
        .take(uncompressed_len as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::decode(e.to_string(), codec_id, data_len))?;
    if out.len() > uncompressed_len {
        return Err(CodecError::decode(
            format!("stream inflates past the declared {uncompressed_len} bytes"),
            codec_id,
            data_len,
        ));
    }
    Ok(out)
}
