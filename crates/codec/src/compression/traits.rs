//! Block codec trait definitions.

/// Block codec trait.
///
/// Every compressed sub-block names its codec with a two-character tag and a
/// method byte. The [`BlockDecompressor`](super::BlockDecompressor) routes
/// each sub-block to the codec registered for its tag.
///
/// # Thread Safety
///
/// Codecs must be `Send + Sync` so one decompressor can be shared by every
/// reader of a file.
pub trait BlockCodec: Send + Sync {
    /// Two-character tag this codec answers to (e.g. `*b"ZL"`)
    fn tag(&self) -> [u8; 2];

    /// Whether the method byte after the tag is one this codec understands
    fn accepts_method(&self, method: u8) -> bool;

    /// Decompress one sub-block payload.
    ///
    /// `payload` is exactly the compressed bytes declared by the sub-block
    /// header; `uncompressed_len` is the size the header promises.
    fn decompress(&self, payload: &[u8], uncompressed_len: usize) -> Result<Vec<u8>, CodecError>;

    /// Unique codec identifier, used in diagnostics
    fn codec_id(&self) -> &str;
}

/// Codec errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The codec could not decode the payload.
    ///
    /// Carries the codec identity and payload length so callers can tell a
    /// wrong-codec error from data corruption.
    #[error("Decode error (codec={codec_id}, data_len={data_len}): {detail}")]
    DecodeError {
        /// Human-readable error description
        detail: String,
        /// Codec ID that attempted the decode
        codec_id: String,
        /// Length of the payload that failed to decode
        data_len: usize,
    },

    /// An embedded payload checksum did not match.
    #[error("Block checksum mismatch (codec={codec_id}): stored {stored:016x}, computed {computed:016x}")]
    ChecksumMismatch {
        /// Codec ID that checked the payload
        codec_id: String,
        /// Checksum stored in the block
        stored: u64,
        /// Checksum computed over the payload
        computed: u64,
    },
}

impl CodecError {
    /// Create a decode error with full diagnostic context.
    pub fn decode(detail: impl Into<String>, codec_id: impl Into<String>, data_len: usize) -> Self {
        CodecError::DecodeError {
            detail: detail.into(),
            codec_id: codec_id.into(),
            data_len,
        }
    }

    /// Codec that raised the error
    pub fn codec_id(&self) -> &str {
        match self {
            CodecError::DecodeError { codec_id, .. } => codec_id,
            CodecError::ChecksumMismatch { codec_id, .. } => codec_id,
        }
    }
}

impl From<CodecError> for rootio_core::Error {
    fn from(e: CodecError) -> Self {
        rootio_core::Error::CorruptBlock {
            codec: e.codec_id().to_string(),
            detail: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootio_core::ErrorKind;

    struct Passthrough;

    impl BlockCodec for Passthrough {
        fn tag(&self) -> [u8; 2] {
            *b"PT"
        }
        fn accepts_method(&self, _method: u8) -> bool {
            true
        }
        fn decompress(&self, payload: &[u8], _len: usize) -> Result<Vec<u8>, CodecError> {
            Ok(payload.to_vec())
        }
        fn codec_id(&self) -> &str {
            "passthrough"
        }
    }

    // Test that trait is object-safe
    fn _accepts_box_dyn_codec(_codec: Box<dyn BlockCodec>) {}

    #[test]
    fn test_codec_trait_object_safe() {
        let codec: Box<dyn BlockCodec> = Box::new(Passthrough);
        assert_eq!(codec.decompress(b"abc", 3).unwrap(), b"abc");
        assert_eq!(codec.tag(), *b"PT");
        assert_eq!(codec.codec_id(), "passthrough");
    }

    #[test]
    fn test_codec_error_display() {
        let err = CodecError::decode("bad stream", "zlib", 42);
        let msg = err.to_string();
        assert!(msg.contains("bad stream"));
        assert!(msg.contains("zlib"));
        assert!(msg.contains("42"));

        let err = CodecError::ChecksumMismatch {
            codec_id: "lz4".to_string(),
            stored: 1,
            computed: 2,
        };
        assert!(err.to_string().contains("lz4"));
    }

    #[test]
    fn test_codec_error_converts_to_corrupt_block() {
        let err: rootio_core::Error = CodecError::decode("x", "zstd", 1).into();
        assert_eq!(err.kind(), ErrorKind::CorruptBlock);
        assert!(err.to_string().contains("zstd"));
    }
}
