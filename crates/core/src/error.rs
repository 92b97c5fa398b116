//! Error types for rootio
//!
//! One error enum is shared by every layer of the reader. The first six
//! variants form the decode taxonomy; the rest cover I/O, configuration and
//! codec-level failures. Object decoding wraps the innermost failure in
//! [`Error::Decode`] so the class name and byte offset survive to the caller.
//!
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use std::io;
use thiserror::Error;

/// Result type alias for rootio operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the reader
#[derive(Debug, Error)]
pub enum Error {
    /// A read needed more bytes than the buffer holds
    #[error("Truncated data at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedData {
        /// Position of the failed read
        offset: u64,
        /// Bytes the read required
        needed: u64,
        /// Bytes left in the buffer
        available: u64,
    },

    /// A compressed sub-block carried a codec tag with no registered codec
    #[error("Unsupported codec {tag:?} (method {method}) at offset {offset}")]
    UnsupportedCodec {
        /// Two-character codec tag as found in the block header
        tag: String,
        /// Method byte following the tag
        method: u8,
        /// Offset of the sub-block header within the compressed payload
        offset: u64,
    },

    /// A member recipe carries a type kind the decoder cannot interpret
    #[error("Unsupported type kind {kind} for member '{member}'")]
    UnsupportedTypeKind {
        /// Raw type code from the schema record
        kind: i32,
        /// Member name
        member: String,
    },

    /// No schema is registered for the class/version pair
    #[error("Unknown schema for class '{class_name}' version {version}")]
    UnknownSchema {
        /// Class name
        class_name: String,
        /// Version requested by the data
        version: i32,
    },

    /// Decoding consumed more bytes than the envelope declared
    #[error("Checksum mismatch: decode reached offset {actual}, past declared end {expected_end}")]
    ChecksumMismatch {
        /// End offset declared by the envelope byte-count
        expected_end: u64,
        /// Offset actually reached
        actual: u64,
    },

    /// Named record or cycle does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A codec rejected its payload
    #[error("Corrupt compressed block (codec={codec}): {detail}")]
    CorruptBlock {
        /// Codec name
        codec: String,
        /// Human-readable description
        detail: String,
    },

    /// Structurally impossible data (bad magic, negative counts, limits exceeded)
    #[error("Malformed data: {0}")]
    Malformed(String),

    /// Reader configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error from a byte source
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Failure inside an object decode, annotated with where it happened
    #[error("{source} (while decoding '{class_name}' at offset {offset})")]
    Decode {
        /// Class being decoded when the innermost error occurred
        class_name: String,
        /// Buffer offset of that object's envelope
        offset: u64,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },
}

/// Taxonomy of an error with any decode context stripped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::TruncatedData`]
    TruncatedData,
    /// See [`Error::UnsupportedCodec`]
    UnsupportedCodec,
    /// See [`Error::UnsupportedTypeKind`]
    UnsupportedTypeKind,
    /// See [`Error::UnknownSchema`]
    UnknownSchema,
    /// See [`Error::ChecksumMismatch`]
    ChecksumMismatch,
    /// See [`Error::NotFound`]
    NotFound,
    /// See [`Error::CorruptBlock`]
    CorruptBlock,
    /// See [`Error::Malformed`]
    Malformed,
    /// See [`Error::InvalidConfig`]
    InvalidConfig,
    /// See [`Error::Io`]
    Io,
}

impl Error {
    /// Create a truncation error for a read of `needed` bytes at `offset`
    pub fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        Error::TruncatedData {
            offset: offset as u64,
            needed: needed as u64,
            available: available as u64,
        }
    }

    /// Create a malformed-data error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::Malformed(msg.into())
    }

    /// Create a not-found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Error::NotFound(what.into())
    }

    /// Create an unknown-schema error
    pub fn unknown_schema(class_name: impl Into<String>, version: i32) -> Self {
        Error::UnknownSchema {
            class_name: class_name.into(),
            version,
        }
    }

    /// Create an unsupported-type-kind error
    pub fn unsupported_kind(kind: i32, member: impl Into<String>) -> Self {
        Error::UnsupportedTypeKind {
            kind,
            member: member.into(),
        }
    }

    /// Attach the class name and envelope offset of the object being decoded.
    ///
    /// Only the innermost object is recorded; an error that already carries
    /// decode context is returned unchanged.
    pub fn in_class(self, class_name: &str, offset: usize) -> Self {
        match self {
            Error::Decode { .. } => self,
            other => Error::Decode {
                class_name: class_name.to_string(),
                offset: offset as u64,
                source: Box::new(other),
            },
        }
    }

    /// The taxonomy of this error, looking through decode context
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::TruncatedData { .. } => ErrorKind::TruncatedData,
            Error::UnsupportedCodec { .. } => ErrorKind::UnsupportedCodec,
            Error::UnsupportedTypeKind { .. } => ErrorKind::UnsupportedTypeKind,
            Error::UnknownSchema { .. } => ErrorKind::UnknownSchema,
            Error::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::CorruptBlock { .. } => ErrorKind::CorruptBlock,
            Error::Malformed(_) => ErrorKind::Malformed,
            Error::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Error::Io(_) => ErrorKind::Io,
            Error::Decode { source, .. } => source.kind(),
        }
    }

    /// Innermost error with decode context stripped
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Decode { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Class name and offset recorded by [`Error::in_class`], if any
    pub fn decode_context(&self) -> Option<(&str, u64)> {
        match self {
            Error::Decode {
                class_name, offset, ..
            } => Some((class_name.as_str(), *offset)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_truncated() {
        let err = Error::truncated(12, 4, 2);
        let msg = err.to_string();
        assert!(msg.contains("Truncated data"));
        assert!(msg.contains("12"));
        assert!(msg.contains("needed 4"));
    }

    #[test]
    fn test_error_display_unsupported_codec() {
        let err = Error::UnsupportedCodec {
            tag: "XZ".to_string(),
            method: 0,
            offset: 0,
        };
        assert!(err.to_string().contains("\"XZ\""));
    }

    #[test]
    fn test_error_display_checksum_mismatch() {
        let err = Error::ChecksumMismatch {
            expected_end: 40,
            actual: 44,
        };
        let msg = err.to_string();
        assert!(msg.contains("40"));
        assert!(msg.contains("44"));
    }

    #[test]
    fn test_in_class_records_innermost_only() {
        let err = Error::truncated(8, 4, 0)
            .in_class("TAxis", 100)
            .in_class("TH1F", 0);

        assert_eq!(err.decode_context(), Some(("TAxis", 100)));
        assert_eq!(err.kind(), ErrorKind::TruncatedData);
        assert!(matches!(err.root_cause(), Error::TruncatedData { .. }));
        assert!(err.to_string().contains("TAxis"));
    }

    #[test]
    fn test_kind_without_context() {
        assert_eq!(Error::not_found("hpx").kind(), ErrorKind::NotFound);
        assert_eq!(
            Error::unknown_schema("TFoo", 3).kind(),
            ErrorKind::UnknownSchema
        );
        assert_eq!(
            Error::unsupported_kind(100, "fSkip").kind(),
            ErrorKind::UnsupportedTypeKind
        );
        assert_eq!(Error::malformed("bad").kind(), ErrorKind::Malformed);
        assert!(Error::not_found("hpx").decode_context().is_none());
    }

    #[test]
    fn test_io_error_conversion() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "file not found").into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("I/O error"));
    }
}
