//! Reader configuration.
//!
//! Limits that protect the reader from hostile or corrupt files. They
//! bound what the reader allocates and how deep it recurses.

use rootio_streamer::{DecodeOptions, DEFAULT_MAX_COLLECTION_LEN, DEFAULT_MAX_DEPTH};

/// Reader configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    /// Largest uncompressed payload a key may declare (default: 1GiB).
    pub max_object_size: u64,

    /// Largest element count read from data (default: 50,000,000).
    pub max_collection_len: usize,

    /// Object nesting bound (default: 512).
    pub max_depth: usize,

    /// Decode with the newest older layout when a version is missing
    /// (default: true).
    pub allow_version_fallback: bool,

    /// Subdirectory nesting bound (default: 64).
    pub max_directory_depth: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        ReaderConfig {
            max_object_size: 1024 * 1024 * 1024, // 1GiB
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
            max_depth: DEFAULT_MAX_DEPTH,
            allow_version_fallback: true,
            max_directory_depth: 64,
        }
    }
}

impl ReaderConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact schema versions only.
    pub fn strict() -> Self {
        ReaderConfig {
            allow_version_fallback: false,
            ..Self::default()
        }
    }

    /// Small limits so tests hit them quickly.
    pub fn for_testing() -> Self {
        ReaderConfig {
            max_object_size: 1024 * 1024, // 1MiB
            max_collection_len: 10_000,
            max_depth: 64,
            allow_version_fallback: true,
            max_directory_depth: 8,
        }
    }

    /// Set the payload size bound (builder pattern).
    pub fn with_max_object_size(mut self, bytes: u64) -> Self {
        self.max_object_size = bytes;
        self
    }

    /// Set the element count bound (builder pattern).
    pub fn with_max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }

    /// Set the nesting bound (builder pattern).
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Enable or disable the older-layout fallback (builder pattern).
    pub fn with_version_fallback(mut self, allow: bool) -> Self {
        self.allow_version_fallback = allow;
        self
    }

    /// Set the subdirectory nesting bound (builder pattern).
    pub fn with_max_directory_depth(mut self, depth: usize) -> Self {
        self.max_directory_depth = depth;
        self
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_object_size == 0 {
            return Err(ConfigError::ZeroObjectSize);
        }
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroDepth);
        }
        if self.max_collection_len == 0 {
            return Err(ConfigError::ZeroCollectionLen);
        }
        Ok(())
    }

    /// Options for the object decoder
    pub fn decode_options(&self) -> DecodeOptions {
        DecodeOptions::default()
            .with_max_depth(self.max_depth)
            .with_max_collection_len(self.max_collection_len)
            .with_version_fallback(self.allow_version_fallback)
    }
}

/// Reader configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No payload could ever be read.
    #[error("Maximum object size must be greater than zero")]
    ZeroObjectSize,

    /// No object could ever be decoded.
    #[error("Maximum depth must be greater than zero")]
    ZeroDepth,

    /// No collection could ever be decoded.
    #[error("Maximum collection length must be greater than zero")]
    ZeroCollectionLen,
}

impl From<ConfigError> for rootio_core::Error {
    fn from(e: ConfigError) -> Self {
        rootio_core::Error::InvalidConfig(e.to_string())
    }
}
