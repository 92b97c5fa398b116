//! Decode limits.

use rootio_core::{Error, Result};

/// Default nesting bound for recursive decoding
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Default bound on any element count read from data
pub const DEFAULT_MAX_COLLECTION_LEN: usize = 50_000_000;

/// Limits and policies for one decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Maximum nesting of objects inside objects
    pub max_depth: usize,
    /// Maximum element count of any array, container or list
    pub max_collection_len: usize,
    /// Decode with an older layout when the exact version is unknown
    pub allow_version_fallback: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            max_depth: DEFAULT_MAX_DEPTH,
            max_collection_len: DEFAULT_MAX_COLLECTION_LEN,
            allow_version_fallback: true,
        }
    }
}

impl DecodeOptions {
    /// Exact layouts only
    pub fn strict() -> Self {
        DecodeOptions {
            allow_version_fallback: false,
            ..Default::default()
        }
    }

    /// Set the nesting bound
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the collection bound
    pub fn with_max_collection_len(mut self, len: usize) -> Self {
        self.max_collection_len = len;
        self
    }

    /// Enable or disable the older-layout fallback
    pub fn with_version_fallback(mut self, allow: bool) -> Self {
        self.allow_version_fallback = allow;
        self
    }

    /// Validate a count read from data
    pub fn check_len(&self, len: i64, what: &str) -> Result<usize> {
        if len < 0 {
            return Err(Error::malformed(format!("negative {what} count {len}")));
        }
        let len = len as u64;
        if len > self.max_collection_len as u64 {
            return Err(Error::malformed(format!(
                "{what} count {len} exceeds limit {}",
                self.max_collection_len
            )));
        }
        Ok(len as usize)
    }
}
