//! File header.
//!
//! # Binary Format
//!
//! ```text
//! ┌──────┬─────────┬───────┬─────┬──────────┬─────────────┬───────┬─────────────┬───────┬──────────┬──────────┬─────────────┐
//! │"root"│ version │ begin │ end │ seekFree │ nbytesFree  │ nfree │ nbytesName  │ units │ compress │ seekInfo │ nbytesInfo  │
//! └──────┴─────────┴───────┴─────┴──────────┴─────────────┴───────┴─────────────┴───────┴──────────┴──────────┴─────────────┘
//!   4       u32      u32    u32*    u32*         u32         u32       u32         u8       u32       u32*         u32
//! ```
//!
//! Fields marked `*` are u64 when `version >= 1_000_000` (large files).

use rootio_codec::ByteCursor;
use rootio_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Magic bytes at offset 0
pub const MAGIC: &[u8; 4] = b"root";

/// Versions at or above this use 64-bit seeks in the header
pub const LARGE_FILE_VERSION: u32 = 1_000_000;

/// Bytes worth fetching to cover the header in one read
pub const HEADER_PROBE_LEN: usize = 400;

/// Upper bound on the name block of the top directory
pub const MAX_NAME_BYTES: u32 = 100_000;

/// Parsed file header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Format version (large files add [`LARGE_FILE_VERSION`])
    pub version: u32,
    /// Offset of the top directory's key
    pub begin: u64,
    /// Offset of the first unused byte
    pub end: u64,
    /// Offset of the free-segments record
    pub seek_free: u64,
    /// Size of the free-segments record
    pub nbytes_free: u32,
    /// Size of the top key plus the file's name and title
    pub nbytes_name: u32,
    /// Width of seek fields (4 or 8)
    pub units: u8,
    /// Default compression setting
    pub compress: u32,
    /// Offset of the schema-record key
    pub seek_info: u64,
    /// Size of the schema-record key
    pub nbytes_info: u32,
}

impl FileHeader {
    /// Parse the header from the first bytes of a file.
    ///
    /// # Errors
    ///
    /// - [`Error::Malformed`] for a missing magic or an implausible name size
    /// - [`Error::TruncatedData`] if `bytes` stops inside the header
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
            return Err(Error::malformed("not a ROOT file: missing 'root' magic"));
        }
        let mut c = ByteCursor::at(bytes, MAGIC.len())?;
        let version = c.read_u32()?;
        let begin = u64::from(c.read_u32()?);
        let large = version >= LARGE_FILE_VERSION;
        let seek = |c: &mut ByteCursor<'_>| -> Result<u64> {
            if large {
                c.read_u64()
            } else {
                c.read_u32().map(u64::from)
            }
        };

        let end = seek(&mut c)?;
        let seek_free = seek(&mut c)?;
        let nbytes_free = c.read_u32()?;
        let _nfree = c.read_u32()?;
        let nbytes_name = c.read_u32()?;
        let units = c.read_u8()?;
        let compress = c.read_u32()?;
        let seek_info = seek(&mut c)?;
        let nbytes_info = c.read_u32()?;

        if nbytes_name == 0 || nbytes_name > MAX_NAME_BYTES {
            return Err(Error::malformed(format!(
                "implausible top directory name size {nbytes_name}"
            )));
        }

        Ok(FileHeader {
            version,
            begin,
            end,
            seek_free,
            nbytes_free,
            nbytes_name,
            units,
            compress,
            seek_info,
            nbytes_info,
        })
    }

    /// True for the 64-bit layout
    pub fn is_large(&self) -> bool {
        self.version >= LARGE_FILE_VERSION
    }

    /// Format version with the large-file marker removed
    pub fn format_version(&self) -> u32 {
        self.version % LARGE_FILE_VERSION
    }

    /// True when the file carries schema records
    pub fn has_streamer_info(&self) -> bool {
        self.seek_info != 0 && self.nbytes_info != 0
    }

    /// Bytes to fetch at `begin` to cover the top key and directory record
    pub fn directory_probe_len(&self) -> usize {
        // key + name block, two datimes, the UUID, and 64-bit seeks
        let mut n = self.nbytes_name as usize + 22 + 4 + 4 + 18;
        if self.format_version() >= 40_000 {
            n += 12;
        }
        n.max(300)
    }
}
