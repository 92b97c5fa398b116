//! Key records.
//!
//! Every stored object is preceded by a key naming it. Key lists repeat the
//! same records back to back.
//!
//! # Binary Format
//!
//! ```text
//! ┌────────┬─────────┬────────┬────────┬────────┬───────┬─────────┬──────────┬───────┬──────┬───────┐
//! │ nbytes │ version │ objlen │ datime │ keylen │ cycle │ seekKey │ seekPdir │ class │ name │ title │
//! └────────┴─────────┴────────┴────────┴────────┴───────┴─────────┴──────────┴───────┴──────┴───────┘
//!    i32      i16       u32      u32      u16      u16    u32/u64   u32/u64    TString  TString TString
//! ```
//!
//! Seeks are 64-bit when `version > 1000`. `nbytes` counts the key and the
//! stored payload; the payload starts `keylen` bytes after `seekKey`.

use rootio_codec::ByteCursor;
use rootio_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Key versions above this use 64-bit seeks
pub const LARGE_KEY_VERSION: i16 = 1000;

/// One stored object's directory entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    /// Object name
    pub name: String,
    /// Write counter under the same name
    pub cycle: u16,
    /// Class the payload decodes as
    pub class_name: String,
    /// Object title
    pub title: String,
    /// Offset of the payload in the file
    pub byte_offset: u64,
    /// Bytes stored on disk after the key
    pub compressed_len: u32,
    /// Bytes after decompression
    pub uncompressed_len: u32,
    /// Offset of the key itself
    pub seek_key: u64,
    /// Size of the key header; the payload's tag offset
    pub key_len: u16,
    /// Key format version
    pub version: i16,
    /// Packed write time
    pub datime: u32,
}

impl KeyRecord {
    /// Read one key at the cursor.
    ///
    /// # Errors
    ///
    /// - [`Error::TruncatedData`] if the cursor ends inside the key
    /// - [`Error::Malformed`] if the declared sizes are inconsistent
    pub fn read(c: &mut ByteCursor<'_>) -> Result<Self> {
        let nbytes = c.read_i32()?;
        let version = c.read_i16()?;
        let objlen = c.read_u32()?;
        let datime = c.read_u32()?;
        let key_len = c.read_u16()?;
        let cycle = c.read_u16()?;
        let (seek_key, _seek_pdir) = if version > LARGE_KEY_VERSION {
            (c.read_u64()?, c.read_u64()?)
        } else {
            (u64::from(c.read_u32()?), u64::from(c.read_u32()?))
        };
        let class_name = c.read_tstring()?;
        let name = c.read_tstring()?;
        let title = c.read_tstring()?;

        if nbytes < i32::from(key_len) {
            return Err(Error::malformed(format!(
                "key '{name}' declares {nbytes} bytes but a {key_len}-byte header"
            )));
        }

        Ok(KeyRecord {
            name,
            cycle,
            class_name,
            title,
            byte_offset: seek_key + u64::from(key_len),
            compressed_len: (nbytes - i32::from(key_len)) as u32,
            uncompressed_len: objlen,
            seek_key,
            key_len,
            version,
            datime,
        })
    }

    /// Read a key list: a header key, an i32 count, then that many keys
    pub fn read_list(bytes: &[u8]) -> Result<Vec<Self>> {
        let mut c = ByteCursor::new(bytes);
        let _header = KeyRecord::read(&mut c)?;
        let n = c.read_i32()?;
        if n < 0 {
            return Err(Error::malformed(format!("negative key count {n}")));
        }
        let mut keys = Vec::with_capacity((n as usize).min(4096));
        for _ in 0..n {
            keys.push(KeyRecord::read(&mut c)?);
        }
        Ok(keys)
    }

    /// True when the payload is stored compressed
    pub fn is_compressed(&self) -> bool {
        self.uncompressed_len > self.compressed_len
    }

    /// True for subdirectory keys
    pub fn is_directory(&self) -> bool {
        matches!(self.class_name.as_str(), "TDirectory" | "TDirectoryFile")
    }
}
