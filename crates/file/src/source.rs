//! Byte sources
//!
//! The reader never holds a whole file; it asks a [`ByteSource`] for the
//! ranges it needs (header, key lists, one payload at a time).
//!
//! ## Usage
//!
//! ```rust,ignore
//! #[async_trait]
//! impl ByteSource for MyHttpSource {
//!     async fn len(&self) -> Result<u64> {
//!         // Content-Length
//!     }
//!     async fn read_byte_range(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
//!         // Range request
//!     }
//! }
//! ```

use async_trait::async_trait;
use rootio_core::{Error, Result};
use std::fmt::Debug;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;

/// Random-access byte provider
#[async_trait]
pub trait ByteSource: Debug + Send + Sync {
    /// Total size in bytes
    async fn len(&self) -> Result<u64>;

    /// Read exactly `length` bytes starting at `offset`.
    ///
    /// Returns [`Error::TruncatedData`] if the range runs past the end.
    async fn read_byte_range(&self, offset: u64, length: usize) -> Result<Vec<u8>>;

    /// Read up to `length` bytes, clipped at the end of the source
    async fn read_clipped(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        let total = self.len().await?;
        let available = total.saturating_sub(offset).min(length as u64) as usize;
        self.read_byte_range(offset, available).await
    }
}

fn check_range(offset: u64, length: usize, total: u64) -> Result<()> {
    let end = offset.checked_add(length as u64);
    match end {
        Some(end) if end <= total => Ok(()),
        _ => Err(Error::truncated(
            offset as usize,
            length,
            total.saturating_sub(offset) as usize,
        )),
    }
}

/// Source over an in-memory buffer
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    data: Vec<u8>,
}

impl MemorySource {
    /// Wrap a buffer
    pub fn new(data: Vec<u8>) -> Self {
        MemorySource { data }
    }

    /// The whole buffer
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

#[async_trait]
impl ByteSource for MemorySource {
    async fn len(&self) -> Result<u64> {
        Ok(self.data.len() as u64)
    }

    async fn read_byte_range(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        check_range(offset, length, self.data.len() as u64)?;
        let start = offset as usize;
        Ok(self.data[start..start + length].to_vec())
    }
}

/// Source over a local file, read with positioned reads
#[derive(Debug)]
pub struct LocalFileSource {
    path: PathBuf,
    len: u64,
    file: Mutex<tokio::fs::File>,
}

impl LocalFileSource {
    /// Open a file for reading
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = tokio::fs::File::open(&path).await?;
        let len = file.metadata().await?.len();
        Ok(LocalFileSource {
            path,
            len,
            file: Mutex::new(file),
        })
    }

    /// Path the source was opened from
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for LocalFileSource {
    async fn len(&self) -> Result<u64> {
        Ok(self.len)
    }

    async fn read_byte_range(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        check_range(offset, length, self.len)?;
        let mut buf = vec![0u8; length];
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(offset)).await?;
        file.read_exact(&mut buf).await?;
        Ok(buf)
    }
}
