//! File layer for rootio
//!
//! Locates stored objects and hands their payloads to the decoder:
//! - `source`: where bytes come from ([`ByteSource`], memory or local file)
//! - `header` / `key` / `directory`: the fixed records of the container
//! - [`RootFile`]: opening, schema-record ingest, `read_object`
//! - [`ReaderConfig`]: limits applied while reading

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config; // ReaderConfig
pub mod directory; // DirectoryRecord and DirectoryIndex
pub mod file; // RootFile
pub mod header; // FileHeader
pub mod key; // KeyRecord
pub mod source; // ByteSource implementations

pub use config::{ConfigError, ReaderConfig};
pub use directory::{parse_request, DirectoryIndex, DirectoryRecord};
pub use file::RootFile;
pub use header::FileHeader;
pub use key::KeyRecord;
pub use source::{ByteSource, LocalFileSource, MemorySource};
