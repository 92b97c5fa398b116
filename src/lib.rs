//! rootio - reflective reader for self-describing ROOT container files
//!
//! Files carry the layouts of the classes stored in them. rootio reads
//! those layouts at open time and decodes any stored object into plain
//! data, without generated code for the classes involved.
//!
//! # Quick Start
//!
//! ```ignore
//! use rootio::{ReaderConfig, RootFile, Value};
//!
//! let file = RootFile::open_path("hsimple.root", ReaderConfig::default()).await?;
//! let graph = file.read_object("hpx;1").await?;
//! let title = graph.root_object().and_then(|h| h.get("fTitle"));
//! ```
//!
//! # Architecture
//!
//! - `rootio-core`: errors, `Value`, `ObjectGraph`
//! - `rootio-codec`: `ByteCursor`, `BlockDecompressor`
//! - `rootio-schema`: `SchemaRegistry` and class layouts
//! - `rootio-streamer`: `VersionedObjectDecoder`
//! - `rootio-file`: `RootFile`, `DirectoryIndex`, byte sources

pub use rootio_codec::{BlockCodec, BlockDecompressor, ByteCursor};
pub use rootio_core::{Error, ErrorKind, Object, ObjectGraph, ObjectId, Result, Value};
pub use rootio_file::{
    ByteSource, ConfigError, DirectoryIndex, FileHeader, KeyRecord, LocalFileSource, MemorySource,
    ReaderConfig, RootFile,
};
pub use rootio_schema::{ClassSchema, SchemaRegistry, StreamerElement};
pub use rootio_streamer::{CustomStreamers, DecodeOptions, VersionedObjectDecoder};

/// Lower-level crates, for callers that need more than the re-exports
pub mod crates {
    pub use rootio_codec as codec;
    pub use rootio_core as core;
    pub use rootio_file as file;
    pub use rootio_schema as schema;
    pub use rootio_streamer as streamer;
}
