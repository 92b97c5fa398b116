//! Opening a file and reading objects from it.
//!
//! ```text
//!   open ──► FileHeader ──► top key + DirectoryRecord ──► key list
//!                │                                           │
//!                ▼                                           ▼
//!        schema-record key ──► decode TList ──► SchemaRegistry::ingest
//!                                                            │
//!   read_object("dir/name;cycle")                            │
//!        │                                                   │
//!        ▼                                                   ▼
//!   DirectoryIndex ──► KeyRecord ──► payload ──► BlockDecompressor
//!                                                   │
//!                                                   ▼
//!                               VersionedObjectDecoder ──► ObjectGraph
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let file = RootFile::open_path("hsimple.root", ReaderConfig::default()).await?;
//! for key in file.list("") {
//!     println!("{};{} {}", key.name, key.cycle, key.class_name);
//! }
//! let graph = file.read_object("hpx;1").await?;
//! ```

use crate::config::ReaderConfig;
use crate::directory::{join_path, DirectoryIndex, DirectoryRecord};
use crate::header::{FileHeader, HEADER_PROBE_LEN};
use crate::key::KeyRecord;
use crate::source::{ByteSource, LocalFileSource};
use rootio_codec::{BlockDecompressor, ByteCursor};
use rootio_core::{Error, ObjectGraph, Result};
use rootio_schema::SchemaRegistry;
use rootio_streamer::{CustomStreamers, VersionedObjectDecoder};
use rustc_hash::FxHashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Class of the schema-record list
const STREAMER_INFO_CLASS: &str = "TList";

/// An open file: its header, key index and schema registry
pub struct RootFile {
    source: Arc<dyn ByteSource>,
    config: ReaderConfig,
    header: FileHeader,
    title: String,
    directory: DirectoryRecord,
    index: DirectoryIndex,
    registry: SchemaRegistry,
    customs: CustomStreamers,
    decompressor: BlockDecompressor,
    streamer_infos: Option<ObjectGraph>,
}

impl RootFile {
    /// Open a file over any byte source.
    ///
    /// Reads the header, the top key list, every subdirectory's key list
    /// and the schema records.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConfig`] if `config` does not validate
    /// - [`Error::Malformed`] for a bad magic or an empty key list
    /// - any error from reading or decoding the records above
    pub async fn open(source: impl ByteSource + 'static, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        let source: Arc<dyn ByteSource> = Arc::new(source);

        let probe = source.read_clipped(0, HEADER_PROBE_LEN).await?;
        let header = FileHeader::parse(&probe)?;

        let region = source
            .read_clipped(header.begin, header.directory_probe_len())
            .await?;
        let top_key = KeyRecord::read(&mut ByteCursor::new(&region))?;
        let directory =
            DirectoryRecord::read(&mut ByteCursor::at(&region, header.nbytes_name as usize)?)?;
        if !directory.has_keys() {
            return Err(Error::malformed("top directory has an empty key list"));
        }

        let mut file = RootFile {
            source,
            config,
            header,
            title: top_key.title,
            directory,
            index: DirectoryIndex::new(),
            registry: SchemaRegistry::new(),
            customs: CustomStreamers::default(),
            decompressor: BlockDecompressor::default(),
            streamer_infos: None,
        };

        let keys = file
            .read_key_list(file.directory.seek_keys, file.directory.nbytes_keys)
            .await?;
        file.index.insert_all("", keys);
        file.load_streamer_infos().await?;
        file.load_subdirectories().await?;

        debug!(
            version = file.header.version,
            keys = file.index.len(),
            schemas = file.registry.len(),
            "Opened file"
        );
        Ok(file)
    }

    /// Open a local file
    pub async fn open_path(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Self> {
        let source = LocalFileSource::open(path).await?;
        Self::open(source, config).await
    }

    async fn read_key_list(&self, seek: u64, nbytes: u32) -> Result<Vec<KeyRecord>> {
        let bytes = self.source.read_byte_range(seek, nbytes as usize).await?;
        let keys = KeyRecord::read_list(&bytes)?;
        debug!(offset = seek, keys = keys.len(), "Parsed key list");
        Ok(keys)
    }

    async fn load_streamer_infos(&mut self) -> Result<()> {
        if !self.header.has_streamer_info() {
            warn!("File carries no schema records");
            return Ok(());
        }
        let bytes = self
            .source
            .read_byte_range(self.header.seek_info, self.header.nbytes_info as usize)
            .await?;
        let key = KeyRecord::read(&mut ByteCursor::new(&bytes))?;
        let payload = self.read_key_payload(&key).await?;

        let decoder = VersionedObjectDecoder::new(&self.registry)
            .with_customs(&self.customs)
            .with_options(self.config.decode_options());
        let graph = decoder.decode_top(&payload, STREAMER_INFO_CLASS, u32::from(key.key_len))?;
        let added = self.registry.ingest(&graph)?;
        debug!(layouts = added, "Loaded schema records");

        self.index.insert("", key);
        self.streamer_infos = Some(graph);
        Ok(())
    }

    async fn load_subdirectories(&mut self) -> Result<()> {
        let mut pending: Vec<(String, KeyRecord, usize)> = self
            .index
            .list("")
            .into_iter()
            .filter(|k| k.is_directory())
            .map(|k| (k.name.clone(), k.clone(), 1))
            .collect();
        let mut visited = FxHashSet::default();
        visited.insert(self.directory.seek_keys);

        while let Some((path, key, depth)) = pending.pop() {
            if depth > self.config.max_directory_depth {
                return Err(Error::malformed(format!(
                    "directory '{path}' nested deeper than {}",
                    self.config.max_directory_depth
                )));
            }
            let payload = self.read_key_payload(&key).await?;
            let record = DirectoryRecord::read(&mut ByteCursor::new(&payload))?;
            if !record.has_keys() {
                continue;
            }
            if !visited.insert(record.seek_keys) {
                warn!(directory = path.as_str(), "Directory key list already read, skipping");
                continue;
            }

            let keys = self.read_key_list(record.seek_keys, record.nbytes_keys).await?;
            for sub in keys.iter().filter(|k| k.is_directory()) {
                pending.push((join_path(&path, &sub.name), sub.clone(), depth + 1));
            }
            self.index.insert_all(&path, keys);
        }
        Ok(())
    }

    /// Fetch a key's payload and decompress it if needed.
    ///
    /// A payload is stored as-is when its uncompressed length does not
    /// exceed its stored length.
    ///
    /// # Errors
    ///
    /// - [`Error::Malformed`] if the key declares more than
    ///   `max_object_size` bytes
    /// - source and decompression errors
    pub async fn read_key_payload(&self, key: &KeyRecord) -> Result<Vec<u8>> {
        if u64::from(key.uncompressed_len) > self.config.max_object_size {
            return Err(Error::malformed(format!(
                "key '{}' declares {} bytes, limit is {}",
                key.name, key.uncompressed_len, self.config.max_object_size
            )));
        }
        let raw = self
            .source
            .read_byte_range(key.byte_offset, key.compressed_len as usize)
            .await?;
        if !key.is_compressed() {
            return Ok(raw);
        }
        trace!(
            key = key.name.as_str(),
            stored = key.compressed_len,
            expanded = key.uncompressed_len,
            "Decompressing payload"
        );
        self.decompressor
            .decompress(&raw, key.uncompressed_len as usize)
    }

    /// Decode a payload read for `key`.
    ///
    /// Tags inside the payload are offset by the key length.
    pub fn decode_payload(&self, key: &KeyRecord, payload: &[u8]) -> Result<ObjectGraph> {
        self.decoder()
            .decode_top(payload, &key.class_name, u32::from(key.key_len))
    }

    /// Read and decode the object named by a `path;cycle` request
    pub async fn read_object(&self, request: &str) -> Result<ObjectGraph> {
        let key = self.get_key(request)?.clone();
        if key.is_directory() {
            return Err(Error::malformed(format!(
                "'{request}' is a directory; list it with RootFile::list"
            )));
        }
        let payload = self.read_key_payload(&key).await?;
        self.decode_payload(&key, &payload)
    }

    /// Key for a `path;cycle` request
    pub fn get_key(&self, request: &str) -> Result<&KeyRecord> {
        self.index.get(request)
    }

    /// Decoder over this file's registry and streamers
    pub fn decoder(&self) -> VersionedObjectDecoder<'_> {
        VersionedObjectDecoder::new(&self.registry)
            .with_customs(&self.customs)
            .with_options(self.config.decode_options())
    }

    /// Index of every key in the file
    pub fn keys(&self) -> &DirectoryIndex {
        &self.index
    }

    /// Highest-cycle keys directly inside a directory ("" for the top)
    pub fn list(&self, dir: &str) -> Vec<&KeyRecord> {
        self.index.list(dir)
    }

    /// The decoded schema-record list, if the file has one
    pub fn streamer_infos(&self) -> Option<&ObjectGraph> {
        self.streamer_infos.as_ref()
    }

    /// Layouts known to this file
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Custom streamers, for registering more before reading objects
    pub fn custom_streamers_mut(&mut self) -> &mut CustomStreamers {
        &mut self.customs
    }

    /// Block codecs, for registering more before reading objects
    pub fn decompressor_mut(&mut self) -> &mut BlockDecompressor {
        &mut self.decompressor
    }

    /// File header
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Title stored in the top key
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Active configuration
    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }
}

impl std::fmt::Debug for RootFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootFile")
            .field("source", &self.source)
            .field("version", &self.header.version)
            .field("keys", &self.index.len())
            .field("schemas", &self.registry.len())
            .finish()
    }
}
