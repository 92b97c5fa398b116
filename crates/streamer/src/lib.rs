//! Schema-driven object decoding for rootio
//!
//! Turns the bytes of a serialized record into an [`ObjectGraph`] using
//! class layouts from a [`SchemaRegistry`]:
//!
//! ```text
//!   bytes ──► ByteCursor ──► Envelope (byte count, version, checksum)
//!                               │
//!                 ┌─────────────┴──────────────┐
//!                 ▼                            ▼
//!          CustomStreamers               SchemaRegistry
//!          (lists, maps, schema          (lookup by class,
//!           records, TObject)             version, checksum)
//!                 │                            │
//!                 └──────► read_member ◄───────┘
//!                               │
//!                    ReferenceTable (tags → ids)
//!                               │
//!                               ▼
//!                          ObjectGraph
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = SchemaRegistry::new();
//! let decoder = VersionedObjectDecoder::new(&registry);
//! let graph = decoder.decode_top(&payload, "TList", key_len)?;
//! ```
//!
//! [`ObjectGraph`]: rootio_core::ObjectGraph
//! [`SchemaRegistry`]: rootio_schema::SchemaRegistry

#![warn(missing_docs)]
#![warn(clippy::all)]

mod builtin; // Collection and schema-record streamers
pub mod context; // Per-decode cursor and reference state
pub mod custom; // Custom streamer registry
pub mod decoder; // VersionedObjectDecoder
pub mod envelope; // Byte-count / version framing
mod members; // Member dispatch by type kind
pub mod options; // Decode limits
pub mod refs; // ReferenceTable
pub mod stl; // Container plans and bodies

pub use context::DecodeContext;
pub use custom::{CustomStreamer, CustomStreamers, Framing, StreamerFn};
pub use decoder::VersionedObjectDecoder;
pub use envelope::Envelope;
pub use options::{DecodeOptions, DEFAULT_MAX_COLLECTION_LEN, DEFAULT_MAX_DEPTH};
pub use refs::{ReferenceTable, NULL_TAG};
pub use stl::{ContainerPlan, ItemRead, StlVersion};
