//! Class layouts for rootio
//!
//! This crate describes how each stored class is laid out:
//! - [`TypeKind`]: closed enum over member type codes
//! - [`StreamerElement`]: one member recipe
//! - [`ClassSchema`]: the members of one class version
//! - [`SchemaRegistry`]: every layout known for a file, with version
//!   fallback, checksum lookup, base flattening and pair synthesis

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod class; // ClassSchema
pub mod element; // StreamerElement and float packing
pub mod ingest; // Layouts from decoded schema records
pub mod kind; // Type code enums
pub mod names; // Type spelling helpers
pub mod registry; // SchemaRegistry

pub use class::{ClassSchema, CUSTOM_STREAMER_VERSION};
pub use element::{Dims, FloatPacking, StreamerElement, BASE_TYPE_NAME, HAS_RANGE_BIT};
pub use kind::{BasicType, ObjectKind, StlKind, TypeKind};
pub use names::ArrayKind;
pub use registry::{ResolveStatus, Resolved, SchemaRegistry};
