//! Core types for rootio
//!
//! This crate defines the foundational types shared by every layer:
//! - Error: the decode error taxonomy and result alias
//! - Value / Object: plain decoded data
//! - ObjectGraph: the arena returned by one top-level decode

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error; // Error taxonomy
pub mod graph; // Arena output of a decode
pub mod value; // Decoded data model

pub use error::{Error, ErrorKind, Result};
pub use graph::ObjectGraph;
pub use value::{Object, ObjectId, Value};
