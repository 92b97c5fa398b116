//! Custom streamer registry
//!
//! Some classes are not described by schema records at all, or are
//! described by records that do not match their bytes (lists, maps, the
//! schema records themselves). Those are read by a hand-written function
//! registered under the class name. The decoder consults this registry
//! before the schema registry.
//!
//! ## Framing
//!
//! - [`Framing::Versioned`]: the decoder reads the object's envelope,
//!   passes its version to the function and checks the byte count after.
//! - [`Framing::Direct`]: the function reads the bytes as-is; it receives
//!   version 0.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let mut customs = CustomStreamers::default(); // built-ins included
//! customs.register("TMyCompact", read_my_compact);
//! customs.alias("TMyCompactV2", "TMyCompact");
//!
//! let decoder = VersionedObjectDecoder::new(&registry).with_customs(&customs);
//! ```

use crate::builtin;
use crate::context::DecodeContext;
use crate::decoder::VersionedObjectDecoder;
use once_cell::sync::Lazy;
use rootio_core::{Object, Result};
use rustc_hash::FxHashMap;

/// Signature of a custom streamer.
///
/// Receives the decoder (for nested reads), the decode context, the object
/// to populate and the class version from the envelope.
pub type StreamerFn =
    fn(&VersionedObjectDecoder<'_>, &mut DecodeContext<'_>, &mut Object, i16) -> Result<()>;

/// Whether the decoder frames a custom streamer with an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Envelope read and checked around the function
    Versioned,
    /// Function reads raw bytes
    Direct,
}

/// One registered custom streamer
#[derive(Debug, Clone, Copy)]
pub struct CustomStreamer {
    /// Envelope handling
    pub framing: Framing,
    /// Reader function
    pub func: StreamerFn,
}

static BUILTIN: Lazy<CustomStreamers> = Lazy::new(|| {
    let mut streamers = CustomStreamers::empty();
    builtin::install(&mut streamers);
    streamers
});

/// Registry of class name to custom streamer
#[derive(Clone)]
pub struct CustomStreamers {
    streamers: FxHashMap<String, CustomStreamer>,
}

impl CustomStreamers {
    /// Registry with no streamers, not even the built-ins
    pub fn empty() -> Self {
        CustomStreamers {
            streamers: FxHashMap::default(),
        }
    }

    /// Shared registry holding only the built-in streamers
    pub fn builtin() -> &'static CustomStreamers {
        &BUILTIN
    }

    /// Register a streamer read inside an envelope.
    ///
    /// Replaces any streamer registered under the same name.
    pub fn register(&mut self, class_name: impl Into<String>, func: StreamerFn) {
        self.streamers.insert(
            class_name.into(),
            CustomStreamer {
                framing: Framing::Versioned,
                func,
            },
        );
    }

    /// Register a streamer that reads its bytes without an envelope
    pub fn register_direct(&mut self, class_name: impl Into<String>, func: StreamerFn) {
        self.streamers.insert(
            class_name.into(),
            CustomStreamer {
                framing: Framing::Direct,
                func,
            },
        );
    }

    /// Read `class_name` with the streamer registered for `target`.
    ///
    /// Returns `false` when `target` has no streamer.
    pub fn alias(&mut self, class_name: impl Into<String>, target: &str) -> bool {
        match self.streamers.get(target).copied() {
            Some(streamer) => {
                self.streamers.insert(class_name.into(), streamer);
                true
            }
            None => false,
        }
    }

    /// Streamer for a class
    pub fn get(&self, class_name: &str) -> Option<CustomStreamer> {
        self.streamers.get(class_name).copied()
    }

    /// Check if a class has a streamer
    pub fn contains(&self, class_name: &str) -> bool {
        self.streamers.contains_key(class_name)
    }

    /// Registered class names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.streamers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered streamers
    pub fn len(&self) -> usize {
        self.streamers.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.streamers.is_empty()
    }
}

impl Default for CustomStreamers {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl std::fmt::Debug for CustomStreamers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomStreamers")
            .field("classes", &self.names())
            .finish()
    }
}
