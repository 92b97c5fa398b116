//! Schema registry
//!
//! Holds every class layout known for one file, keyed by class name and
//! version, plus a checksum index and the file's basic-type aliases.
//!
//! The registry is append-only: a `(class, version)` pair keeps the first
//! layout registered for it. That makes it safe to share behind an `Arc`
//! across any number of decode calls for the lifetime of the file.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let registry = SchemaRegistry::new();
//! registry.ingest(&streamer_info_graph)?;
//!
//! // Exact version, or the newest older one with a status flag
//! let resolved = registry.resolve("TH1F", 3)?;
//! if resolved.is_degraded() {
//!     warn!("decoding with an older layout");
//! }
//!
//! // Flattened members for member-wise streaming
//! let members = registry.expand("TAxis", 10)?;
//! ```

use crate::class::ClassSchema;
use crate::element::StreamerElement;
use crate::kind::BasicType;
use crate::names;
use parking_lot::RwLock;
use rootio_core::{Error, Result};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Base-version value written for foreign classes
const FOREIGN_BASE_VERSION: u32 = u32::MAX;

/// Nesting bound when flattening base classes
const MAX_BASE_DEPTH: usize = 64;

/// How a schema was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveStatus {
    /// The requested version was registered
    Exact,
    /// Found through the layout checksum
    ByChecksum,
    /// The requested version is unknown; an older layout was used instead
    OlderVersion {
        /// Version the data asked for
        requested: i32,
    },
}

/// Result of a schema lookup
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Layout to decode with
    pub schema: Arc<ClassSchema>,
    /// How it was found
    pub status: ResolveStatus,
}

impl Resolved {
    /// True when an older layout stands in for the requested one
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ResolveStatus::OlderVersion { .. })
    }
}

#[derive(Default)]
struct Inner {
    classes: FxHashMap<String, BTreeMap<i32, Arc<ClassSchema>>>,
    by_checksum: FxHashMap<u32, Arc<ClassSchema>>,
    basic_aliases: FxHashMap<String, BasicType>,
}

/// Registry of class layouts for one file
#[derive(Default)]
pub struct SchemaRegistry {
    inner: RwLock<Inner>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a layout.
    ///
    /// Returns `false` if a layout for the same class and version is already
    /// registered; the existing one is kept. The checksum index is updated
    /// either way.
    pub fn register(&self, schema: ClassSchema) -> bool {
        let schema = Arc::new(schema);
        let mut inner = self.inner.write();
        if schema.checksum != 0 {
            inner
                .by_checksum
                .entry(schema.checksum)
                .or_insert_with(|| Arc::clone(&schema));
        }
        let versions = inner.classes.entry(schema.class_name.clone()).or_default();
        if versions.contains_key(&schema.version) {
            return false;
        }
        versions.insert(schema.version, schema);
        true
    }

    /// Resolve a class layout, allowing the older-version fallback
    pub fn resolve(&self, class_name: &str, version: i32) -> Result<Resolved> {
        self.lookup(class_name, version, None, true)
    }

    /// Resolve a class layout.
    ///
    /// A known `checksum` wins over the version. Otherwise the exact version
    /// is used; failing that, and when `allow_fallback` is set, the newest
    /// registered version older than the requested one.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownSchema`] when nothing matches.
    pub fn lookup(
        &self,
        class_name: &str,
        version: i32,
        checksum: Option<u32>,
        allow_fallback: bool,
    ) -> Result<Resolved> {
        let inner = self.inner.read();

        if let Some(schema) = checksum.and_then(|c| inner.by_checksum.get(&c)) {
            if schema.class_name == class_name {
                return Ok(Resolved {
                    schema: Arc::clone(schema),
                    status: ResolveStatus::ByChecksum,
                });
            }
        }

        let versions = inner
            .classes
            .get(class_name)
            .ok_or_else(|| Error::unknown_schema(class_name, version))?;

        if let Some(schema) = versions.get(&version) {
            return Ok(Resolved {
                schema: Arc::clone(schema),
                status: ResolveStatus::Exact,
            });
        }

        if allow_fallback {
            if let Some((&older, schema)) = versions.range(..version).next_back() {
                warn!(
                    class = class_name,
                    requested = version,
                    using = older,
                    "Schema version not found, decoding with older layout"
                );
                return Ok(Resolved {
                    schema: Arc::clone(schema),
                    status: ResolveStatus::OlderVersion { requested: version },
                });
            }
        }

        Err(Error::unknown_schema(class_name, version))
    }

    /// Layout registered under a checksum
    pub fn resolve_checksum(&self, checksum: u32) -> Option<Arc<ClassSchema>> {
        self.inner.read().by_checksum.get(&checksum).cloned()
    }

    /// Check if a checksum is known
    pub fn knows_checksum(&self, checksum: u32) -> bool {
        self.inner.read().by_checksum.contains_key(&checksum)
    }

    /// Check if any version of a class is registered
    pub fn contains(&self, class_name: &str) -> bool {
        self.inner.read().classes.contains_key(class_name)
    }

    /// Registered versions of a class, ascending
    pub fn versions(&self, class_name: &str) -> Vec<i32> {
        self.inner
            .read()
            .classes
            .get(class_name)
            .map(|v| v.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Newest registered layout of a class
    pub fn latest(&self, class_name: &str) -> Option<Arc<ClassSchema>> {
        self.inner
            .read()
            .classes
            .get(class_name)
            .and_then(|v| v.values().next_back().cloned())
    }

    /// All registered class names, sorted
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().classes.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered layouts across all classes
    pub fn len(&self) -> usize {
        self.inner.read().classes.values().map(BTreeMap::len).sum()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.inner.read().classes.is_empty()
    }

    /// Record a file-specific typedef of a basic type
    pub fn register_alias(&self, type_name: impl Into<String>, ty: BasicType) {
        self.inner.write().basic_aliases.insert(type_name.into(), ty);
    }

    /// Basic type behind a file-specific typedef
    pub fn basic_alias(&self, type_name: &str) -> Option<BasicType> {
        self.inner.read().basic_aliases.get(type_name).copied()
    }

    /// Basic type for a spelling, consulting the file's aliases
    pub fn basic_type_of(&self, type_name: &str) -> Option<BasicType> {
        names::type_id_of(type_name).or_else(|| self.basic_alias(type_name))
    }

    /// Members of a class with every base class flattened in place.
    ///
    /// `TObject` bases stay as a single base element; member-wise readers
    /// stream them with a fixed layout. Foreign bases (version `u32::MAX`)
    /// resolve against version 1.
    ///
    /// Fixed-size array members stay one element each. Their repetition
    /// is carried by [`StreamerElement::dims`] and the decoder reads that
    /// many items in place, so the expanded list keeps schema order with
    /// one entry per member.
    pub fn expand(&self, class_name: &str, version: i32) -> Result<Vec<StreamerElement>> {
        let resolved = self.resolve(class_name, version)?;
        self.expand_schema(&resolved.schema)
    }

    /// [`SchemaRegistry::expand`] for a layout already in hand
    pub fn expand_schema(&self, schema: &ClassSchema) -> Result<Vec<StreamerElement>> {
        let mut out = Vec::with_capacity(schema.elements.len());
        self.expand_into(schema, &mut out, 0)?;
        Ok(out)
    }

    fn expand_into(
        &self,
        schema: &ClassSchema,
        out: &mut Vec<StreamerElement>,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_BASE_DEPTH {
            return Err(Error::malformed(format!(
                "base classes of '{}' nest deeper than {}",
                schema.class_name, MAX_BASE_DEPTH
            )));
        }
        for element in &schema.elements {
            if !element.is_base() || element.name == "TObject" {
                out.push(element.clone());
                continue;
            }
            if names::array_kind(&element.name) != names::ArrayKind::NotArray {
                out.push(element.clone());
                continue;
            }
            let base_version = match element.base_version {
                Some(FOREIGN_BASE_VERSION) | None => 1,
                Some(v) => v as i32,
            };
            let parent = self.resolve(&element.name, base_version)?;
            self.expand_into(&parent.schema, out, depth + 1)?;
        }
        Ok(())
    }

    /// Layout of `pair<K,V>`.
    ///
    /// Uses the newest registered layout when the file has one; otherwise
    /// synthesizes (and registers) a version-0 layout with `first` and
    /// `second` members built from the template arguments.
    pub fn pair_schema(&self, pair_type: &str) -> Result<Arc<ClassSchema>> {
        if let Some(schema) = self.latest(pair_type) {
            return Ok(schema);
        }
        let (outer, args) = names::split_template(pair_type)
            .ok_or_else(|| Error::malformed(format!("not a template type: {pair_type}")))?;
        let args = names::template_args(args);
        if outer.trim_start_matches("std::") != "pair" || args.len() != 2 {
            return Err(Error::malformed(format!(
                "cannot build pair layout for '{pair_type}'"
            )));
        }

        let alias = |n: &str| self.basic_alias(n);
        let schema = ClassSchema::new(pair_type, 0)
            .with_element(StreamerElement::from_type_name("first", args[0], alias))
            .with_element(StreamerElement::from_type_name("second", args[1], alias));
        self.register(schema);
        self.latest(pair_type)
            .ok_or_else(|| Error::unknown_schema(pair_type, 0))
    }
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("SchemaRegistry")
            .field("classes", &inner.classes.len())
            .field("checksums", &inner.by_checksum.len())
            .field("basic_aliases", &inner.basic_aliases.len())
            .finish()
    }
}
