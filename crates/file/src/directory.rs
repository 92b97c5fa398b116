//! Directory records and the key index
//!
//! A directory's payload starts with a [`DirectoryRecord`] pointing at its
//! key list. [`DirectoryIndex`] holds the keys of the top directory and of
//! every subdirectory, addressed by full path:
//!
//! ```text
//!   "hpx"          -> [cycle 1, cycle 2]
//!   "calib"        -> [cycle 1]            (a TDirectoryFile key)
//!   "calib/gain"   -> [cycle 1]
//! ```
//!
//! Requests use `path;cycle` syntax; without a cycle the highest one wins.

use crate::key::KeyRecord;
use rootio_codec::ByteCursor;
use rootio_core::{Error, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Directory versions above this use 64-bit seeks
pub const LARGE_DIRECTORY_VERSION: u16 = 1000;

/// Header of a directory: where its key list lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    /// Record version
    pub version: u16,
    /// Packed creation time
    pub datime_created: u32,
    /// Packed modification time
    pub datime_modified: u32,
    /// Size of the key list
    pub nbytes_keys: u32,
    /// Size of the directory's key and name block
    pub nbytes_name: u32,
    /// Offset of this directory
    pub seek_dir: u64,
    /// Offset of the parent directory
    pub seek_parent: u64,
    /// Offset of the key list
    pub seek_keys: u64,
}

impl DirectoryRecord {
    /// Read a record at the cursor
    pub fn read(c: &mut ByteCursor<'_>) -> Result<Self> {
        let version = c.read_u16()?;
        let datime_created = c.read_u32()?;
        let datime_modified = c.read_u32()?;
        let nbytes_keys = c.read_u32()?;
        let nbytes_name = c.read_u32()?;
        let large = version > LARGE_DIRECTORY_VERSION;
        let mut seek = || -> Result<u64> {
            if large {
                c.read_u64()
            } else {
                c.read_u32().map(u64::from)
            }
        };
        let seek_dir = seek()?;
        let seek_parent = seek()?;
        let seek_keys = seek()?;
        Ok(DirectoryRecord {
            version,
            datime_created,
            datime_modified,
            nbytes_keys,
            nbytes_name,
            seek_dir,
            seek_parent,
            seek_keys,
        })
    }

    /// True when the directory has a key list to read
    pub fn has_keys(&self) -> bool {
        self.seek_keys != 0 && self.nbytes_keys != 0
    }
}

/// Split a request into a path and an optional cycle.
///
/// Leading slashes are ignored. The cycle follows the last `;`.
///
/// # Errors
///
/// [`Error::Malformed`] for an empty path or a cycle that is not a number.
pub fn parse_request(request: &str) -> Result<(&str, Option<u16>)> {
    let (path, cycle) = match request.rfind(';') {
        Some(p) => {
            let cycle = request[p + 1..].trim().parse::<u16>().map_err(|_| {
                Error::malformed(format!("bad cycle in request '{request}'"))
            })?;
            (&request[..p], Some(cycle))
        }
        None => (request, None),
    };
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Err(Error::malformed(format!("empty object name in '{request}'")));
    }
    Ok((path, cycle))
}

/// Keys of a file by full path and cycle
#[derive(Default, Clone)]
pub struct DirectoryIndex {
    keys: FxHashMap<String, Vec<KeyRecord>>,
}

impl DirectoryIndex {
    /// Create an empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the keys of the directory at `dir` ("" for the top directory)
    pub fn insert_all(&mut self, dir: &str, keys: impl IntoIterator<Item = KeyRecord>) {
        for key in keys {
            self.insert(dir, key);
        }
    }

    /// Add one key of the directory at `dir`.
    ///
    /// A key with the same path and cycle replaces the earlier one.
    pub fn insert(&mut self, dir: &str, key: KeyRecord) {
        let path = join_path(dir, &key.name);
        let cycles = self.keys.entry(path).or_default();
        match cycles.binary_search_by_key(&key.cycle, |k| k.cycle) {
            Ok(i) => cycles[i] = key,
            Err(i) => cycles.insert(i, key),
        }
    }

    /// Look up a `path;cycle` request.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] if no key matches
    /// - [`Error::Malformed`] if the request does not parse
    pub fn get(&self, request: &str) -> Result<&KeyRecord> {
        let (path, cycle) = parse_request(request)?;
        self.get_cycle(path, cycle)
    }

    /// Look up a path at a cycle, or its highest cycle when `None`
    pub fn get_cycle(&self, path: &str, cycle: Option<u16>) -> Result<&KeyRecord> {
        let path = path.trim_start_matches('/');
        let cycles = self
            .keys
            .get(path)
            .ok_or_else(|| Error::not_found(format!("key '{path}'")))?;
        let found = match cycle {
            Some(c) => cycles.iter().find(|k| k.cycle == c),
            None => cycles.last(),
        };
        found.ok_or_else(|| match cycle {
            Some(c) => Error::not_found(format!("key '{path};{c}'")),
            None => Error::not_found(format!("key '{path}'")),
        })
    }

    /// Check if a path has any cycle
    pub fn contains(&self, path: &str) -> bool {
        self.keys.contains_key(path.trim_start_matches('/'))
    }

    /// Cycles stored under a path, ascending
    pub fn cycles(&self, path: &str) -> Vec<u16> {
        self.keys
            .get(path.trim_start_matches('/'))
            .map(|ks| ks.iter().map(|k| k.cycle).collect())
            .unwrap_or_default()
    }

    /// All `(path, key)` pairs, sorted by path then cycle
    pub fn entries(&self) -> Vec<(&str, &KeyRecord)> {
        let mut out: Vec<(&str, &KeyRecord)> = self
            .keys
            .iter()
            .flat_map(|(path, ks)| ks.iter().map(move |k| (path.as_str(), k)))
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0).then(a.1.cycle.cmp(&b.1.cycle)));
        out
    }

    /// Highest-cycle key of every path directly inside `dir`, sorted by name
    pub fn list(&self, dir: &str) -> Vec<&KeyRecord> {
        let dir = dir.trim_matches('/');
        let mut out: Vec<&KeyRecord> = self
            .keys
            .iter()
            .filter(|(path, _)| parent_of(path) == dir)
            .filter_map(|(_, ks)| ks.last())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Number of distinct paths
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no keys were indexed
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl std::fmt::Debug for DirectoryIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut paths: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        paths.sort_unstable();
        f.debug_struct("DirectoryIndex").field("paths", &paths).finish()
    }
}

/// Join a directory path and a key name
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(p) => &path[..p],
        None => "",
    }
}
