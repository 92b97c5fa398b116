//! Per-decode reference table
//!
//! Pointer members refer to objects by tag (a buffer position). The table
//! maps tags to slots of an arena; a slot is reserved before the object is
//! decoded and filled afterwards, so a reference met while the object is
//! still being decoded (a cycle) or before it appears at all (a forward
//! reference) resolves to the same [`ObjectId`].
//!
//! ```text
//!   tags:   { 1 -> #0, 118 -> #1, 160 -> #2 }
//!   slots:  [ Some(root), None (being decoded), Some([1.0, 2.0]) ]
//! ```
//!
//! A table lives for exactly one top-level decode and is consumed by
//! [`ReferenceTable::into_graph`].

use rootio_core::{Error, ObjectGraph, ObjectId, Result, Value};
use rustc_hash::FxHashMap;
use tracing::warn;

/// Tag value meaning "no object"
pub const NULL_TAG: u32 = 0;

/// Tag to slot map plus the slot arena
#[derive(Debug, Default)]
pub struct ReferenceTable {
    tags: FxHashMap<u32, ObjectId>,
    slots: Vec<Option<Value>>,
    classes: FxHashMap<u32, String>,
}

impl ReferenceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the slot for an object about to be decoded under `tag`.
    ///
    /// If the tag was already referenced (forward reference) the existing
    /// empty slot is returned.
    ///
    /// # Errors
    ///
    /// [`Error::Malformed`] for the null tag or a tag whose slot is
    /// already filled.
    pub fn reserve(&mut self, tag: u32) -> Result<ObjectId> {
        if tag == NULL_TAG {
            return Err(Error::malformed("cannot register an object under tag 0"));
        }
        if let Some(&id) = self.tags.get(&tag) {
            if self.slots[id.index()].is_some() {
                return Err(Error::malformed(format!(
                    "tag {tag} registered twice in one record"
                )));
            }
            return Ok(id);
        }
        let id = ObjectId(self.slots.len() as u32);
        self.slots.push(None);
        self.tags.insert(tag, id);
        Ok(id)
    }

    /// Fill a reserved slot
    pub fn fill(&mut self, id: ObjectId, value: Value) {
        if let Some(slot) = self.slots.get_mut(id.index()) {
            *slot = Some(value);
        }
    }

    /// Reserve and fill in one step
    pub fn put(&mut self, tag: u32, value: Value) -> Result<ObjectId> {
        let id = self.reserve(tag)?;
        self.fill(id, value);
        Ok(id)
    }

    /// Value stored under a tag, once filled
    pub fn get(&self, tag: u32) -> Option<&Value> {
        self.tags
            .get(&tag)
            .and_then(|id| self.slots[id.index()].as_ref())
    }

    /// Slot of a tag, filled or not
    pub fn id_of(&self, tag: u32) -> Option<ObjectId> {
        self.tags.get(&tag).copied()
    }

    /// Slot a pointer to `tag` should hold.
    ///
    /// Tags not seen yet get an empty slot that a later object with the
    /// same tag will fill.
    pub fn reference(&mut self, tag: u32) -> Result<ObjectId> {
        match self.tags.get(&tag) {
            Some(&id) => Ok(id),
            None => self.reserve(tag),
        }
    }

    /// Whether a slot has been filled
    pub fn is_filled(&self, id: ObjectId) -> bool {
        matches!(self.slots.get(id.index()), Some(Some(_)))
    }

    /// Record the class announced at a class tag (the first mapping wins)
    pub fn map_class(&mut self, tag: u32, class_name: &str) {
        self.classes
            .entry(tag)
            .or_insert_with(|| class_name.to_string());
    }

    /// Class announced at a class tag
    pub fn class_for(&self, tag: u32) -> Option<&str> {
        self.classes.get(&tag).map(String::as_str)
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no slot was created
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Tags whose slots were never filled, sorted
    pub fn dangling_tags(&self) -> Vec<u32> {
        let mut tags: Vec<u32> = self
            .tags
            .iter()
            .filter(|(_, id)| self.slots[id.index()].is_none())
            .map(|(&tag, _)| tag)
            .collect();
        tags.sort_unstable();
        tags
    }

    /// Consume the table into the output graph
    pub fn into_graph(self, root: ObjectId) -> ObjectGraph {
        let dangling = self.dangling_tags();
        if !dangling.is_empty() {
            warn!(
                count = dangling.len(),
                first = dangling[0],
                "References to objects never found in the record"
            );
        }
        ObjectGraph::from_parts(self.slots, root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_then_fill() {
        let mut table = ReferenceTable::new();
        let id = table.reserve(100).unwrap();
        assert!(!table.is_filled(id));
        assert!(table.get(100).is_none());
        assert_eq!(table.id_of(100), Some(id));

        table.fill(id, Value::Int(7));
        assert!(table.is_filled(id));
        assert_eq!(table.get(100), Some(&Value::Int(7)));
    }

    #[test]
    fn test_forward_reference_shares_slot() {
        let mut table = ReferenceTable::new();
        let forward = table.reference(250).unwrap();
        let decoded = table.reserve(250).unwrap();
        assert_eq!(forward, decoded);
        table.fill(decoded, Value::from("later"));
        assert_eq!(table.reference(250).unwrap(), forward);
        assert!(table.dangling_tags().is_empty());
    }

    #[test]
    fn test_duplicate_tag_rejected() {
        let mut table = ReferenceTable::new();
        table.put(10, Value::Null).unwrap();
        assert!(table.reserve(10).is_err());
        assert!(table.reserve(NULL_TAG).is_err());
    }

    #[test]
    fn test_dangling_tags_survive_into_graph() {
        let mut table = ReferenceTable::new();
        let root = table.put(1, Value::Int(1)).unwrap();
        let missing = table.reference(999).unwrap();
        assert_eq!(table.dangling_tags(), vec![999]);

        let graph = table.into_graph(root);
        assert_eq!(graph.unresolved(), vec![missing]);
        assert_eq!(graph.root(), &Value::Int(1));
    }

    #[test]
    fn test_class_map_first_wins() {
        let mut table = ReferenceTable::new();
        table.map_class(40, "TH1F");
        table.map_class(40, "TH1D");
        assert_eq!(table.class_for(40), Some("TH1F"));
        assert_eq!(table.class_for(41), None);
    }
}
