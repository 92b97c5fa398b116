//! Object graph produced by one top-level decode
//!
//! Objects reached through pointer members live in an arena and are referred
//! to by [`ObjectId`]. Slots are reserved before an object is decoded and
//! filled afterwards, so a slot can be referenced while its object is still
//! being read (self-references, cycles). A slot that was reserved by a
//! forward reference but never filled stays empty; see
//! [`ObjectGraph::unresolved`].
//!
//! # Layout
//!
//! ```text
//! ┌──────────┬──────────┬──────────┬─────┐
//! │ slot #0  │ slot #1  │ slot #2  │ ... │   Vec<Option<Value>>
//! └──────────┴──────────┴──────────┴─────┘
//!      ▲ root           ▲ Value::Ref(#2) from any member
//! ```

use crate::value::{Object, ObjectId, Value};
use serde::{Deserialize, Serialize};

/// Arena of decoded objects plus the id of the top-level object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectGraph {
    slots: Vec<Option<Value>>,
    root: ObjectId,
}

impl ObjectGraph {
    /// Assemble a graph from its arena slots and root id
    pub fn from_parts(slots: Vec<Option<Value>>, root: ObjectId) -> Self {
        ObjectGraph { slots, root }
    }

    /// Id of the top-level object
    pub fn root_id(&self) -> ObjectId {
        self.root
    }

    /// The top-level object, or `Null` if decoding never filled it
    pub fn root(&self) -> &Value {
        self.get(self.root).unwrap_or(&Value::Null)
    }

    /// The top-level object when it decoded to an [`Object`]
    pub fn root_object(&self) -> Option<&Object> {
        self.root().as_object()
    }

    /// Value stored in a slot, if the slot exists and was filled
    pub fn get(&self, id: ObjectId) -> Option<&Value> {
        self.slots.get(id.index()).and_then(Option::as_ref)
    }

    /// Follow references until a non-reference value is reached.
    ///
    /// Returns `Null` for dangling references. Chains of references are
    /// bounded by the arena size.
    pub fn resolve<'a>(&'a self, value: &'a Value) -> &'a Value {
        let mut current = value;
        for _ in 0..=self.slots.len() {
            match current {
                Value::Ref(id) => match self.get(*id) {
                    Some(next) => current = next,
                    None => return &Value::Null,
                },
                other => return other,
            }
        }
        current
    }

    /// Resolve a member of an object through references
    pub fn field<'a>(&'a self, object: &'a Object, name: &str) -> Option<&'a Value> {
        object.get(name).map(|v| self.resolve(v))
    }

    /// Number of arena slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the arena has no slots
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Ids of slots that were referenced but never decoded
    pub fn unresolved(&self) -> Vec<ObjectId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| ObjectId(i as u32))
            .collect()
    }

    /// Iterate over filled slots
    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &Value)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (ObjectId(i as u32), v)))
    }

    /// Deep copy of the root with references inlined.
    ///
    /// A reference to an object that is already being inlined further up
    /// (a cycle) is kept as [`Value::Ref`]. Dangling references become `Null`.
    pub fn materialize(&self) -> Value {
        let mut path = Vec::new();
        self.materialize_ref(self.root, &mut path)
    }

    fn materialize_ref(&self, id: ObjectId, path: &mut Vec<ObjectId>) -> Value {
        if path.contains(&id) {
            return Value::Ref(id);
        }
        match self.get(id) {
            Some(value) => {
                path.push(id);
                let out = self.materialize_value(value, path);
                path.pop();
                out
            }
            None => Value::Null,
        }
    }

    fn materialize_value(&self, value: &Value, path: &mut Vec<ObjectId>) -> Value {
        match value {
            Value::Ref(id) => self.materialize_ref(*id, path),
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|v| self.materialize_value(v, path))
                    .collect(),
            ),
            Value::Object(obj) => {
                let mut out = Object::new(obj.class_name());
                for (name, v) in obj.fields() {
                    out.set(name, self.materialize_value(v, path));
                }
                Value::Object(out)
            }
            other => other.clone(),
        }
    }
}
