//! Building class layouts from decoded schema records.
//!
//! A file stores its layouts as a `TList` of `TStreamerInfo` objects, each
//! holding a `TObjArray` of `TStreamerElement` subclasses. Once that list
//! has been decoded into an [`ObjectGraph`], [`SchemaRegistry::ingest`]
//! converts every record into a [`ClassSchema`].

use crate::class::ClassSchema;
use crate::element::StreamerElement;
use crate::kind::{BasicType, StlKind, TypeKind};
use crate::names;
use crate::registry::SchemaRegistry;
use rootio_core::{Error, Object, ObjectGraph, Result, Value};
use tracing::{debug, warn};

impl SchemaRegistry {
    /// Register every `TStreamerInfo` found in a decoded schema list.
    ///
    /// Also records basic-type aliases: members whose type spelling is not a
    /// standard basic name but whose code is a basic kind (typedefs, enums).
    ///
    /// Returns the number of newly registered layouts.
    pub fn ingest(&self, graph: &ObjectGraph) -> Result<usize> {
        let list = graph
            .root_object()
            .ok_or_else(|| Error::malformed("schema list root is not an object"))?;
        let items = list
            .get("arr")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::malformed("schema list has no 'arr' member"))?;

        let mut added = 0;
        for item in items {
            let info = match graph.resolve(item).as_object() {
                Some(obj) if obj.class_name() == "TStreamerInfo" => obj,
                Some(_) | None => continue,
            };
            let schema = schema_from_info(graph, info)?;
            self.collect_aliases(&schema);
            if self.register(schema) {
                added += 1;
            }
        }

        debug!(records = items.len(), registered = added, "Ingested schema records");
        Ok(added)
    }

    fn collect_aliases(&self, schema: &ClassSchema) {
        for element in &schema.elements {
            if element.type_name.is_empty() || element.type_code == 0 {
                continue;
            }
            let (code, type_name) = match alias_candidate(element) {
                Some(c) => c,
                None => continue,
            };
            let ty = match BasicType::from_code(code) {
                Some(ty) => ty,
                None => continue,
            };
            let known = names::type_id_of(type_name);
            if known == Some(ty)
                || (ty == BasicType::Bits && known == Some(BasicType::UInt))
                || (ty == BasicType::Counter && known == Some(BasicType::Int))
            {
                continue;
            }
            if self.basic_alias(type_name) != Some(ty) {
                self.register_alias(type_name, ty);
            }
        }
    }
}

/// Basic code and spelling an element contributes as a possible alias
fn alias_candidate(element: &StreamerElement) -> Option<(i32, &str)> {
    let code = element.type_code;
    let name = element.type_name.as_str();
    if code < 60 {
        let name = if code > 20 {
            names::strip_pointer(name).0
        } else {
            name
        };
        return Some((code % 20, name));
    }

    let stl = element.stl_kind?;
    if !element.kind().map(TypeKind::is_container).unwrap_or(false)
        || element.stl_ctype <= 0
        || element.stl_ctype >= 20
    {
        return None;
    }
    let (outer, args) = names::split_template(name)?;
    if StlKind::from_template_name(outer) != Some(stl) {
        return None;
    }
    let inner = if stl.is_map() {
        let args = names::template_args(args);
        if args.len() < 2 {
            return None;
        }
        args[0]
    } else {
        args
    };
    Some((element.stl_ctype, inner))
}

fn schema_from_info(graph: &ObjectGraph, info: &Object) -> Result<ClassSchema> {
    let class_name = str_field(info, "fName").to_string();
    let version = int_field(info, "fClassVersion") as u32 as i32;
    let checksum = int_field(info, "fCheckSum") as u32;

    let mut schema = ClassSchema::new(class_name, version).with_checksum(checksum);

    let elements: &[Value] = match info.get("fElements").map(|v| graph.resolve(v)) {
        Some(Value::Object(list)) => list.get("arr").and_then(Value::as_array).unwrap_or(&[]),
        Some(Value::Null) | None => &[],
        Some(other) => {
            return Err(Error::malformed(format!(
                "fElements of '{}' is a {}",
                schema.class_name,
                other.type_name()
            )))
        }
    };

    for item in elements {
        match graph.resolve(item).as_object() {
            Some(obj) => schema.elements.push(element_from_record(obj)),
            None => warn!(
                class = schema.class_name.as_str(),
                "Skipping schema element that did not decode to an object"
            ),
        }
    }
    Ok(schema)
}

fn element_from_record(obj: &Object) -> StreamerElement {
    let mut max_index = [0u32; 5];
    if let Some(values) = obj.get("fMaxIndex").and_then(Value::as_array) {
        for (slot, v) in max_index.iter_mut().zip(values) {
            *slot = v.as_u64().unwrap_or(0) as u32;
        }
    }

    StreamerElement {
        name: str_field(obj, "fName").to_string(),
        title: str_field(obj, "fTitle").to_string(),
        type_code: int_field(obj, "fType") as i32,
        type_name: str_field(obj, "fTypeName").to_string(),
        size: int_field(obj, "fSize") as u32,
        array_length: int_field(obj, "fArrayLength") as u32,
        array_dim: int_field(obj, "fArrayDim") as u32,
        max_index,
        xmin: float_field(obj, "fXmin"),
        xmax: float_field(obj, "fXmax"),
        factor: float_field(obj, "fFactor"),
        base_version: obj.get("fBaseVersion").and_then(Value::as_u64).map(|v| v as u32),
        count_name: obj.get("fCountName").and_then(Value::as_str).map(str::to_string),
        count_class: obj.get("fCountClass").and_then(Value::as_str).map(str::to_string),
        count_version: obj
            .get("fCountVersion")
            .and_then(Value::as_u64)
            .map(|v| v as u32),
        stl_kind: obj
            .get("fSTLtype")
            .and_then(Value::as_i64)
            .and_then(|v| StlKind::from_code(v as i32)),
        stl_ctype: int_field(obj, "fCtype") as i32,
        record_class: obj.class_name().to_string(),
    }
}

fn str_field<'a>(obj: &'a Object, name: &str) -> &'a str {
    obj.get(name).and_then(Value::as_str).unwrap_or("")
}

fn int_field(obj: &Object, name: &str) -> i64 {
    obj.get(name).and_then(Value::as_i64).unwrap_or(0)
}

fn float_field(obj: &Object, name: &str) -> f64 {
    obj.get(name).and_then(Value::as_f64).unwrap_or(0.0)
}
