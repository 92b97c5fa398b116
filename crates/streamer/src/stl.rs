//! Container members.
//!
//! A container member is framed by an envelope. Bit 14 of the envelope
//! version switches to member-wise streaming, in which case a second
//! version (and, for versions `<= 0`, a layout checksum) names the layout
//! of the contained class:
//!
//! ```text
//! object-wise:  [env] n  item item item ...
//! member-wise:  [env|0x4000][ver][checksum]?  n  m1 m1 m1  m2 m2 m2 ...
//! ```
//!
//! The shape of each item is worked out once per member as a
//! [`ContainerPlan`].

use crate::context::DecodeContext;
use crate::decoder::{VersionedObjectDecoder, PREALLOC_LIMIT};
use crate::envelope::Envelope;
use rootio_codec::framing::{IS_REFERENCED_BIT, MEMBER_WISE_BIT};
use rootio_core::{Error, Object, Result, Value};
use rootio_schema::names::{self, ArrayKind};
use rootio_schema::{BasicType, ObjectKind, StlKind, StreamerElement, TypeKind};
use tracing::debug;

/// Layout version written ahead of member-wise data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StlVersion {
    /// Class version of the contained type
    pub version: i16,
    /// Layout checksum, written when `version <= 0`
    pub checksum: Option<u32>,
}

/// How one item of a sequence container is read
#[derive(Debug, Clone, PartialEq)]
pub enum ItemRead {
    /// `TArray*` class: u32 count then scalars
    Numeric(BasicType),
    /// String class
    String,
    /// Pointer to an object
    Pointer,
    /// Container inside a container, read without its own envelope
    Nested(Box<ContainerPlan>),
    /// Object by value
    Object,
}

/// Shape of a container member
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerPlan {
    /// `std::string`
    String,
    /// Sequence of a basic type: i32 count then scalars
    Basic(BasicType),
    /// Sequence of objects, strings, pointers or nested containers
    Sequence {
        /// Contained class, pointer star stripped
        content: String,
        /// How each item is read
        item: ItemRead,
    },
    /// `map`/`multimap`, read as a list of `pair<K,V>` objects
    Map {
        /// Pair class name
        pair_type: String,
    },
    /// `bitset`: u32 count then bools
    Bitset,
}

impl ContainerPlan {
    /// Work out how to read a container element.
    ///
    /// # Errors
    ///
    /// `UnsupportedTypeKind` when the element names no container family
    /// this reader understands.
    pub fn for_element(
        element: &StreamerElement,
        decoder: &VersionedObjectDecoder<'_>,
    ) -> Result<Self> {
        let type_name = element.type_name.as_str();
        if element.record_class == "TStreamerSTLstring"
            || element.kind() == Some(TypeKind::StlString)
            || matches!(type_name, "string" | "string*" | "std::string")
        {
            return Ok(ContainerPlan::String);
        }

        let stl = element.stl_kind.or_else(|| {
            names::split_template(type_name).and_then(|(outer, _)| StlKind::from_template_name(outer))
        });
        match stl {
            Some(stl) if stl.is_sequence() => Self::sequence(element, decoder),
            Some(stl) if stl.is_map() => {
                let pair_type = names::pair_type_for_map(type_name).ok_or_else(|| {
                    Error::malformed(format!("map type without arguments: {type_name}"))
                })?;
                let pair = decoder.registry().pair_schema(&pair_type)?;
                if pair.elements.len() != 2 {
                    return Err(Error::malformed(format!(
                        "layout of '{}' has {} members, expected 2",
                        pair_type,
                        pair.elements.len()
                    )));
                }
                Ok(ContainerPlan::Map { pair_type })
            }
            Some(StlKind::Bitset) => Ok(ContainerPlan::Bitset),
            _ => Err(Error::unsupported_kind(element.type_code, &element.name)),
        }
    }

    fn sequence(element: &StreamerElement, decoder: &VersionedObjectDecoder<'_>) -> Result<Self> {
        let registry = decoder.registry();
        let content = match names::split_template(&element.type_name) {
            Some((_, args)) => args,
            None => return Err(Error::unsupported_kind(element.type_code, &element.name)),
        };

        let mut basic = registry.basic_type_of(content);
        if element.stl_ctype > 0 && element.stl_ctype < 20 {
            let declared = BasicType::from_code(element.stl_ctype);
            if declared.is_some() && declared != basic {
                debug!(
                    member = element.name.as_str(),
                    content,
                    ctype = element.stl_ctype,
                    "Using declared basic content type of container"
                );
                basic = declared;
            }
        }
        if let Some(ty) = basic {
            return Ok(ContainerPlan::Basic(ty));
        }

        let (bare, mut is_pointer) = names::strip_pointer(content);
        if element.stl_ctype == ObjectKind::Objectp.code() {
            is_pointer = true;
        }
        let item = match names::array_kind(bare) {
            ArrayKind::Numeric(ty) => ItemRead::Numeric(ty),
            ArrayKind::String => ItemRead::String,
            ArrayKind::NotArray if is_pointer => ItemRead::Pointer,
            ArrayKind::NotArray => {
                let sub = StreamerElement::from_type_name("temp", bare, |n| registry.basic_alias(n));
                if sub.kind().map(TypeKind::is_container).unwrap_or(false) {
                    ItemRead::Nested(Box::new(Self::for_element(&sub, decoder)?))
                } else {
                    ItemRead::Object
                }
            }
        };
        Ok(ContainerPlan::Sequence {
            content: bare.to_string(),
            item,
        })
    }
}

impl<'r> VersionedObjectDecoder<'r> {
    /// Decode a container member: envelope, items, length check
    pub(crate) fn read_container_member(
        &self,
        ctx: &mut DecodeContext<'_>,
        element: &StreamerElement,
    ) -> Result<Value> {
        let plan = ContainerPlan::for_element(element, self)?;
        let (env, stl) = self.read_container_envelope(ctx)?;
        let value = self.read_ndim(ctx, &element.dims(), |ctx| {
            self.read_container_body(ctx, &plan, stl)
        })?;
        env.finish(&mut ctx.cursor, &element.type_name)?;
        Ok(value)
    }

    fn read_container_envelope(
        &self,
        ctx: &mut DecodeContext<'_>,
    ) -> Result<(Envelope, Option<StlVersion>)> {
        let mut env = Envelope::read(&mut ctx.cursor, self.registry())?;
        if env.version & MEMBER_WISE_BIT == 0 {
            return Ok((env, None));
        }
        env.version &= !MEMBER_WISE_BIT;
        let version = ctx.cursor.read_i16()?;
        let checksum = if version <= 0 {
            Some(ctx.cursor.read_u32()?)
        } else {
            None
        };
        Ok((env, Some(StlVersion { version, checksum })))
    }

    /// Decode one container's items (no envelope)
    pub fn read_container_body(
        &self,
        ctx: &mut DecodeContext<'_>,
        plan: &ContainerPlan,
        stl: Option<StlVersion>,
    ) -> Result<Value> {
        match plan {
            ContainerPlan::String => Ok(Value::String(ctx.cursor.read_tstring()?)),
            ContainerPlan::Basic(ty) => {
                let n = ctx.cursor.read_i32()?;
                let n = self.options().check_len(i64::from(n), ty.name())?;
                self.read_fast_array(ctx, n, *ty)
            }
            ContainerPlan::Bitset => {
                let n = ctx.cursor.read_u32()?;
                self.read_fast_array(ctx, n as usize, BasicType::Bool)
            }
            ContainerPlan::Sequence { content, item } => match stl {
                Some(stl) => self.read_member_wise_sequence(ctx, content, stl),
                None => self.read_sequence(ctx, content, item),
            },
            ContainerPlan::Map { pair_type } => self.read_map(ctx, pair_type, stl),
        }
    }

    fn read_sequence(
        &self,
        ctx: &mut DecodeContext<'_>,
        content: &str,
        item: &ItemRead,
    ) -> Result<Value> {
        let n = ctx.cursor.read_u32()?;
        let n = self.options().check_len(i64::from(n), content)?;
        let mut items = Vec::with_capacity(n.min(PREALLOC_LIMIT));
        for _ in 0..n {
            let value = match item {
                ItemRead::Numeric(ty) => self.read_counted_fast_array(ctx, *ty)?,
                ItemRead::String => Value::String(ctx.cursor.read_tstring()?),
                ItemRead::Pointer => self.read_object_any(ctx)?,
                ItemRead::Nested(plan) => self.read_container_body(ctx, plan, None)?,
                ItemRead::Object => self.decode_object(ctx, content)?,
            };
            items.push(value);
        }
        Ok(Value::Array(items))
    }

    fn read_member_wise_sequence(
        &self,
        ctx: &mut DecodeContext<'_>,
        content: &str,
        stl: StlVersion,
    ) -> Result<Value> {
        let n = ctx.cursor.read_u32()?;
        if n == 0 {
            return Ok(Value::Array(Vec::new()));
        }
        let n = self.options().check_len(i64::from(n), content)?;

        let resolved = self.registry().lookup(
            content,
            i32::from(stl.version),
            stl.checksum,
            self.options().allow_version_fallback,
        )?;
        let members = self.registry().expand_schema(&resolved.schema)?;
        let mut objects: Vec<Object> = (0..n).map(|_| Object::new(content)).collect();
        self.read_split_members(ctx, &mut objects, &members, true)?;
        Ok(Value::Array(objects.into_iter().map(Value::Object).collect()))
    }

    /// Read `objects` member by member: every object's first member, then
    /// every object's second member, and so on.
    ///
    /// With `split_containers`, a container member is framed once for all
    /// objects rather than once per object.
    pub fn read_split_members(
        &self,
        ctx: &mut DecodeContext<'_>,
        objects: &mut [Object],
        members: &[StreamerElement],
        split_containers: bool,
    ) -> Result<()> {
        for element in members {
            if element.is_base() && element.name == "TObject" {
                for obj in objects.iter_mut() {
                    read_split_tobject(ctx, obj)?;
                }
                continue;
            }

            let is_container = element.kind().map(TypeKind::is_container).unwrap_or(false);
            if split_containers && is_container {
                let plan = ContainerPlan::for_element(element, self)?;
                let (env, stl) = self.read_container_envelope(ctx)?;
                for obj in objects.iter_mut() {
                    let value = self.read_ndim(ctx, &element.dims(), |ctx| {
                        self.read_container_body(ctx, &plan, stl)
                    })?;
                    obj.set(element.name.clone(), value);
                }
                env.finish(&mut ctx.cursor, &element.type_name)?;
                continue;
            }

            for obj in objects.iter_mut() {
                self.read_member(ctx, obj, element)?;
            }
        }
        Ok(())
    }

    fn read_map(
        &self,
        ctx: &mut DecodeContext<'_>,
        pair_type: &str,
        stl: Option<StlVersion>,
    ) -> Result<Value> {
        let registry = self.registry();
        let mut schema = registry.pair_schema(pair_type)?;
        if let Some(stl) = stl {
            if let Ok(found) = registry.lookup(
                pair_type,
                i32::from(stl.version),
                stl.checksum,
                self.options().allow_version_fallback,
            ) {
                schema = found.schema;
            }
        }
        let (first, second) = match schema.elements.as_slice() {
            [first, second] => (first, second),
            other => {
                return Err(Error::malformed(format!(
                    "layout of '{}' has {} members, expected 2",
                    pair_type,
                    other.len()
                )))
            }
        };

        let n = ctx.cursor.read_i32()?;
        if n == 0 {
            return Ok(Value::Array(Vec::new()));
        }
        let n = self.options().check_len(i64::from(n), pair_type)?;
        let member_wise = stl.is_some();

        if member_wise {
            skip_member_wise_marker(ctx)?;
        }
        let mut pairs = Vec::with_capacity(n.min(PREALLOC_LIMIT));
        for _ in 0..n {
            let mut pair = Object::new(pair_type);
            self.read_pair_member(ctx, &mut pair, first)?;
            if !member_wise {
                self.read_pair_member(ctx, &mut pair, second)?;
            }
            pairs.push(pair);
        }
        if member_wise {
            skip_member_wise_marker(ctx)?;
            for pair in pairs.iter_mut() {
                self.read_pair_member(ctx, pair, second)?;
            }
        }
        Ok(Value::Array(pairs.into_iter().map(Value::Object).collect()))
    }

    /// Containers inside a pair carry no envelope of their own
    fn read_pair_member(
        &self,
        ctx: &mut DecodeContext<'_>,
        pair: &mut Object,
        element: &StreamerElement,
    ) -> Result<()> {
        if element.kind().map(TypeKind::is_container).unwrap_or(false) {
            let plan = ContainerPlan::for_element(element, self)?;
            let value = self.read_container_body(ctx, &plan, None)?;
            pair.set(element.name.clone(), value);
            return Ok(());
        }
        self.read_member(ctx, pair, element)
    }
}

/// Member-wise map halves may be preceded by a version with the member-wise
/// bit and a checksum; skip them when present
fn skip_member_wise_marker(ctx: &mut DecodeContext<'_>) -> Result<()> {
    if ctx.cursor.remaining() >= 6 && ctx.cursor.peek_i16()? == MEMBER_WISE_BIT {
        ctx.cursor.skip(6)?;
    }
    Ok(())
}

/// `TObject` part of a member-wise object: version, id, bits, optional pid
fn read_split_tobject(ctx: &mut DecodeContext<'_>, obj: &mut Object) -> Result<()> {
    let _version = ctx.cursor.read_i16()?;
    let unique_id = ctx.cursor.read_u32()?;
    let bits = ctx.cursor.read_u32()?;
    if bits & IS_REFERENCED_BIT != 0 {
        ctx.cursor.skip(2)?;
    }
    obj.set("fUniqueID", Value::UInt(u64::from(unique_id)));
    obj.set("fBits", Value::UInt(u64::from(bits)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootio_codec::testing::ByteWriter;
    use rootio_core::ErrorKind;
    use rootio_schema::{ClassSchema, SchemaRegistry};

    fn decode_member(
        registry: &SchemaRegistry,
        bytes: &[u8],
        element: &StreamerElement,
    ) -> Result<Value> {
        let decoder = VersionedObjectDecoder::new(registry);
        let mut ctx = DecodeContext::new(bytes, 0);
        let mut obj = Object::new("Holder");
        decoder.read_member(&mut ctx, &mut obj, element)?;
        assert_eq!(ctx.cursor.remaining(), 0);
        Ok(obj.get(&element.name).cloned().unwrap_or(Value::Null))
    }

    #[test]
    fn test_plan_basic_and_declared_ctype() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry);
        let e = StreamerElement::stl("fV", "vector<double>", StlKind::Vector, 8);
        assert_eq!(
            ContainerPlan::for_element(&e, &decoder).unwrap(),
            ContainerPlan::Basic(BasicType::Double)
        );

        let e = StreamerElement::stl("fE", "vector<EColor>", StlKind::Vector, 3);
        assert_eq!(
            ContainerPlan::for_element(&e, &decoder).unwrap(),
            ContainerPlan::Basic(BasicType::Int)
        );
    }

    #[test]
    fn test_plan_items() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry);
        let plan = |t: &str| {
            ContainerPlan::for_element(&StreamerElement::stl("f", t, StlKind::Vector, 61), &decoder)
                .unwrap()
        };
        assert!(matches!(
            plan("vector<TNamed*>"),
            ContainerPlan::Sequence { item: ItemRead::Pointer, .. }
        ));
        assert!(matches!(
            plan("vector<TString>"),
            ContainerPlan::Sequence { item: ItemRead::String, .. }
        ));
        assert!(matches!(
            plan("vector<TArrayF>"),
            ContainerPlan::Sequence { item: ItemRead::Numeric(BasicType::Float), .. }
        ));
        assert!(matches!(
            plan("vector<vector<int> >"),
            ContainerPlan::Sequence { item: ItemRead::Nested(_), .. }
        ));
        assert!(matches!(
            plan("vector<Hit>"),
            ContainerPlan::Sequence { item: ItemRead::Object, .. }
        ));
    }

    #[test]
    fn test_plan_unknown_family() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry);
        let e = StreamerElement::new("fX", TypeKind::Streamer, "TCustomBlob");
        let err = ContainerPlan::for_element(&e, &decoder).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedTypeKind);
    }

    #[test]
    fn test_vector_of_int() {
        let element = StreamerElement::stl("fV", "vector<int>", StlKind::Vector, 3);
        let mut w = ByteWriter::new();
        w.begin_envelope(6);
        w.put_i32(3).put_i32(1).put_i32(2).put_i32(3);
        w.end_frame();
        let bytes = w.into_bytes();

        let v = decode_member(&SchemaRegistry::new(), &bytes, &element).unwrap();
        assert_eq!(
            v,
            Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_nested_vector_has_no_inner_envelope() {
        let element = StreamerElement::stl("fVV", "vector<vector<float> >", StlKind::Vector, 61);
        let mut w = ByteWriter::new();
        w.begin_envelope(6);
        w.put_u32(2);
        w.put_i32(1).put_f32(0.5);
        w.put_i32(0);
        w.end_frame();
        let bytes = w.into_bytes();

        let v = decode_member(&SchemaRegistry::new(), &bytes, &element).unwrap();
        assert_eq!(
            v,
            Value::Array(vec![
                Value::Array(vec![Value::Float(0.5)]),
                Value::Array(Vec::new()),
            ])
        );
    }

    #[test]
    fn test_map_with_synthesized_pair() {
        let element = StreamerElement::stl("fM", "map<int,double>", StlKind::Map, 61);
        let mut w = ByteWriter::new();
        w.begin_envelope(6);
        w.put_i32(2);
        w.put_i32(1).put_f64(0.25);
        w.put_i32(2).put_f64(0.5);
        w.end_frame();
        let bytes = w.into_bytes();

        let v = decode_member(&SchemaRegistry::new(), &bytes, &element).unwrap();
        let pairs = v.as_array().unwrap();
        assert_eq!(pairs.len(), 2);
        let second = pairs[1].as_object().unwrap();
        assert_eq!(second.class_name(), "pair<int,double>");
        assert_eq!(second.get("first"), Some(&Value::Int(2)));
        assert_eq!(second.get("second"), Some(&Value::Double(0.5)));
    }

    #[test]
    fn test_member_wise_vector_of_objects() {
        let registry = SchemaRegistry::new();
        registry.register(
            ClassSchema::new("Hit", 2)
                .with_element(StreamerElement::base("TObject", 1))
                .with_element(StreamerElement::basic("fE", BasicType::Float))
                .with_element(StreamerElement::basic("fId", BasicType::Short)),
        );
        let element = StreamerElement::stl("fHits", "vector<Hit>", StlKind::Vector, 61);

        let mut w = ByteWriter::new();
        w.begin_envelope(6 | MEMBER_WISE_BIT);
        w.put_i16(2);
        w.put_u32(2);
        for uid in [10u32, 11] {
            w.put_i16(1).put_u32(uid).put_u32(0);
        }
        w.put_f32(1.0).put_f32(2.0);
        w.put_i16(7).put_i16(8);
        w.end_frame();
        let bytes = w.into_bytes();

        let v = decode_member(&registry, &bytes, &element).unwrap();
        let hits = v.as_array().unwrap();
        assert_eq!(hits.len(), 2);
        let h1 = hits[1].as_object().unwrap();
        assert_eq!(h1.get("fUniqueID"), Some(&Value::UInt(11)));
        assert_eq!(h1.get("fE"), Some(&Value::Float(2.0)));
        assert_eq!(h1.get("fId"), Some(&Value::Int(8)));
    }

    #[test]
    fn test_bitset_and_string() {
        let bits = StreamerElement::stl("fB", "bitset<3>", StlKind::Bitset, 0);
        let mut w = ByteWriter::new();
        w.begin_envelope(2);
        w.put_u32(3).put_u8(1).put_u8(0).put_u8(1);
        w.end_frame();
        let bytes = w.into_bytes();
        let v = decode_member(&SchemaRegistry::new(), &bytes, &bits).unwrap();
        assert_eq!(
            v,
            Value::Array(vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)])
        );

        let text = StreamerElement::new("fS", TypeKind::StlString, "string");
        let mut w = ByteWriter::new();
        w.begin_envelope(2);
        w.put_tstring("hello");
        w.end_frame();
        let bytes = w.into_bytes();
        let v = decode_member(&SchemaRegistry::new(), &bytes, &text).unwrap();
        assert_eq!(v, Value::from("hello"));
    }
}
