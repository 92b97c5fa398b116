//! Versioned object decoder
//!
//! Interprets record bytes using the layouts in a [`SchemaRegistry`].
//! One call to [`VersionedObjectDecoder::decode_top`] decodes one record
//! into an [`ObjectGraph`]; everything it creates lives in a per-call
//! [`DecodeContext`], so a decoder is freely shared and reentrant.
//!
//! # Object decode
//!
//! ```text
//!   stream_class_into(class)
//!     ├─ custom streamer registered?  ──► envelope? + function
//!     └─ envelope ─► lookup(class, version, checksum)
//!                 ─► read_member(e) for e in layout
//!                 ─► finish: skip short reads, reject overruns
//! ```
//!
//! Pointer members go through [`VersionedObjectDecoder::read_object_any`],
//! which resolves reference tags through the context's reference table.

use crate::context::DecodeContext;
use crate::custom::{CustomStreamers, Framing};
use crate::envelope::Envelope;
use crate::options::DecodeOptions;
use crate::refs::NULL_TAG;
use rootio_codec::framing::{BYTE_COUNT_MASK, CLASS_MASK, NEW_CLASS_TAG, TOP_LEVEL_TAG};
use rootio_core::{Error, Object, ObjectGraph, Result, Value};
use rootio_schema::names::{self, ArrayKind};
use rootio_schema::{BasicType, FloatPacking, SchemaRegistry};

/// Upper bound on speculative preallocation for counts read from data
pub(crate) const PREALLOC_LIMIT: usize = 4096;

/// Decoder bound to a schema registry and a set of custom streamers
#[derive(Debug, Clone, Copy)]
pub struct VersionedObjectDecoder<'r> {
    registry: &'r SchemaRegistry,
    customs: &'r CustomStreamers,
    options: DecodeOptions,
}

impl<'r> VersionedObjectDecoder<'r> {
    /// Decoder using the built-in custom streamers and default options
    pub fn new(registry: &'r SchemaRegistry) -> Self {
        VersionedObjectDecoder {
            registry,
            customs: CustomStreamers::builtin(),
            options: DecodeOptions::default(),
        }
    }

    /// Use a different custom streamer set
    pub fn with_customs(mut self, customs: &'r CustomStreamers) -> Self {
        self.customs = customs;
        self
    }

    /// Use different limits
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Registry layouts are resolved against
    pub fn registry(&self) -> &'r SchemaRegistry {
        self.registry
    }

    /// Active limits
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode the object of class `class_name` at the start of `buf`.
    ///
    /// The object is registered under the top-level tag before decoding,
    /// so members pointing back at it resolve to the root.
    ///
    /// # Errors
    ///
    /// Any decode error, annotated with the class and offset of the
    /// innermost object being decoded. No partial graph is returned.
    pub fn decode_top(&self, buf: &[u8], class_name: &str, tag_offset: u32) -> Result<ObjectGraph> {
        let mut ctx = DecodeContext::new(buf, tag_offset);
        let root = ctx.refs.reserve(TOP_LEVEL_TAG)?;
        let value = self.read_class_value(&mut ctx, class_name)?;
        ctx.refs.fill(root, value);
        Ok(ctx.refs.into_graph(root))
    }

    /// Decode a new object of `class_name` at the cursor
    pub fn decode_object(&self, ctx: &mut DecodeContext<'_>, class_name: &str) -> Result<Value> {
        let mut obj = Object::new(class_name);
        self.stream_class_into(ctx, &mut obj, class_name)?;
        Ok(Value::Object(obj))
    }

    /// Read a value of a class that may be one of the string or numeric
    /// array classes, which are stored without an envelope
    pub fn read_class_value(&self, ctx: &mut DecodeContext<'_>, class_name: &str) -> Result<Value> {
        match names::array_kind(class_name) {
            ArrayKind::String => Ok(Value::String(ctx.cursor.read_tstring()?)),
            ArrayKind::Numeric(ty) => self.read_counted_fast_array(ctx, ty),
            ArrayKind::NotArray => self.decode_object(ctx, class_name),
        }
    }

    /// Decode the members of `class_name` into an existing object.
    ///
    /// Base classes use this to add their members to the derived object.
    pub fn stream_class_into(
        &self,
        ctx: &mut DecodeContext<'_>,
        obj: &mut Object,
        class_name: &str,
    ) -> Result<()> {
        let start = ctx.cursor.position();
        ctx.enter(self.options.max_depth)
            .map_err(|e| e.in_class(class_name, start))?;
        let result = self.stream_class_members(ctx, obj, class_name);
        ctx.leave();
        result.map_err(|e| e.in_class(class_name, start))
    }

    fn stream_class_members(
        &self,
        ctx: &mut DecodeContext<'_>,
        obj: &mut Object,
        class_name: &str,
    ) -> Result<()> {
        if let Some(custom) = self.customs.get(class_name) {
            return match custom.framing {
                Framing::Direct => (custom.func)(self, ctx, obj, 0),
                Framing::Versioned => {
                    let env = Envelope::read(&mut ctx.cursor, self.registry)?;
                    (custom.func)(self, ctx, obj, env.version)?;
                    env.finish(&mut ctx.cursor, class_name)
                }
            };
        }

        let env = Envelope::read(&mut ctx.cursor, self.registry)?;
        let version = i32::from(env.version);
        let resolved = self.registry.lookup(
            class_name,
            version,
            env.checksum,
            self.options.allow_version_fallback,
        )?;
        if resolved.schema.is_custom() {
            return Err(Error::unknown_schema(class_name, version));
        }

        for element in &resolved.schema.elements {
            self.read_member(ctx, obj, element)?;
        }
        env.finish(&mut ctx.cursor, class_name)
    }

    /// Read a pointer: null, a reference to an earlier (or later) object, or
    /// a new object announced by class.
    ///
    /// ```text
    /// [tag]                                  tag 0 = null, else object reference
    /// [count|mask][NEW_CLASS_TAG][name\0]…   new class, object follows
    /// [count|mask][class tag|CLASS_MASK]…    known class, object follows
    /// ```
    ///
    /// Objects come back as [`Value::Ref`]; string classes come back
    /// inline.
    pub fn read_object_any(&self, ctx: &mut DecodeContext<'_>) -> Result<Value> {
        let frame_start = ctx.cursor.position();
        let object_tag = ctx.tag_at(frame_start);

        let first = ctx.cursor.read_u32()?;
        let (tag, byte_count) = if first & BYTE_COUNT_MASK == 0 || first == NEW_CLASS_TAG {
            (first, None)
        } else {
            (ctx.cursor.read_u32()?, Some(first & !BYTE_COUNT_MASK))
        };

        if tag & CLASS_MASK == 0 {
            if tag == NULL_TAG {
                return Ok(Value::Null);
            }
            return Ok(Value::Ref(ctx.refs.reference(tag)?));
        }

        let class_name = if tag == NEW_CLASS_TAG {
            let name = ctx.cursor.read_cstring()?;
            let class_tag = ctx.tag_at(frame_start + 4);
            ctx.refs.map_class(class_tag, &name);
            name
        } else {
            let class_tag = tag & !CLASS_MASK;
            match ctx.refs.class_for(class_tag) {
                Some(name) => name.to_string(),
                None => {
                    return Err(Error::malformed(format!(
                        "reference to unknown class tag {class_tag} at offset {frame_start}"
                    )))
                }
            }
        };

        let value = match names::array_kind(&class_name) {
            ArrayKind::String => Value::String(ctx.cursor.read_tstring()?),
            ArrayKind::Numeric(ty) => {
                let array = self.read_counted_fast_array(ctx, ty)?;
                Value::Ref(ctx.refs.put(object_tag, array)?)
            }
            ArrayKind::NotArray => {
                let id = ctx.refs.reserve(object_tag)?;
                let decoded = self.decode_object(ctx, &class_name)?;
                ctx.refs.fill(id, decoded);
                Value::Ref(id)
            }
        };

        if let Some(count) = byte_count {
            let frame = Envelope {
                start: frame_start,
                version: 0,
                byte_count: Some(count),
                checksum: None,
            };
            frame
                .finish(&mut ctx.cursor, &class_name)
                .map_err(|e| e.in_class(&class_name, frame_start))?;
        }
        Ok(value)
    }

    /// Read a nested array of `dims` (outermost first), calling `read_one`
    /// for every innermost item. No dimensions reads a single item.
    pub fn read_ndim<'a, F>(
        &self,
        ctx: &mut DecodeContext<'a>,
        dims: &[usize],
        mut read_one: F,
    ) -> Result<Value>
    where
        F: FnMut(&mut DecodeContext<'a>) -> Result<Value>,
    {
        self.read_ndim_level(ctx, dims, &mut read_one)
    }

    fn read_ndim_level<'a, F>(
        &self,
        ctx: &mut DecodeContext<'a>,
        dims: &[usize],
        read_one: &mut F,
    ) -> Result<Value>
    where
        F: FnMut(&mut DecodeContext<'a>) -> Result<Value>,
    {
        match dims.split_first() {
            None => read_one(ctx),
            Some((&n, rest)) => {
                let n = self.options.check_len(n as i64, "array dimension")?;
                let mut items = Vec::with_capacity(n.min(PREALLOC_LIMIT));
                for _ in 0..n {
                    items.push(self.read_ndim_level(ctx, rest, read_one)?);
                }
                Ok(Value::Array(items))
            }
        }
    }

    /// Read one scalar of a basic type.
    ///
    /// `Double32` reads as a plain single and `Float16` as a 12-bit
    /// truncated float; members with packing metadata go through
    /// [`VersionedObjectDecoder::read_packed`] instead.
    pub fn read_basic(&self, ctx: &mut DecodeContext<'_>, ty: BasicType) -> Result<Value> {
        let c = &mut ctx.cursor;
        Ok(match ty {
            BasicType::Char => Value::Int(i64::from(c.read_i8()?)),
            BasicType::Short => Value::Int(i64::from(c.read_i16()?)),
            BasicType::Int | BasicType::Counter => Value::Int(i64::from(c.read_i32()?)),
            BasicType::Long | BasicType::Long64 => Value::Int(c.read_i64()?),
            BasicType::UChar | BasicType::LegacyChar => Value::UInt(u64::from(c.read_u8()?)),
            BasicType::UShort => Value::UInt(u64::from(c.read_u16()?)),
            BasicType::UInt | BasicType::Bits => Value::UInt(u64::from(c.read_u32()?)),
            BasicType::ULong | BasicType::ULong64 => Value::UInt(c.read_u64()?),
            BasicType::Float => Value::Float(c.read_f32()?),
            BasicType::Double => Value::Double(c.read_f64()?),
            BasicType::Bool => Value::Bool(c.read_bool()?),
            BasicType::CharStar => {
                let len = c.read_i32()?;
                if len < 0 {
                    return Err(Error::malformed(format!("negative string length {len}")));
                }
                let bytes = c.extract_range(len as usize)?;
                Value::String(String::from_utf8_lossy(bytes).into_owned())
            }
            BasicType::Double32 => Value::Double(f64::from(c.read_f32()?)),
            BasicType::Float16 => {
                return self.read_packed(ctx, FloatPacking::Truncated { nbits: 12 }, ty)
            }
        })
    }

    /// Read one reduced-precision float
    pub fn read_packed(
        &self,
        ctx: &mut DecodeContext<'_>,
        packing: FloatPacking,
        ty: BasicType,
    ) -> Result<Value> {
        let c = &mut ctx.cursor;
        let v = match packing {
            FloatPacking::Scaled { scale, min } => f64::from(c.read_u32()?) * scale + min,
            FloatPacking::PlainFloat => f64::from(c.read_f32()?),
            FloatPacking::Truncated { nbits } => {
                let exponent = c.read_u8()?;
                let mantissa = c.read_u16()?;
                f64::from(FloatPacking::unpack_truncated(exponent, mantissa, nbits))
            }
        };
        Ok(match ty {
            BasicType::Double32 => Value::Double(v),
            _ => Value::Float(v as f32),
        })
    }

    /// Read `n` consecutive scalars
    pub fn read_fast_array(
        &self,
        ctx: &mut DecodeContext<'_>,
        n: usize,
        ty: BasicType,
    ) -> Result<Value> {
        let n = self.options.check_len(n as i64, ty.name())?;
        let mut items = Vec::with_capacity(n.min(PREALLOC_LIMIT));
        for _ in 0..n {
            items.push(self.read_basic(ctx, ty)?);
        }
        Ok(Value::Array(items))
    }

    /// Read a u32 count then that many scalars
    pub fn read_counted_fast_array(
        &self,
        ctx: &mut DecodeContext<'_>,
        ty: BasicType,
    ) -> Result<Value> {
        let n = ctx.cursor.read_u32()?;
        self.read_fast_array(ctx, n as usize, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootio_codec::testing::ByteWriter;
    use rootio_core::ErrorKind;
    use rootio_schema::{ClassSchema, StreamerElement};

    fn registry_with_point() -> SchemaRegistry {
        let registry = SchemaRegistry::new();
        registry.register(
            ClassSchema::new("Point", 1)
                .with_element(StreamerElement::basic("fX", BasicType::Int))
                .with_element(StreamerElement::basic("fY", BasicType::Int)),
        );
        registry
    }

    #[test]
    fn test_decode_flat_object() {
        let registry = registry_with_point();
        let mut w = ByteWriter::new();
        w.begin_envelope(1);
        w.put_i32(-3).put_i32(4);
        w.end_frame();
        let bytes = w.into_bytes();

        let graph = VersionedObjectDecoder::new(&registry)
            .decode_top(&bytes, "Point", 0)
            .unwrap();
        let root = graph.root_object().unwrap();
        assert_eq!(root.class_name(), "Point");
        assert_eq!(root.get("fX"), Some(&Value::Int(-3)));
        assert_eq!(root.get("fY"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_unknown_class_fails_with_context() {
        let registry = SchemaRegistry::new();
        let mut w = ByteWriter::new();
        w.begin_envelope(1);
        w.end_frame();
        let bytes = w.into_bytes();

        let err = VersionedObjectDecoder::new(&registry)
            .decode_top(&bytes, "Missing", 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSchema);
        assert_eq!(err.decode_context(), Some(("Missing", 0)));
    }

    #[test]
    fn test_custom_marker_without_streamer_is_unknown() {
        let registry = SchemaRegistry::new();
        registry.register(ClassSchema::custom("TOpaque"));
        let mut w = ByteWriter::new();
        w.begin_envelope(-1);
        w.end_frame();
        let bytes = w.into_bytes();

        let err = VersionedObjectDecoder::new(&registry)
            .decode_top(&bytes, "TOpaque", 0)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSchema);
    }

    #[test]
    fn test_read_object_any_null_and_forward_ref() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry);
        let mut w = ByteWriter::new();
        w.put_object_ref(0).put_object_ref(77).put_object_ref(77);
        let bytes = w.into_bytes();

        let mut ctx = DecodeContext::new(&bytes, 0);
        assert_eq!(decoder.read_object_any(&mut ctx).unwrap(), Value::Null);
        let a = decoder.read_object_any(&mut ctx).unwrap();
        let b = decoder.read_object_any(&mut ctx).unwrap();
        assert!(a.is_ref());
        assert_eq!(a, b);
        assert_eq!(ctx.refs.dangling_tags(), vec![77]);
    }

    #[test]
    fn test_read_object_any_numeric_array_is_mapped() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry);
        let mut w = ByteWriter::new();
        let start = w.begin_new_class_object("TArrayD");
        w.put_u32(2).put_f64(1.5).put_f64(-2.0);
        w.end_frame();
        w.put_object_ref(ByteWriter::object_tag(0, start));
        let bytes = w.into_bytes();

        let mut ctx = DecodeContext::new(&bytes, 0);
        let first = decoder.read_object_any(&mut ctx).unwrap();
        let again = decoder.read_object_any(&mut ctx).unwrap();
        assert_eq!(first, again);
        let tag = ByteWriter::object_tag(0, start);
        assert_eq!(
            ctx.refs.get(tag),
            Some(&Value::Array(vec![Value::Double(1.5), Value::Double(-2.0)]))
        );
    }

    #[test]
    fn test_unknown_class_tag_is_malformed() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry);
        let mut w = ByteWriter::new();
        w.begin_known_class_object(1234);
        w.end_frame();
        let bytes = w.into_bytes();

        let mut ctx = DecodeContext::new(&bytes, 0);
        let err = decoder.read_object_any(&mut ctx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_read_basic_widths_and_signs() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry);
        let mut w = ByteWriter::new();
        w.put_i8(-1)
            .put_u8(255)
            .put_u16(65535)
            .put_i64(-9)
            .put_u64(u64::MAX)
            .put_bool(true)
            .put_i32(3)
            .put_bytes(b"abc");
        let bytes = w.into_bytes();

        let mut ctx = DecodeContext::new(&bytes, 0);
        let mut read = |ty| decoder.read_basic(&mut ctx, ty).unwrap();
        assert_eq!(read(BasicType::Char), Value::Int(-1));
        assert_eq!(read(BasicType::UChar), Value::UInt(255));
        assert_eq!(read(BasicType::UShort), Value::UInt(65535));
        assert_eq!(read(BasicType::Long64), Value::Int(-9));
        assert_eq!(read(BasicType::ULong64), Value::UInt(u64::MAX));
        assert_eq!(read(BasicType::Bool), Value::Bool(true));
        assert_eq!(read(BasicType::CharStar), Value::from("abc"));
    }

    #[test]
    fn test_read_packed_scaled() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry);
        let mut w = ByteWriter::new();
        w.put_u32(10);
        let bytes = w.into_bytes();

        let mut ctx = DecodeContext::new(&bytes, 0);
        let v = decoder
            .read_packed(
                &mut ctx,
                FloatPacking::Scaled {
                    scale: 0.5,
                    min: 1.0,
                },
                BasicType::Double32,
            )
            .unwrap();
        assert_eq!(v, Value::Double(6.0));
    }

    #[test]
    fn test_read_ndim_shapes() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry);
        let mut w = ByteWriter::new();
        for i in 0..6 {
            w.put_i16(i);
        }
        let bytes = w.into_bytes();

        let mut ctx = DecodeContext::new(&bytes, 0);
        let v = decoder
            .read_ndim(&mut ctx, &[2, 3], |ctx| {
                decoder.read_basic(ctx, BasicType::Short)
            })
            .unwrap();
        let rows = v.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            Value::Array(vec![Value::Int(3), Value::Int(4), Value::Int(5)])
        );
    }

    #[test]
    fn test_collection_limit() {
        let registry = SchemaRegistry::new();
        let decoder = VersionedObjectDecoder::new(&registry)
            .with_options(DecodeOptions::default().with_max_collection_len(4));
        let mut w = ByteWriter::new();
        w.put_u32(5);
        let bytes = w.into_bytes();

        let mut ctx = DecodeContext::new(&bytes, 0);
        let err = decoder
            .read_counted_fast_array(&mut ctx, BasicType::Int)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }
}
