//! Per-member dispatch.
//!
//! One exhaustive match over [`TypeKind`]. Every member either writes one
//! field into the object being decoded or, for base classes, streams the
//! base's members into the same object.

use crate::context::DecodeContext;
use crate::decoder::{VersionedObjectDecoder, PREALLOC_LIMIT};
use crate::envelope::Envelope;
use rootio_core::{Error, Object, Result, Value};
use rootio_schema::names::{self, ArrayKind};
use rootio_schema::{BasicType, ObjectKind, StreamerElement, TypeKind};

impl<'r> VersionedObjectDecoder<'r> {
    /// Decode one member into `obj`
    pub fn read_member(
        &self,
        ctx: &mut DecodeContext<'_>,
        obj: &mut Object,
        element: &StreamerElement,
    ) -> Result<()> {
        if element.is_base() {
            return self.read_base(ctx, obj, element);
        }

        let value = match element.checked_kind()? {
            TypeKind::Base => return self.read_base(ctx, obj, element),
            TypeKind::Basic(ty) if ty.is_packed_float() => {
                self.read_packed(ctx, element.packing(), ty)?
            }
            TypeKind::Basic(ty) => self.read_basic(ctx, ty)?,
            TypeKind::FixedArray(ty) => self.read_fixed_array(ctx, element, ty)?,
            TypeKind::CountedArray(ty) => self.read_counted_array(ctx, obj, element, ty)?,
            TypeKind::Object(kind) => self.read_object_member(ctx, element, kind)?,
            TypeKind::ObjectArray(kind) => self.read_object_array(ctx, element, kind)?,
            TypeKind::StlPointer => {
                return Err(Error::unsupported_kind(element.type_code, &element.name))
            }
            TypeKind::Stl | TypeKind::StlString | TypeKind::Streamer => {
                self.read_container_member(ctx, element)?
            }
            TypeKind::StreamLoop | TypeKind::StreamLoopArray => {
                self.read_stream_loop(ctx, obj, element)?
            }
        };
        obj.set(element.name.clone(), value);
        Ok(())
    }

    /// `TArray*` bases become an `fArray` member; other bases stream their
    /// own envelope into the same object
    fn read_base(
        &self,
        ctx: &mut DecodeContext<'_>,
        obj: &mut Object,
        element: &StreamerElement,
    ) -> Result<()> {
        match names::array_kind(&element.name) {
            ArrayKind::Numeric(ty) => {
                let array = self.read_counted_fast_array(ctx, ty)?;
                obj.set("fArray", array);
                Ok(())
            }
            ArrayKind::String | ArrayKind::NotArray => {
                self.stream_class_into(ctx, obj, &element.name)
            }
        }
    }

    /// `n` scalars of `ty`, honoring the element's packing
    fn read_scalars(
        &self,
        ctx: &mut DecodeContext<'_>,
        element: &StreamerElement,
        ty: BasicType,
        n: usize,
    ) -> Result<Value> {
        if !ty.is_packed_float() {
            return self.read_fast_array(ctx, n, ty);
        }
        let n = self.options().check_len(n as i64, ty.name())?;
        let packing = element.packing();
        let mut items = Vec::with_capacity(n.min(PREALLOC_LIMIT));
        for _ in 0..n {
            items.push(self.read_packed(ctx, packing, ty)?);
        }
        Ok(Value::Array(items))
    }

    fn read_fixed_array(
        &self,
        ctx: &mut DecodeContext<'_>,
        element: &StreamerElement,
        ty: BasicType,
    ) -> Result<Value> {
        let dims = element.dims();
        if dims.len() < 2 {
            let n = element.array_length as usize;
            return match ty {
                BasicType::Char => Ok(Value::String(ctx.cursor.read_fixed_string(n)?)),
                _ => self.read_scalars(ctx, element, ty, n),
            };
        }

        let (inner, outer) = match dims.split_last() {
            Some((&inner, outer)) => (inner, outer),
            None => return Ok(Value::Array(Vec::new())),
        };
        self.read_ndim(ctx, outer, |ctx| match ty {
            BasicType::Char => Ok(Value::String(ctx.cursor.read_fixed_string(inner)?)),
            _ => self.read_scalars(ctx, element, ty, inner),
        })
    }

    /// u8 presence flag, then as many values as the count member says
    fn read_counted_array(
        &self,
        ctx: &mut DecodeContext<'_>,
        obj: &Object,
        element: &StreamerElement,
        ty: BasicType,
    ) -> Result<Value> {
        let present = ctx.cursor.read_u8()? == 1;
        if !present {
            return Ok(match ty {
                BasicType::Char => Value::Null,
                t if t.is_packed_float() => Value::Null,
                _ => Value::Array(Vec::new()),
            });
        }
        let n = self.count_of(obj, element)?;
        match ty {
            BasicType::Char => Ok(Value::String(ctx.cursor.read_fixed_string(n)?)),
            _ => self.read_scalars(ctx, element, ty, n),
        }
    }

    /// Value of the element's count member, already decoded into `obj`
    fn count_of(&self, obj: &Object, element: &StreamerElement) -> Result<usize> {
        let count_name = element.count_name.as_deref().ok_or_else(|| {
            Error::malformed(format!("member '{}' has no count member", element.name))
        })?;
        let count = obj
            .get(count_name)
            .and_then(Value::as_i64)
            .ok_or_else(|| {
                Error::malformed(format!(
                    "count member '{}' of '{}' is missing or not an integer",
                    count_name, element.name
                ))
            })?;
        self.options().check_len(count, &element.name)
    }

    fn read_object_member(
        &self,
        ctx: &mut DecodeContext<'_>,
        element: &StreamerElement,
        kind: ObjectKind,
    ) -> Result<Value> {
        match kind {
            ObjectKind::ObjectP | ObjectKind::AnyP => {
                self.read_ndim(ctx, &element.dims(), |ctx| self.read_object_any(ctx))
            }
            ObjectKind::Any | ObjectKind::Anyp | ObjectKind::Objectp | ObjectKind::Object => {
                let class_name = match element.element_class_name() {
                    Some(name) => name,
                    None => names::strip_pointer(&element.type_name).0,
                };
                match names::array_kind(class_name) {
                    ArrayKind::Numeric(ty) => self.read_counted_fast_array(ctx, ty),
                    ArrayKind::String => Ok(Value::String(ctx.cursor.read_tstring()?)),
                    ArrayKind::NotArray if element.array_length > 1 => self
                        .read_ndim(ctx, &element.dims(), |ctx| {
                            self.decode_object(ctx, class_name)
                        }),
                    ArrayKind::NotArray => self.decode_object(ctx, class_name),
                }
            }
            ObjectKind::TString => Ok(Value::String(ctx.cursor.read_tstring()?)),
            ObjectKind::TObject | ObjectKind::TNamed => {
                self.decode_object(ctx, &element.type_name)
            }
        }
    }

    fn read_object_array(
        &self,
        ctx: &mut DecodeContext<'_>,
        element: &StreamerElement,
        kind: ObjectKind,
    ) -> Result<Value> {
        let dims = element.dims();
        match kind {
            ObjectKind::Object | ObjectKind::Any | ObjectKind::Anyp | ObjectKind::Objectp => {
                let class_name = names::strip_pointer(&element.type_name).0;
                self.read_ndim(ctx, &dims, |ctx| self.read_class_value(ctx, class_name))
            }
            ObjectKind::TString | ObjectKind::TObject | ObjectKind::TNamed => {
                let env = Envelope::read(&mut ctx.cursor, self.registry())?;
                let class_name = element.type_name.as_str();
                let value = self.read_ndim(ctx, &dims, |ctx| {
                    if kind == ObjectKind::TString {
                        Ok(Value::String(ctx.cursor.read_tstring()?))
                    } else {
                        self.decode_object(ctx, class_name)
                    }
                })?;
                env.finish(&mut ctx.cursor, class_name)?;
                Ok(value)
            }
            ObjectKind::ObjectP | ObjectKind::AnyP => {
                self.read_ndim(ctx, &dims, |ctx| self.read_object_any(ctx))
            }
        }
    }

    /// Envelope, then for each outer index a run of `count` items
    fn read_stream_loop(
        &self,
        ctx: &mut DecodeContext<'_>,
        obj: &Object,
        element: &StreamerElement,
    ) -> Result<Value> {
        let env = Envelope::read(&mut ctx.cursor, self.registry())?;
        let type_name = element.type_name.as_str();
        let (item_class, pointer_items) = match type_name.rfind("**") {
            Some(p) if p > 0 => (type_name[..p].trim_end(), true),
            _ => (names::strip_pointer(type_name).0, false),
        };
        let count = self.count_of(obj, element)?;

        let value = self.read_ndim(ctx, &element.dims(), |ctx| {
            let mut items = Vec::with_capacity(count.min(PREALLOC_LIMIT));
            for _ in 0..count {
                let item = if pointer_items {
                    self.read_object_any(ctx)?
                } else {
                    self.read_class_value(ctx, item_class)?
                };
                items.push(item);
            }
            Ok(Value::Array(items))
        })?;
        env.finish(&mut ctx.cursor, item_class)?;
        Ok(value)
    }
}
