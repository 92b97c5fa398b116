//! Built-in custom streamers.
//!
//! Collections, `TObject`/`TNamed`, and the schema-record classes. The
//! schema records have to be readable before any schema is known, so
//! their layouts are fixed here.

use crate::context::DecodeContext;
use crate::custom::CustomStreamers;
use crate::decoder::{VersionedObjectDecoder, PREALLOC_LIMIT};
use rootio_codec::framing::IS_REFERENCED_BIT;
use rootio_core::{Object, Result, Value};
use rootio_schema::{BasicType, StlKind, StreamerElement, HAS_RANGE_BIT};

/// `fBits` flag: a `TRef` carries a UUID string instead of a process id
const HAS_UUID_BIT: u32 = 1 << 5;

type Decoder<'d, 'r> = &'d VersionedObjectDecoder<'r>;

pub(crate) fn install(s: &mut CustomStreamers) {
    s.register("TObject", tobject);
    s.register("TNamed", tnamed);
    s.register("TObjString", tobjstring);
    s.register("TList", tlist);
    s.alias("THashList", "TList");
    s.register("TObjArray", tobjarray);
    s.register("TClonesArray", tclonesarray);
    s.register("TMap", tmap);
    s.register("TRefArray", trefarray);

    s.register("TStreamerInfo", streamer_info);
    s.register("TStreamerElement", streamer_element);
    s.register("TStreamerBase", streamer_base);
    s.register("TStreamerSTL", streamer_stl);
    s.register("TStreamerSTLstring", streamer_stl_string);
    s.register("TStreamerLoop", streamer_loop);
    s.alias("TStreamerBasicPointer", "TStreamerLoop");
    s.register("TStreamerObject", streamer_object);
    for alias in [
        "TStreamerBasicType",
        "TStreamerObjectAny",
        "TStreamerString",
        "TStreamerObjectPointer",
    ] {
        s.alias(alias, "TStreamerObject");
    }
    s.register("TStreamerObjectAnyPointer", streamer_object_any_pointer);

    s.register_direct("TDatime", tdatime);
    s.register_direct("TRef", tref);
}

fn u32_value(v: u32) -> Value {
    Value::UInt(u64::from(v))
}

fn tobject(_: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, _: i16) -> Result<()> {
    let unique_id = ctx.cursor.read_u32()?;
    let bits = ctx.cursor.read_u32()?;
    if bits & IS_REFERENCED_BIT != 0 {
        ctx.cursor.skip(2)?;
    }
    obj.set("fUniqueID", u32_value(unique_id));
    obj.set("fBits", u32_value(bits));
    Ok(())
}

fn bits_of(obj: &Object) -> u32 {
    obj.get("fBits").and_then(Value::as_u64).unwrap_or(0) as u32
}

fn tnamed(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, _: i16) -> Result<()> {
    d.stream_class_into(ctx, obj, "TObject")?;
    obj.set("fName", Value::String(ctx.cursor.read_tstring()?));
    obj.set("fTitle", Value::String(ctx.cursor.read_tstring()?));
    Ok(())
}

fn tobjstring(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, _: i16) -> Result<()> {
    d.stream_class_into(ctx, obj, "TObject")?;
    obj.set("fString", Value::String(ctx.cursor.read_tstring()?));
    Ok(())
}

fn tlist(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, version: i16) -> Result<()> {
    if version <= 3 {
        obj.set("name", Value::from(""));
        obj.set("arr", Value::Array(Vec::new()));
        obj.set("opt", Value::Array(Vec::new()));
        return Ok(());
    }
    d.stream_class_into(ctx, obj, "TObject")?;
    obj.set("name", Value::String(ctx.cursor.read_tstring()?));
    let n = ctx.cursor.read_u32()?;
    let n = d.options().check_len(i64::from(n), "TList")?;
    let mut arr = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    let mut opt = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for _ in 0..n {
        arr.push(d.read_object_any(ctx)?);
        opt.push(Value::String(ctx.cursor.read_tstring()?));
    }
    obj.set("arr", Value::Array(arr));
    obj.set("opt", Value::Array(opt));
    Ok(())
}

/// Shared head of object arrays: optional `TObject`, optional name
fn array_head(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, version: i16) -> Result<()> {
    if version > 2 {
        d.stream_class_into(ctx, obj, "TObject")?;
    }
    let name = if version > 1 {
        ctx.cursor.read_tstring()?
    } else {
        String::new()
    };
    obj.set("name", Value::String(name));
    Ok(())
}

fn tobjarray(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, version: i16) -> Result<()> {
    array_head(d, ctx, obj, version)?;
    let n = ctx.cursor.read_u32()?;
    let n = d.options().check_len(i64::from(n), "TObjArray")?;
    let lower_bound = ctx.cursor.read_u32()?;
    let mut arr = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for _ in 0..n {
        arr.push(d.read_object_any(ctx)?);
    }
    obj.set("fLast", Value::Int(n as i64 - 1));
    obj.set("fLowerBound", u32_value(lower_bound));
    obj.set("arr", Value::Array(arr));
    Ok(())
}

/// Objects of one class, stored member-wise and inline
fn tclonesarray(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, version: i16) -> Result<()> {
    array_head(d, ctx, obj, version)?;
    let class_spec = ctx.cursor.read_tstring()?;
    let (class_name, class_version) = match class_spec.rfind(';') {
        Some(p) if p > 0 => (&class_spec[..p], class_spec[p + 1..].trim().parse::<i32>().unwrap_or(0)),
        _ => (class_spec.as_str(), 0),
    };
    let n = ctx.cursor.read_i32()?;
    let n = d.options().check_len(i64::from(n).abs(), "TClonesArray")?;
    let lower_bound = ctx.cursor.read_u32()?;

    let mut objects: Vec<Object> = (0..n).map(|_| Object::new(class_name)).collect();
    if n > 0 {
        let registry = d.registry();
        let resolved = registry.lookup(
            class_name,
            class_version,
            None,
            d.options().allow_version_fallback,
        )?;
        let members = registry.expand_schema(&resolved.schema)?;
        d.read_split_members(ctx, &mut objects, &members, false)?;
    }

    obj.set("fClass", Value::from(class_name));
    obj.set("fLast", Value::Int(n as i64 - 1));
    obj.set("fLowerBound", u32_value(lower_bound));
    obj.set(
        "arr",
        Value::Array(objects.into_iter().map(Value::Object).collect()),
    );
    Ok(())
}

fn tmap(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, version: i16) -> Result<()> {
    array_head(d, ctx, obj, version)?;
    let n = ctx.cursor.read_u32()?;
    let n = d.options().check_len(i64::from(n), "TMap")?;
    let mut arr = Vec::with_capacity(n.min(PREALLOC_LIMIT));
    for _ in 0..n {
        let first = d.read_object_any(ctx)?;
        let second = d.read_object_any(ctx)?;
        if first.is_null() {
            continue;
        }
        arr.push(Value::Object(
            Object::new("TPair")
                .with("first", first)
                .with("second", second),
        ));
    }
    obj.set("arr", Value::Array(arr));
    Ok(())
}

fn trefarray(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, _: i16) -> Result<()> {
    d.stream_class_into(ctx, obj, "TObject")?;
    obj.set("name", Value::String(ctx.cursor.read_tstring()?));
    let n = ctx.cursor.read_i32()?;
    let lower_bound = ctx.cursor.read_i32()?;
    let _pid = ctx.cursor.read_u16()?;
    let count = d.options().check_len(i64::from(n), "TRefArray")?;
    obj.set("fLast", Value::Int(i64::from(n) - 1));
    obj.set("fLowerBound", Value::Int(i64::from(lower_bound)));
    obj.set("fUIDs", d.read_fast_array(ctx, count, BasicType::UInt)?);
    Ok(())
}

fn tdatime(_: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, _: i16) -> Result<()> {
    obj.set("fDatime", u32_value(ctx.cursor.read_u32()?));
    Ok(())
}

fn tref(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, _: i16) -> Result<()> {
    d.stream_class_into(ctx, obj, "TObject")?;
    if bits_of(obj) & HAS_UUID_BIT != 0 {
        obj.set("fUUID", Value::String(ctx.cursor.read_tstring()?));
    } else {
        obj.set("fPID", Value::UInt(u64::from(ctx.cursor.read_u16()?)));
    }
    Ok(())
}

fn streamer_info(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, _: i16) -> Result<()> {
    d.stream_class_into(ctx, obj, "TNamed")?;
    obj.set("fCheckSum", u32_value(ctx.cursor.read_u32()?));
    obj.set("fClassVersion", u32_value(ctx.cursor.read_u32()?));
    obj.set("fElements", d.read_object_any(ctx)?);
    Ok(())
}

fn streamer_element(
    d: Decoder,
    ctx: &mut DecodeContext<'_>,
    obj: &mut Object,
    version: i16,
) -> Result<()> {
    d.stream_class_into(ctx, obj, "TNamed")?;
    let mut type_code = ctx.cursor.read_u32()?;
    obj.set("fSize", u32_value(ctx.cursor.read_u32()?));
    obj.set("fArrayLength", u32_value(ctx.cursor.read_u32()?));
    obj.set("fArrayDim", u32_value(ctx.cursor.read_u32()?));
    let n_index = if version == 1 {
        ctx.cursor.read_u32()? as usize
    } else {
        5
    };
    obj.set("fMaxIndex", d.read_fast_array(ctx, n_index, BasicType::UInt)?);
    let type_name = ctx.cursor.read_tstring()?;

    if type_code == BasicType::UChar.code() as u32 && matches!(type_name.as_str(), "Bool_t" | "bool") {
        type_code = BasicType::Bool.code() as u32;
    }

    let (mut xmin, mut xmax, mut factor) = (0.0, 0.0, 0.0);
    if version == 3 {
        xmin = ctx.cursor.read_f64()?;
        xmax = ctx.cursor.read_f64()?;
        factor = ctx.cursor.read_f64()?;
    } else if version > 3 && bits_of(obj) & HAS_RANGE_BIT != 0 {
        let mut probe = StreamerElement {
            title: obj
                .get("fTitle")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            type_code: type_code as i32,
            ..Default::default()
        };
        probe.apply_title_range()?;
        xmin = probe.xmin;
        xmax = probe.xmax;
        factor = probe.factor;
    }

    obj.set("fType", u32_value(type_code));
    obj.set("fTypeName", Value::String(type_name));
    obj.set("fXmin", Value::Double(xmin));
    obj.set("fXmax", Value::Double(xmax));
    obj.set("fFactor", Value::Double(factor));
    Ok(())
}

fn streamer_base(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, version: i16) -> Result<()> {
    d.stream_class_into(ctx, obj, "TStreamerElement")?;
    if version > 2 {
        obj.set("fBaseVersion", u32_value(ctx.cursor.read_u32()?));
    }
    Ok(())
}

fn streamer_stl(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, _: i16) -> Result<()> {
    d.stream_class_into(ctx, obj, "TStreamerElement")?;
    let mut stl_type = ctx.cursor.read_u32()?;
    let ctype = ctx.cursor.read_u32()?;

    let type_name = obj.get("fTypeName").and_then(Value::as_str).unwrap_or("");
    let starts = |prefix: &str| {
        type_name.starts_with(prefix) || type_name.starts_with(&format!("std::{prefix}"))
    };
    let multimap = StlKind::MultiMap as u32;
    let set = StlKind::Set as u32;
    if stl_type == multimap && starts("set") {
        stl_type = set;
    } else if stl_type == set && starts("multimap") {
        stl_type = multimap;
    }

    obj.set("fSTLtype", u32_value(stl_type));
    obj.set("fCtype", u32_value(ctype));
    Ok(())
}

fn streamer_stl_string(
    d: Decoder,
    ctx: &mut DecodeContext<'_>,
    obj: &mut Object,
    version: i16,
) -> Result<()> {
    if version > 0 {
        d.stream_class_into(ctx, obj, "TStreamerSTL")?;
    }
    Ok(())
}

fn streamer_loop(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, version: i16) -> Result<()> {
    if version > 1 {
        d.stream_class_into(ctx, obj, "TStreamerElement")?;
        obj.set("fCountVersion", u32_value(ctx.cursor.read_u32()?));
        obj.set("fCountName", Value::String(ctx.cursor.read_tstring()?));
        obj.set("fCountClass", Value::String(ctx.cursor.read_tstring()?));
    }
    Ok(())
}

fn streamer_object(d: Decoder, ctx: &mut DecodeContext<'_>, obj: &mut Object, version: i16) -> Result<()> {
    if version > 1 {
        d.stream_class_into(ctx, obj, "TStreamerElement")?;
    }
    Ok(())
}

fn streamer_object_any_pointer(
    d: Decoder,
    ctx: &mut DecodeContext<'_>,
    obj: &mut Object,
    version: i16,
) -> Result<()> {
    if version > 0 {
        d.stream_class_into(ctx, obj, "TStreamerElement")?;
    }
    Ok(())
}
