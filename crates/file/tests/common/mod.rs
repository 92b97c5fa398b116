//! Synthetic file builder shared by the file integration tests

#![allow(dead_code)]

pub mod logs;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use rootio_codec::testing::ByteWriter;
use rootio_schema::{BasicType, StlKind};
use std::io::Write;

/// Offset of the top key
pub const BEGIN: usize = 100;

/// Format version written into headers
pub const FILE_VERSION: u32 = 62_206;

fn tstring_len(s: &str) -> u32 {
    if s.len() < 255 {
        1 + s.len() as u32
    } else {
        5 + s.len() as u32
    }
}

/// Size of a small-format key header naming `class`, `name`, `title`
pub fn key_len(class: &str, name: &str, title: &str) -> u32 {
    26 + tstring_len(class) + tstring_len(name) + tstring_len(title)
}

/// One object to store
pub struct Stored {
    pub class_name: String,
    pub name: String,
    pub title: String,
    pub cycle: u16,
    pub payload: Vec<u8>,
    pub compress: bool,
}

impl Stored {
    pub fn new(class_name: &str, name: &str, cycle: u16, payload: Vec<u8>) -> Self {
        Stored {
            class_name: class_name.to_string(),
            name: name.to_string(),
            title: String::new(),
            cycle,
            payload,
            compress: false,
        }
    }

    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }
}

struct WrittenKey {
    class_name: String,
    name: String,
    title: String,
    cycle: u16,
    objlen: u32,
    stored_len: u32,
    seek: u32,
}

fn put_key_header(w: &mut ByteWriter, k: &WrittenKey) {
    let keylen = key_len(&k.class_name, &k.name, &k.title);
    w.put_i32((keylen + k.stored_len) as i32)
        .put_i16(4)
        .put_u32(k.objlen)
        .put_u32(0)
        .put_u16(keylen as u16)
        .put_u16(k.cycle)
        .put_u32(k.seek)
        .put_u32(BEGIN as u32)
        .put_tstring(&k.class_name)
        .put_tstring(&k.name)
        .put_tstring(&k.title);
}

/// Wrap `payload` in one `ZL` sub-block
pub fn zlib_block(payload: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(payload).unwrap();
    let body = enc.finish().unwrap();
    let c = (body.len() as u32).to_le_bytes();
    let u = (payload.len() as u32).to_le_bytes();
    let mut out = vec![b'Z', b'L', 8, c[0], c[1], c[2], u[0], u[1], u[2]];
    out.extend_from_slice(&body);
    out
}

fn put_record(w: &mut ByteWriter, obj: &Stored) -> WrittenKey {
    let stored = if obj.compress {
        zlib_block(&obj.payload)
    } else {
        obj.payload.clone()
    };
    let key = WrittenKey {
        class_name: obj.class_name.clone(),
        name: obj.name.clone(),
        title: obj.title.clone(),
        cycle: obj.cycle,
        objlen: obj.payload.len() as u32,
        stored_len: stored.len() as u32,
        seek: w.position() as u32,
    };
    put_key_header(w, &key);
    w.put_bytes(&stored);
    key
}

fn put_key_list(w: &mut ByteWriter, dir_name: &str, keys: &[WrittenKey]) -> (u32, u32) {
    let start = w.position();
    put_key_header(
        w,
        &WrittenKey {
            class_name: "TFile".to_string(),
            name: dir_name.to_string(),
            title: String::new(),
            cycle: 1,
            objlen: 0,
            stored_len: 0,
            seek: start as u32,
        },
    );
    w.put_i32(keys.len() as i32);
    for k in keys {
        put_key_header(w, k);
    }
    (start as u32, (w.position() - start) as u32)
}

fn directory_record(nbytes_keys: u32, seek_dir: u32, seek_parent: u32, seek_keys: u32) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.put_u16(5)
        .put_u32(0)
        .put_u32(0)
        .put_u32(nbytes_keys)
        .put_u32(0)
        .put_u32(seek_dir)
        .put_u32(seek_parent)
        .put_u32(seek_keys);
    w.put_bytes(&[0u8; 18]);
    w.into_bytes()
}

/// Builds a small-format file in memory
#[derive(Default)]
pub struct FileBuilder {
    title: String,
    top: Vec<Stored>,
    dirs: Vec<(String, Vec<Stored>)>,
    streamer_info: Option<Vec<u8>>,
}

impl FileBuilder {
    pub fn new(title: &str) -> Self {
        FileBuilder {
            title: title.to_string(),
            ..Default::default()
        }
    }

    pub fn object(mut self, obj: Stored) -> Self {
        self.top.push(obj);
        self
    }

    pub fn directory(mut self, name: &str, objects: Vec<Stored>) -> Self {
        self.dirs.push((name.to_string(), objects));
        self
    }

    /// Schema-record payload, built for tag offset [`streamer_info_key_len`]
    pub fn streamer_info(mut self, payload: Vec<u8>) -> Self {
        self.streamer_info = Some(payload);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.put_bytes(&[0u8; BEGIN]);

        // Top key, name block, directory record
        let top = WrittenKey {
            class_name: "TFile".to_string(),
            name: "test.root".to_string(),
            title: self.title.clone(),
            cycle: 1,
            objlen: 0,
            stored_len: 0,
            seek: BEGIN as u32,
        };
        put_key_header(&mut w, &top);
        w.put_tstring(&top.name).put_tstring(&top.title);
        let nbytes_name = (w.position() - BEGIN) as u32;
        let dir_pos = w.position();
        w.put_bytes(&directory_record(0, BEGIN as u32, 0, 0));

        let mut top_keys = Vec::new();
        for (name, objects) in &self.dirs {
            let keys: Vec<WrittenKey> = objects.iter().map(|o| put_record(&mut w, o)).collect();
            let (seek_keys, nbytes_keys) = put_key_list(&mut w, name, &keys);
            let seek_dir = w.position() as u32;
            let record = directory_record(nbytes_keys, seek_dir, BEGIN as u32, seek_keys);
            top_keys.push(put_record(
                &mut w,
                &Stored::new("TDirectoryFile", name, 1, record),
            ));
        }
        for obj in &self.top {
            top_keys.push(put_record(&mut w, obj));
        }

        let (seek_info, nbytes_info) = match &self.streamer_info {
            Some(payload) => {
                let mut info = Stored::new("TList", "StreamerInfo", 1, payload.clone());
                info.title = STREAMER_INFO_TITLE.to_string();
                let key = put_record(&mut w, &info);
                (key.seek, key_len(&key.class_name, &key.name, &key.title) + key.stored_len)
            }
            None => (0, 0),
        };

        let (seek_keys, nbytes_keys) = put_key_list(&mut w, "test.root", &top_keys);
        w.patch_u32(dir_pos + 2 + 4 + 4, nbytes_keys);
        w.patch_u32(dir_pos + 2 + 4 + 4 + 4 + 4 + 4 + 4, seek_keys);
        let end = w.position() as u32;

        let mut h = ByteWriter::new();
        h.put_bytes(b"root")
            .put_u32(FILE_VERSION)
            .put_u32(BEGIN as u32)
            .put_u32(end)
            .put_u32(0)
            .put_u32(0)
            .put_u32(0)
            .put_u32(nbytes_name)
            .put_u8(4)
            .put_u32(1)
            .put_u32(seek_info)
            .put_u32(nbytes_info);

        let mut bytes = w.into_bytes();
        let header = h.into_bytes();
        bytes[..header.len()].copy_from_slice(&header);
        bytes
    }
}

/// Title of the schema-record key
pub const STREAMER_INFO_TITLE: &str = "Doubly linked list";

/// Tag offset the schema-record payload is decoded with
pub fn streamer_info_key_len() -> u32 {
    key_len("TList", "StreamerInfo", STREAMER_INFO_TITLE)
}

pub fn put_tobject(w: &mut ByteWriter) {
    w.put_legacy_version(1).put_u32(0).put_u32(0);
}

pub fn put_tnamed(w: &mut ByteWriter, name: &str, title: &str) {
    w.begin_envelope(1);
    put_tobject(w);
    w.put_tstring(name).put_tstring(title);
    w.end_frame();
}

/// Payload of a stored `TNamed`
pub fn tnamed_payload(name: &str, title: &str) -> Vec<u8> {
    let mut w = ByteWriter::new();
    put_tnamed(&mut w, name, title);
    w.into_bytes()
}

fn put_element(w: &mut ByteWriter, name: &str, type_code: u32, type_name: &str) {
    w.begin_envelope(4);
    put_tnamed(w, name, "");
    w.put_u32(type_code).put_u32(0).put_u32(0).put_u32(0);
    for _ in 0..5 {
        w.put_u32(0);
    }
    w.put_tstring(type_name);
    w.end_frame();
}

fn put_basic_element(w: &mut ByteWriter, name: &str, ty: BasicType) {
    w.begin_envelope(2);
    put_element(w, name, ty.code() as u32, ty.name());
    w.end_frame();
}

fn put_stl_element(w: &mut ByteWriter, name: &str, type_name: &str, stl: StlKind, ctype: u32) {
    w.begin_envelope(3);
    put_element(w, name, 500, type_name);
    w.put_u32(stl as u32).put_u32(ctype);
    w.end_frame();
}

/// Checksum of the `Track` layout
pub const TRACK_CHECKSUM: u32 = 0x7EAC_0002;

/// Schema records for `Track` v2 `{ fPt: float, fN: int }` and
/// `Event` v1 `{ fRun: int, fTracks: vector<Track> }`
pub fn schema_list(tag_offset: u32) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.begin_envelope(5);
    put_tobject(&mut w);
    w.put_tstring("").put_u32(2);

    // Track
    let info = w.begin_new_class_object("TStreamerInfo");
    let info_tag = ByteWriter::class_tag(tag_offset, info);
    w.begin_envelope(9);
    put_tnamed(&mut w, "Track", "");
    w.put_u32(TRACK_CHECKSUM).put_u32(2);
    let arr = w.begin_new_class_object("TObjArray");
    let arr_tag = ByteWriter::class_tag(tag_offset, arr);
    w.begin_envelope(3);
    put_tobject(&mut w);
    w.put_tstring("").put_u32(2).put_u32(0);
    let basic = w.begin_new_class_object("TStreamerBasicType");
    let basic_tag = ByteWriter::class_tag(tag_offset, basic);
    put_basic_element(&mut w, "fPt", BasicType::Float);
    w.end_frame();
    w.begin_known_class_object(basic_tag);
    put_basic_element(&mut w, "fN", BasicType::Int);
    w.end_frame();
    w.end_frame(); // TObjArray envelope
    w.end_frame(); // TObjArray pointer
    w.end_frame(); // TStreamerInfo envelope
    w.end_frame(); // TStreamerInfo pointer
    w.put_tstring("");

    // Event
    w.begin_known_class_object(info_tag);
    w.begin_envelope(9);
    put_tnamed(&mut w, "Event", "");
    w.put_u32(0x7EAC_0001).put_u32(1);
    w.begin_known_class_object(arr_tag);
    w.begin_envelope(3);
    put_tobject(&mut w);
    w.put_tstring("").put_u32(2).put_u32(0);
    w.begin_known_class_object(basic_tag);
    put_basic_element(&mut w, "fRun", BasicType::Int);
    w.end_frame();
    w.begin_new_class_object("TStreamerSTL");
    put_stl_element(&mut w, "fTracks", "vector<Track>", StlKind::Vector, 61);
    w.end_frame();
    w.end_frame();
    w.end_frame();
    w.end_frame();
    w.end_frame();
    w.put_tstring("");

    w.end_frame(); // TList
    w.into_bytes()
}

/// Payload of an `Event` with the given tracks
pub fn event_payload(run: i32, tracks: &[(f32, i32)]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.begin_envelope(1);
    w.put_i32(run);
    w.begin_envelope(6);
    w.put_u32(tracks.len() as u32);
    for &(pt, n) in tracks {
        w.begin_envelope(2);
        w.put_f32(pt).put_i32(n);
        w.end_frame();
    }
    w.end_frame();
    w.end_frame();
    w.into_bytes()
}
