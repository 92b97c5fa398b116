//! Fixture encoder for tests.
//!
//! The reader never writes the format. Tests across the workspace still need
//! exact bytes for envelopes, object references and schema records, so this
//! module provides a small big-endian writer that mirrors [`ByteCursor`]
//! reads and patches byte counts when a nested frame closes.
//!
//! [`ByteCursor`]: crate::ByteCursor

use crate::framing::{BYTE_COUNT_MASK, CLASS_MASK, MAP_OFFSET, NEW_CLASS_TAG};

/// Big-endian byte writer with nested frame support
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    open: Vec<usize>,
}

impl ByteWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Finish and return the buffer
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Current write position
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Write one byte
    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    /// Write a signed byte
    pub fn put_i8(&mut self, v: i8) -> &mut Self {
        self.buf.push(v as u8);
        self
    }

    /// Write a bool as one byte
    pub fn put_bool(&mut self, v: bool) -> &mut Self {
        self.buf.push(u8::from(v));
        self
    }

    /// Write a big-endian u16
    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Write a big-endian i16
    pub fn put_i16(&mut self, v: i16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Write a big-endian u32
    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Write a big-endian i32
    pub fn put_i32(&mut self, v: i32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Write a big-endian u64
    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Write a big-endian i64
    pub fn put_i64(&mut self, v: i64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Write a big-endian f32
    pub fn put_f32(&mut self, v: f32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Write a big-endian f64
    pub fn put_f64(&mut self, v: f64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    /// Write raw bytes
    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Write a length-prefixed string
    pub fn put_tstring(&mut self, s: &str) -> &mut Self {
        let bytes = s.as_bytes();
        if bytes.len() < 255 {
            self.buf.push(bytes.len() as u8);
        } else {
            self.buf.push(255);
            self.put_u32(bytes.len() as u32);
        }
        self.put_bytes(bytes)
    }

    /// Write a NUL-terminated string
    pub fn put_cstring(&mut self, s: &str) -> &mut Self {
        self.put_bytes(s.as_bytes());
        self.put_u8(0)
    }

    /// Overwrite a u32 at an earlier position
    pub fn patch_u32(&mut self, pos: usize, v: u32) -> &mut Self {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_be_bytes());
        self
    }

    /// Open an envelope: byte-count placeholder plus version.
    ///
    /// Returns the position of the byte-count field.
    pub fn begin_envelope(&mut self, version: i16) -> usize {
        let start = self.open_frame();
        self.put_i16(version);
        start
    }

    /// Write a legacy envelope (version only, nothing to close)
    pub fn put_legacy_version(&mut self, version: i16) -> &mut Self {
        self.put_i16(version)
    }

    /// Open a pointer frame announcing a new class by name.
    ///
    /// Returns the frame start; the object's reference tag is
    /// `tag_offset + start + 2` (see [`ByteWriter::object_tag`]).
    pub fn begin_new_class_object(&mut self, class_name: &str) -> usize {
        let start = self.open_frame();
        self.put_u32(NEW_CLASS_TAG);
        self.put_cstring(class_name);
        start
    }

    /// Open a pointer frame naming an already-announced class by its tag
    pub fn begin_known_class_object(&mut self, class_tag: u32) -> usize {
        let start = self.open_frame();
        self.put_u32(class_tag | CLASS_MASK);
        start
    }

    /// Close the innermost open frame, patching its byte count
    pub fn end_frame(&mut self) -> &mut Self {
        if let Some(start) = self.open.pop() {
            let count = (self.buf.len() - start - 4) as u32;
            self.patch_u32(start, count | BYTE_COUNT_MASK);
        }
        self
    }

    /// Write a reference to an earlier object (0 writes a null pointer)
    pub fn put_object_ref(&mut self, tag: u32) -> &mut Self {
        self.put_u32(tag)
    }

    /// Tag of an object whose pointer frame started at `frame_start`
    pub fn object_tag(tag_offset: u32, frame_start: usize) -> u32 {
        tag_offset + frame_start as u32 + MAP_OFFSET
    }

    /// Tag of a class announced by the frame starting at `frame_start`
    pub fn class_tag(tag_offset: u32, frame_start: usize) -> u32 {
        tag_offset + frame_start as u32 + 4 + MAP_OFFSET
    }

    fn open_frame(&mut self) -> usize {
        let start = self.buf.len();
        self.put_u32(0);
        self.open.push(start);
        start
    }
}
