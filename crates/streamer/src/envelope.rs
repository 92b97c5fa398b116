//! Object envelopes.
//!
//! ```text
//! framed:  [count | 0x4000_0000 : u32][version : i16][checksum : u32]? members...
//!           └──────────── count bytes follow the count field ─────────┘
//! legacy:  [version : i16] members...
//! ```
//!
//! The byte count is authoritative. After the members are decoded the
//! cursor must sit exactly at `start + 4 + count`; if it is short, the
//! remaining bytes belong to members newer than the layout used and are
//! skipped. Overrunning the end is fatal.

use rootio_codec::framing::BYTE_COUNT_MASK;
use rootio_codec::ByteCursor;
use rootio_core::{Error, Result};
use rootio_schema::SchemaRegistry;
use tracing::warn;

/// Header of one framed (or legacy) object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    /// Offset of the envelope's first byte
    pub start: usize,
    /// Class version
    pub version: i16,
    /// Byte count following the count field; `None` for legacy framing
    pub byte_count: Option<u32>,
    /// Layout checksum, present for version `<= 0` when the registry knows it
    pub checksum: Option<u32>,
}

impl Envelope {
    /// Read an envelope header at the cursor.
    ///
    /// A zero-or-negative version may be followed by a layout checksum; it
    /// is consumed only if `registry` knows it, otherwise the cursor stays
    /// put.
    pub fn read(cursor: &mut ByteCursor<'_>, registry: &SchemaRegistry) -> Result<Self> {
        let start = cursor.position();
        let raw = cursor.read_u32()?;
        let byte_count = if raw & BYTE_COUNT_MASK != 0 {
            Some(raw & !BYTE_COUNT_MASK)
        } else {
            cursor.rewind(4)?;
            None
        };
        let version = cursor.read_i16()?;

        let mut checksum = None;
        if version <= 0 {
            if let Some(count) = byte_count {
                if count >= 6 && cursor.remaining() >= 4 {
                    let candidate = cursor.peek_u32()?;
                    if registry.knows_checksum(candidate) {
                        cursor.skip(4)?;
                        checksum = Some(candidate);
                    }
                }
            }
        }

        Ok(Envelope {
            start,
            version,
            byte_count,
            checksum,
        })
    }

    /// Offset the members must end at, if the envelope carries a count
    pub fn expected_end(&self) -> Option<usize> {
        self.byte_count.map(|c| self.start + 4 + c as usize)
    }

    /// True for version-only framing
    pub fn is_legacy(&self) -> bool {
        self.byte_count.is_none()
    }

    /// Check the cursor against the declared end.
    ///
    /// Short reads skip forward to the end; overruns fail with
    /// [`Error::ChecksumMismatch`]. Legacy envelopes have nothing to check.
    pub fn finish(&self, cursor: &mut ByteCursor<'_>, class_name: &str) -> Result<()> {
        let end = match self.expected_end() {
            Some(end) => end,
            None => return Ok(()),
        };
        let pos = cursor.position();
        if pos == end {
            return Ok(());
        }
        if pos > end {
            return Err(Error::ChecksumMismatch {
                expected_end: end as u64,
                actual: pos as u64,
            });
        }
        warn!(
            class = class_name,
            version = self.version,
            skipped = end - pos,
            "Skipping trailing bytes of object not covered by its layout"
        );
        cursor.set_position(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rootio_codec::testing::ByteWriter;
    use rootio_core::ErrorKind;
    use rootio_schema::ClassSchema;

    #[test]
    fn test_framed_envelope() {
        let mut w = ByteWriter::new();
        w.begin_envelope(4);
        w.put_u32(1).put_u32(2);
        w.end_frame();
        let bytes = w.into_bytes();

        let registry = SchemaRegistry::new();
        let mut c = ByteCursor::new(&bytes);
        let env = Envelope::read(&mut c, &registry).unwrap();
        assert_eq!(env.version, 4);
        assert_eq!(env.byte_count, Some(10));
        assert_eq!(env.expected_end(), Some(14));
        assert!(!env.is_legacy());
        assert_eq!(c.position(), 6);

        c.skip(8).unwrap();
        env.finish(&mut c, "T").unwrap();
    }

    #[test]
    fn test_legacy_envelope_rewinds() {
        let mut w = ByteWriter::new();
        w.put_legacy_version(1).put_u32(0xAABB_CCDD);
        let bytes = w.into_bytes();

        let mut c = ByteCursor::new(&bytes);
        let env = Envelope::read(&mut c, &SchemaRegistry::new()).unwrap();
        assert!(env.is_legacy());
        assert_eq!(env.version, 1);
        assert_eq!(c.position(), 2);
        env.finish(&mut c, "TObject").unwrap();
        assert_eq!(c.position(), 2);
    }

    #[test]
    fn test_short_read_skips_forward() {
        let mut w = ByteWriter::new();
        w.begin_envelope(2);
        w.put_u32(1).put_u32(2).put_u32(3);
        w.end_frame();
        w.put_u8(0xEE);
        let bytes = w.into_bytes();

        let mut c = ByteCursor::new(&bytes);
        let env = Envelope::read(&mut c, &SchemaRegistry::new()).unwrap();
        c.skip(4).unwrap();
        env.finish(&mut c, "T").unwrap();
        assert_eq!(c.read_u8().unwrap(), 0xEE);
    }

    #[test]
    fn test_overrun_is_checksum_mismatch() {
        let mut w = ByteWriter::new();
        w.begin_envelope(2);
        w.put_u32(1);
        w.end_frame();
        w.put_u32(9);
        let bytes = w.into_bytes();

        let mut c = ByteCursor::new(&bytes);
        let env = Envelope::read(&mut c, &SchemaRegistry::new()).unwrap();
        c.skip(8).unwrap();
        let err = env.finish(&mut c, "T").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    }

    #[test]
    fn test_known_checksum_is_consumed() {
        let registry = SchemaRegistry::new();
        registry.register(ClassSchema::new("T", 0).with_checksum(0xC0FF_EE00));

        let mut w = ByteWriter::new();
        w.begin_envelope(0);
        w.put_u32(0xC0FF_EE00).put_u32(5);
        w.end_frame();
        let bytes = w.into_bytes();

        let mut c = ByteCursor::new(&bytes);
        let env = Envelope::read(&mut c, &registry).unwrap();
        assert_eq!(env.checksum, Some(0xC0FF_EE00));
        assert_eq!(c.read_u32().unwrap(), 5);
    }

    #[test]
    fn test_unknown_checksum_is_left_in_place() {
        let mut w = ByteWriter::new();
        w.begin_envelope(0);
        w.put_u32(0x1111_2222);
        w.end_frame();
        let bytes = w.into_bytes();

        let mut c = ByteCursor::new(&bytes);
        let env = Envelope::read(&mut c, &SchemaRegistry::new()).unwrap();
        assert_eq!(env.checksum, None);
        assert_eq!(c.read_u32().unwrap(), 0x1111_2222);
    }
}
