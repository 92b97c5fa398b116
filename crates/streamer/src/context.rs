//! State of one top-level decode call.

use crate::refs::ReferenceTable;
use rootio_codec::framing::MAP_OFFSET;
use rootio_codec::ByteCursor;
use rootio_core::{Error, Result};

/// Cursor, reference table and nesting depth threaded through a decode
#[derive(Debug)]
pub struct DecodeContext<'a> {
    /// Read position in the record buffer
    pub cursor: ByteCursor<'a>,
    /// Objects and classes seen so far in this record
    pub refs: ReferenceTable,
    tag_offset: u32,
    depth: usize,
}

impl<'a> DecodeContext<'a> {
    /// Start a decode over `buf`.
    ///
    /// `tag_offset` is added to buffer positions to form reference tags; for
    /// a record read from a key it is the key length.
    pub fn new(buf: &'a [u8], tag_offset: u32) -> Self {
        DecodeContext {
            cursor: ByteCursor::new(buf),
            refs: ReferenceTable::new(),
            tag_offset,
            depth: 0,
        }
    }

    /// Offset added to positions when forming tags
    pub fn tag_offset(&self) -> u32 {
        self.tag_offset
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Tag of an item whose frame starts at `pos`
    pub fn tag_at(&self, pos: usize) -> u32 {
        self.tag_offset
            .wrapping_add(pos as u32)
            .wrapping_add(MAP_OFFSET)
    }

    pub(crate) fn enter(&mut self, max_depth: usize) -> Result<()> {
        if self.depth >= max_depth {
            return Err(Error::malformed(format!(
                "object nesting exceeds depth limit {max_depth}"
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}
