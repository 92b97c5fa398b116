//! Constants of the object framing layer.
//!
//! ```text
//! envelope:       [byte-count | BYTE_COUNT_MASK : u32][version : i16] members...
//! legacy:         [version : i16] members...
//! new class ref:  [byte-count | BYTE_COUNT_MASK][NEW_CLASS_TAG][class name \0] object
//! known class:    [byte-count | BYTE_COUNT_MASK][class tag | CLASS_MASK] object
//! object ref:     [tag : u32]            (0 = null)
//! ```

/// Set in the first u32 of an envelope that carries a byte count
pub const BYTE_COUNT_MASK: u32 = 0x4000_0000;

/// Set in a tag that names a class rather than an object
pub const CLASS_MASK: u32 = 0x8000_0000;

/// Tag announcing that a class name follows inline
pub const NEW_CLASS_TAG: u32 = 0xFFFF_FFFF;

/// Added to buffer positions when computing reference tags
pub const MAP_OFFSET: u32 = 2;

/// Tag of the top-level object of a record
pub const TOP_LEVEL_TAG: u32 = 1;

/// Bit in a container version marking member-wise streaming
pub const MEMBER_WISE_BIT: i16 = 1 << 14;

/// Bit in `fBits` of TObject marking a referenced object (a u16 process id follows)
pub const IS_REFERENCED_BIT: u32 = 1 << 4;
