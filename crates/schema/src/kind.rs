//! Closed enums for member type codes.
//!
//! Schema records store each member's type as an integer. The integer is
//! split into a family and, for most families, a basic type:
//!
//! ```text
//!   0        base class
//!   1..19    basic scalar           Basic(t)
//!  21..39    fixed array            FixedArray(t)      t = code - 20
//!  41..59    counted array          CountedArray(t)    t = code - 40
//!  61..69    object member          Object(k)
//!  71        pointer to container   StlPointer
//!  81..89    array of objects       ObjectArray(k)     k = code - 20
//!  300       container              Stl
//!  365       std::string            StlString
//!  500       custom-streamed        Streamer
//!  501, 521  counted loop           StreamLoop / StreamLoopArray
//! ```
//!
//! Decoding matches on [`TypeKind`] exhaustively; codes outside the table
//! have no variant and surface as `UnsupportedTypeKind` when a schema is
//! turned into elements.

use std::fmt;

/// Offset between a basic code and its fixed-array code
pub const OFFSET_L: i32 = 20;

/// Offset between a basic code and its counted-array code
pub const OFFSET_P: i32 = 40;

/// Basic scalar types (codes 1..19)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicType {
    /// Signed 8-bit
    Char = 1,
    /// Signed 16-bit
    Short = 2,
    /// Signed 32-bit
    Int = 3,
    /// Signed 64-bit
    Long = 4,
    /// IEEE single
    Float = 5,
    /// Signed 32-bit element counter
    Counter = 6,
    /// Length-prefixed C string (i32 length)
    CharStar = 7,
    /// IEEE double
    Double = 8,
    /// Double stored with reduced precision
    Double32 = 9,
    /// Unsigned 8-bit (old writers)
    LegacyChar = 10,
    /// Unsigned 8-bit
    UChar = 11,
    /// Unsigned 16-bit
    UShort = 12,
    /// Unsigned 32-bit
    UInt = 13,
    /// Unsigned 64-bit
    ULong = 14,
    /// Unsigned 32-bit bit field
    Bits = 15,
    /// Signed 64-bit
    Long64 = 16,
    /// Unsigned 64-bit
    ULong64 = 17,
    /// One byte, non-zero is true
    Bool = 18,
    /// Float stored with reduced precision
    Float16 = 19,
}

impl BasicType {
    /// Map a code in 1..19 to its type
    pub fn from_code(code: i32) -> Option<Self> {
        use BasicType::*;
        Some(match code {
            1 => Char,
            2 => Short,
            3 => Int,
            4 => Long,
            5 => Float,
            6 => Counter,
            7 => CharStar,
            8 => Double,
            9 => Double32,
            10 => LegacyChar,
            11 => UChar,
            12 => UShort,
            13 => UInt,
            14 => ULong,
            15 => Bits,
            16 => Long64,
            17 => ULong64,
            18 => Bool,
            19 => Float16,
            _ => return None,
        })
    }

    /// Numeric code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Bytes one value occupies, or `None` for variable-width encodings
    pub fn width(self) -> Option<usize> {
        use BasicType::*;
        match self {
            Char | LegacyChar | UChar | Bool => Some(1),
            Short | UShort => Some(2),
            Int | Counter | Float | UInt | Bits => Some(4),
            Long | Long64 | ULong | ULong64 | Double => Some(8),
            CharStar | Double32 | Float16 => None,
        }
    }

    /// Reduced-precision float kinds
    pub fn is_packed_float(self) -> bool {
        matches!(self, BasicType::Double32 | BasicType::Float16)
    }

    /// Canonical type name
    pub fn name(self) -> &'static str {
        use BasicType::*;
        match self {
            Char => "char",
            Short => "short",
            Int | Counter => "int",
            Long => "long",
            Float => "float",
            CharStar => "const char*",
            Double => "double",
            Double32 => "Double32_t",
            LegacyChar | UChar => "unsigned char",
            UShort => "unsigned short",
            UInt | Bits => "unsigned",
            ULong => "unsigned long",
            Long64 => "Long64_t",
            ULong64 => "ULong64_t",
            Bool => "bool",
            Float16 => "Float16_t",
        }
    }
}

impl fmt::Display for BasicType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Object member families (codes 61..69)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Object embedded by value, TObject-derived
    Object = 61,
    /// Object embedded by value
    Any = 62,
    /// Pointer to TObject-derived, streamed by value
    Objectp = 63,
    /// Pointer to TObject-derived, streamed as a reference
    ObjectP = 64,
    /// TString
    TString = 65,
    /// TObject itself
    TObject = 66,
    /// TNamed itself
    TNamed = 67,
    /// Pointer, streamed by value
    Anyp = 68,
    /// Pointer, streamed as a reference
    AnyP = 69,
}

impl ObjectKind {
    /// Map a code in 61..69 to its kind
    pub fn from_code(code: i32) -> Option<Self> {
        use ObjectKind::*;
        Some(match code {
            61 => Object,
            62 => Any,
            63 => Objectp,
            64 => ObjectP,
            65 => TString,
            66 => TObject,
            67 => TNamed,
            68 => Anyp,
            69 => AnyP,
            _ => return None,
        })
    }

    /// Numeric code
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Members that hold a reference tag rather than an inline object
    pub fn is_reference(self) -> bool {
        matches!(self, ObjectKind::ObjectP | ObjectKind::AnyP)
    }
}

/// Member type kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Base class (code 0)
    Base,
    /// Single scalar
    Basic(BasicType),
    /// Fixed-length array, length from the element's dimensions
    FixedArray(BasicType),
    /// Array whose length is a previously decoded member
    CountedArray(BasicType),
    /// Object member
    Object(ObjectKind),
    /// Fixed-length array of objects
    ObjectArray(ObjectKind),
    /// Pointer to a container (71)
    StlPointer,
    /// Container (300)
    Stl,
    /// `std::string` (365)
    StlString,
    /// Member with its own streamer; containers are written this way (500)
    Streamer,
    /// Counted loop over objects (501)
    StreamLoop,
    /// Fixed array of counted loops (521)
    StreamLoopArray,
}

impl TypeKind {
    /// Classify a raw type code
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TypeKind::Base),
            1..=19 => BasicType::from_code(code).map(TypeKind::Basic),
            21..=39 => BasicType::from_code(code - OFFSET_L).map(TypeKind::FixedArray),
            41..=59 => BasicType::from_code(code - OFFSET_P).map(TypeKind::CountedArray),
            61..=69 => ObjectKind::from_code(code).map(TypeKind::Object),
            71 => Some(TypeKind::StlPointer),
            81..=89 => ObjectKind::from_code(code - OFFSET_L).map(TypeKind::ObjectArray),
            300 => Some(TypeKind::Stl),
            365 => Some(TypeKind::StlString),
            500 => Some(TypeKind::Streamer),
            501 => Some(TypeKind::StreamLoop),
            521 => Some(TypeKind::StreamLoopArray),
            _ => None,
        }
    }

    /// Raw type code
    pub fn code(self) -> i32 {
        match self {
            TypeKind::Base => 0,
            TypeKind::Basic(t) => t.code(),
            TypeKind::FixedArray(t) => t.code() + OFFSET_L,
            TypeKind::CountedArray(t) => t.code() + OFFSET_P,
            TypeKind::Object(k) => k.code(),
            TypeKind::StlPointer => 71,
            TypeKind::ObjectArray(k) => k.code() + OFFSET_L,
            TypeKind::Stl => 300,
            TypeKind::StlString => 365,
            TypeKind::Streamer => 500,
            TypeKind::StreamLoop => 501,
            TypeKind::StreamLoopArray => 521,
        }
    }

    /// Basic type carried by scalar and array kinds
    pub fn basic(self) -> Option<BasicType> {
        match self {
            TypeKind::Basic(t) | TypeKind::FixedArray(t) | TypeKind::CountedArray(t) => Some(t),
            _ => None,
        }
    }

    /// Containers, written under either code
    pub fn is_container(self) -> bool {
        matches!(
            self,
            TypeKind::Stl | TypeKind::StlString | TypeKind::Streamer
        )
    }
}

/// Container family stored in `fSTLtype`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StlKind {
    /// `std::vector`
    Vector = 1,
    /// `std::list`
    List = 2,
    /// `std::deque`
    Deque = 3,
    /// `std::map`
    Map = 4,
    /// `std::multimap`
    MultiMap = 5,
    /// `std::set`
    Set = 6,
    /// `std::multiset`
    MultiSet = 7,
    /// `std::bitset`
    Bitset = 8,
}

impl StlKind {
    /// Map a raw `fSTLtype`; values carry an offset of 40 for pointer
    /// containers, which is stripped
    pub fn from_code(code: i32) -> Option<Self> {
        use StlKind::*;
        Some(match code.rem_euclid(40) {
            1 => Vector,
            2 => List,
            3 => Deque,
            4 => Map,
            5 => MultiMap,
            6 => Set,
            7 => MultiSet,
            8 => Bitset,
            _ => return None,
        })
    }

    /// Template name prefix, e.g. `vector`
    pub fn template_name(self) -> &'static str {
        use StlKind::*;
        match self {
            Vector => "vector",
            List => "list",
            Deque => "deque",
            Map => "map",
            MultiMap => "multimap",
            Set => "set",
            MultiSet => "multiset",
            Bitset => "bitset",
        }
    }

    /// Recognize a template name (`std::` prefix allowed)
    pub fn from_template_name(name: &str) -> Option<Self> {
        use StlKind::*;
        let name = name.strip_prefix("std::").unwrap_or(name);
        Some(match name {
            "vector" => Vector,
            "list" => List,
            "deque" => Deque,
            "map" => Map,
            "multimap" => MultiMap,
            "set" => Set,
            "multiset" => MultiSet,
            "bitset" => Bitset,
            _ => return None,
        })
    }

    /// Sequence containers with one element type
    pub fn is_sequence(self) -> bool {
        matches!(
            self,
            StlKind::Vector | StlKind::List | StlKind::Deque | StlKind::Set | StlKind::MultiSet
        )
    }

    /// Associative containers with a key and a value type
    pub fn is_map(self) -> bool {
        matches!(self, StlKind::Map | StlKind::MultiMap)
    }
}
