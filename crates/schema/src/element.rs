//! Member decode recipes.
//!
//! A [`StreamerElement`] is one entry of a class schema: the member name,
//! its raw type code, the C++ type spelling and the shape metadata the
//! decoder needs (array dimensions, count member, container family, packing
//! range). Elements are built once from the file's own schema records and
//! never change afterwards.

use crate::kind::{BasicType, ObjectKind, StlKind, TypeKind, OFFSET_P};
use crate::names::{self, ArrayKind};
use rootio_core::{Error, Result};
use smallvec::SmallVec;
use std::f64::consts::PI;

/// Type name carried by base-class elements
pub const BASE_TYPE_NAME: &str = "BASE";

/// Bit in an element's `fBits` marking a `[min,max,nbits]` range in its title
pub const HAS_RANGE_BIT: u32 = 1 << 6;

/// Array dimensions, outermost first
pub type Dims = SmallVec<[usize; 5]>;

/// How a Double32/Float16 member is stored
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloatPacking {
    /// u32 scaled into `[min, min + u32::MAX * scale]`
    Scaled {
        /// Multiplier applied to the stored integer
        scale: f64,
        /// Offset added after scaling
        min: f64,
    },
    /// Stored as a plain IEEE single
    PlainFloat,
    /// u8 exponent plus u16 truncated mantissa
    Truncated {
        /// Mantissa bits kept
        nbits: u32,
    },
}

impl FloatPacking {
    /// Rebuild a float from a truncated exponent/mantissa pair
    pub fn unpack_truncated(exponent: u8, mantissa: u16, nbits: u32) -> f32 {
        let man = u32::from(mantissa);
        let mask = 1u32
            .checked_shl(nbits + 1)
            .map(|b| b - 1)
            .unwrap_or(u32::MAX);
        let shift = 23u32.saturating_sub(nbits);
        let bits = (u32::from(exponent) << 23) | ((man & mask) << shift);
        let value = f32::from_bits(bits);
        let sign_bit = 1u32.checked_shl(nbits + 1).unwrap_or(0);
        if man & sign_bit != 0 {
            -value
        } else {
            value
        }
    }
}

/// One member recipe of a class schema
#[derive(Debug, Clone, PartialEq)]
pub struct StreamerElement {
    /// Member name (for base elements, the base class name)
    pub name: String,
    /// Member comment; may carry a packing range
    pub title: String,
    /// Raw type code
    pub type_code: i32,
    /// C++ type spelling
    pub type_name: String,
    /// Size in bytes as recorded by the writer
    pub size: u32,
    /// Total number of array elements (0 for scalars)
    pub array_length: u32,
    /// Number of array dimensions
    pub array_dim: u32,
    /// Extent of each dimension
    pub max_index: [u32; 5],
    /// Lower bound of a packing range
    pub xmin: f64,
    /// Upper bound of a packing range
    pub xmax: f64,
    /// Packing factor (0 when unpacked)
    pub factor: f64,
    /// Version of the base class, for base elements
    pub base_version: Option<u32>,
    /// Member holding the element count, for counted arrays and loops
    pub count_name: Option<String>,
    /// Class owning the count member
    pub count_class: Option<String>,
    /// Version of the class owning the count member
    pub count_version: Option<u32>,
    /// Container family, for container elements
    pub stl_kind: Option<StlKind>,
    /// Content type code of a container
    pub stl_ctype: i32,
    /// Schema record class the element was read as (e.g. `TStreamerSTL`)
    pub record_class: String,
}

impl Default for StreamerElement {
    fn default() -> Self {
        StreamerElement {
            name: String::new(),
            title: String::new(),
            type_code: 0,
            type_name: String::new(),
            size: 0,
            array_length: 0,
            array_dim: 0,
            max_index: [0; 5],
            xmin: 0.0,
            xmax: 0.0,
            factor: 0.0,
            base_version: None,
            count_name: None,
            count_class: None,
            count_version: None,
            stl_kind: None,
            stl_ctype: 0,
            record_class: "TStreamerElement".to_string(),
        }
    }
}

impl StreamerElement {
    /// Element of the given kind
    pub fn new(name: impl Into<String>, kind: TypeKind, type_name: impl Into<String>) -> Self {
        StreamerElement {
            name: name.into(),
            type_code: kind.code(),
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    /// Scalar member
    pub fn basic(name: impl Into<String>, ty: BasicType) -> Self {
        let mut e = Self::new(name, TypeKind::Basic(ty), ty.name());
        e.record_class = "TStreamerBasicType".to_string();
        e
    }

    /// Base-class element
    pub fn base(class_name: impl Into<String>, version: u32) -> Self {
        let mut e = Self::new(class_name, TypeKind::Base, BASE_TYPE_NAME);
        e.base_version = Some(version);
        e.record_class = "TStreamerBase".to_string();
        e
    }

    /// Object member of an object kind
    pub fn object(name: impl Into<String>, kind: ObjectKind, class_name: impl Into<String>) -> Self {
        let mut e = Self::new(name, TypeKind::Object(kind), class_name);
        e.record_class = if kind.is_reference() {
            "TStreamerObjectPointer"
        } else {
            "TStreamerObject"
        }
        .to_string();
        e
    }

    /// Container member
    pub fn stl(name: impl Into<String>, type_name: impl Into<String>, stl: StlKind, ctype: i32) -> Self {
        let mut e = Self::new(name, TypeKind::Streamer, type_name);
        e.stl_kind = Some(stl);
        e.stl_ctype = ctype;
        e.record_class = "TStreamerSTL".to_string();
        e
    }

    /// Set array dimensions (outermost first)
    pub fn with_dims(mut self, dims: &[u32]) -> Self {
        let n = dims.len().min(5);
        self.array_dim = n as u32;
        self.max_index = [0; 5];
        self.max_index[..n].copy_from_slice(&dims[..n]);
        self.array_length = dims.iter().product();
        self
    }

    /// Set the count member of a counted array or loop
    pub fn with_count(mut self, count_name: impl Into<String>) -> Self {
        self.count_name = Some(count_name.into());
        self
    }

    /// Set the packing range
    pub fn with_range(mut self, xmin: f64, xmax: f64, factor: f64) -> Self {
        self.xmin = xmin;
        self.xmax = xmax;
        self.factor = factor;
        self
    }

    /// Set the record class name
    pub fn with_record_class(mut self, record_class: impl Into<String>) -> Self {
        self.record_class = record_class.into();
        self
    }

    /// Type kind, `None` when the code has no variant
    pub fn kind(&self) -> Option<TypeKind> {
        TypeKind::from_code(self.type_code)
    }

    /// Type kind, failing with `UnsupportedTypeKind` for unknown codes
    pub fn checked_kind(&self) -> Result<TypeKind> {
        self.kind()
            .ok_or_else(|| Error::unsupported_kind(self.type_code, &self.name))
    }

    /// True for base-class elements
    pub fn is_base(&self) -> bool {
        self.type_name == BASE_TYPE_NAME || self.kind() == Some(TypeKind::Base)
    }

    /// Class named by this element: the base class for base elements, the
    /// pointee for object kinds (pointer stars stripped)
    pub fn element_class_name(&self) -> Option<&str> {
        if self.is_base() {
            return Some(&self.name);
        }
        match self.kind()? {
            TypeKind::Object(_)
            | TypeKind::ObjectArray(_)
            | TypeKind::StreamLoop
            | TypeKind::StreamLoopArray => {
                let name = self.type_name.trim_end_matches('*').trim_end();
                Some(name)
            }
            _ => None,
        }
    }

    /// Dimensions for the outer array traversal.
    ///
    /// Uses the declared dimensions, or a single dimension of
    /// `array_length` when none are declared.
    pub fn dims(&self) -> Dims {
        let n = (self.array_dim as usize).min(5);
        if n >= 1 {
            self.max_index[..n].iter().map(|&d| d as usize).collect()
        } else if self.array_length > 0 {
            let mut d = Dims::new();
            d.push(self.array_length as usize);
            d
        } else {
            Dims::new()
        }
    }

    /// Packing of a Double32/Float16 member
    pub fn packing(&self) -> FloatPacking {
        let double32 = self
            .kind()
            .and_then(TypeKind::basic)
            .map(|t| t == BasicType::Double32)
            .unwrap_or(false);
        if self.factor != 0.0 {
            FloatPacking::Scaled {
                scale: 1.0 / self.factor,
                min: self.xmin,
            }
        } else if self.xmin == 0.0 && double32 {
            FloatPacking::PlainFloat
        } else {
            let nbits = match self.xmin.round() as i64 {
                n if n <= 0 => 12,
                n => n.min(32) as u32,
            };
            FloatPacking::Truncated { nbits }
        }
    }

    /// Parse a `[xmin,xmax(,nbits)]` range out of the title.
    ///
    /// For counted arrays the first bracket holds the count, so the range is
    /// taken from the second one. Titles without a well-formed range leave
    /// the element unchanged.
    pub fn apply_title_range(&mut self) -> Result<()> {
        let title = self.title.as_str();
        let mut open = match title.find('[') {
            Some(p) => p,
            None => return Ok(()),
        };
        if self.type_code > OFFSET_P {
            open = match title[open + 1..].find('[') {
                Some(p) => open + 1 + p,
                None => return Ok(()),
            };
        }
        let close = match title[open + 1..].find(']') {
            Some(p) => open + 1 + p,
            None => return Ok(()),
        };
        if close < open + 2 {
            return Ok(());
        }

        let parts: Vec<&str> = title[open + 1..close].split(',').collect();
        if parts.len() < 2 {
            return Err(Error::malformed(format!(
                "range in title of '{}' needs min and max: {}",
                self.name, self.title
            )));
        }
        let mut nbits = 32u32;
        if parts.len() == 3 {
            nbits = match parts[2].trim().parse::<u32>() {
                Ok(n) if (2..=32).contains(&n) => n,
                _ => 32,
            };
        }

        self.xmin = parse_range_bound(parts[0]);
        self.xmax = parse_range_bound(parts[1]);

        let bigint = if nbits < 32 {
            2f64.powi(nbits as i32)
        } else {
            f64::from(u32::MAX)
        };
        if self.xmin < self.xmax {
            self.factor = bigint / (self.xmax - self.xmin);
        } else if nbits < 15 {
            self.xmin = f64::from(nbits);
        }
        Ok(())
    }

    /// Build an element from a bare type spelling, as needed for the
    /// members of synthesized `pair<K,V>` schemas.
    ///
    /// `alias` resolves file-specific typedefs of basic types.
    pub fn from_type_name(
        name: impl Into<String>,
        type_name: &str,
        alias: impl Fn(&str) -> Option<BasicType>,
    ) -> Self {
        let name = name.into();
        if let Some(ty) = names::type_id_of(type_name).or_else(|| alias(type_name)) {
            let mut e = Self::new(name, TypeKind::Basic(ty), type_name);
            e.record_class = "TStreamerBasicType".to_string();
            return e;
        }

        if let Some((outer, _)) = names::split_template(type_name) {
            if let Some(stl) = StlKind::from_template_name(outer) {
                return Self::stl(name, type_name, stl, 0);
            }
        }

        let (bare, is_ptr) = names::strip_pointer(type_name);
        if names::array_kind(bare) == ArrayKind::String {
            let mut e = Self::new(name, TypeKind::Object(ObjectKind::TString), bare);
            e.record_class = "TStreamerString".to_string();
            return e;
        }
        let kind = if is_ptr { ObjectKind::AnyP } else { ObjectKind::Any };
        Self::object(name, kind, bare)
    }
}

fn parse_range_bound(text: &str) -> f64 {
    let text = text.trim();
    if text.is_empty() {
        return 0.0;
    }
    if !text.contains("pi") {
        return text.parse::<f64>().unwrap_or(0.0);
    }
    let (sign, body) = match text.strip_prefix('-') {
        Some(rest) => (-1.0, rest.trim()),
        None => (1.0, text),
    };
    let magnitude = match body {
        "2pi" | "2*pi" | "twopi" => 2.0 * PI,
        "pi/2" => PI / 2.0,
        "pi/4" => PI / 4.0,
        _ => PI,
    };
    sign * magnitude
}
