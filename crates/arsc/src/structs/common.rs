use std::fmt;

use winnow::binary::{le_u8, le_u16, le_u32};
use winnow::prelude::*;

use crate::structs::ResStringPool;

/// See: https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=237
#[derive(Debug, PartialEq, Default, Eq, PartialOrd, Ord, Clone, Copy)]
#[repr(u16)]
pub enum ResourceType {
    #[default]
    Null = 0x0000,
    StringPool = 0x0001,
    Table = 0x0002,
    Xml = 0x0003,

    // Chunk types in XmlType
    XmlStartNamespace = 0x0100,
    XmlEndNamespace = 0x0101,
    XmlStartElement = 0x0102,
    XmlEndElement = 0x0103,
    XmlCdata = 0x0104,
    XmlLastChunk = 0x017f,
    XmlResourceMap = 0x0180,

    // Chunk types in TableType
    TablePackage = 0x0200,
    TableType = 0x0201,
    TableTypeSpec = 0x0202,
    TableLibrary = 0x0203,
    TableOverlayable = 0x0204,
    TableOverlayablePolicy = 0x0205,
    TableStagedAlias = 0x0206,

    Unknown(u16),
}

impl From<u16> for ResourceType {
    fn from(value: u16) -> Self {
        match value {
            0x0000 => ResourceType::Null,
            0x0001 => ResourceType::StringPool,
            0x0002 => ResourceType::Table,
            0x0003 => ResourceType::Xml,
            0x0100 => ResourceType::XmlStartNamespace,
            0x0101 => ResourceType::XmlEndNamespace,
            0x0102 => ResourceType::XmlStartElement,
            0x0103 => ResourceType::XmlEndElement,
            0x0104 => ResourceType::XmlCdata,
            0x017f => ResourceType::XmlLastChunk,
            0x0180 => ResourceType::XmlResourceMap,
            0x0200 => ResourceType::TablePackage,
            0x0201 => ResourceType::TableType,
            0x0202 => ResourceType::TableTypeSpec,
            0x0203 => ResourceType::TableLibrary,
            0x0204 => ResourceType::TableOverlayable,
            0x0205 => ResourceType::TableOverlayablePolicy,
            0x0206 => ResourceType::TableStagedAlias,
            other => ResourceType::Unknown(other),
        }
    }
}

impl From<ResourceType> for u16 {
    fn from(value: ResourceType) -> Self {
        match value {
            ResourceType::Null => 0x0000,
            ResourceType::StringPool => 0x0001,
            ResourceType::Table => 0x0002,
            ResourceType::Xml => 0x0003,
            ResourceType::XmlStartNamespace => 0x0100,
            ResourceType::XmlEndNamespace => 0x0101,
            ResourceType::XmlStartElement => 0x0102,
            ResourceType::XmlEndElement => 0x0103,
            ResourceType::XmlCdata => 0x0104,
            ResourceType::XmlLastChunk => 0x017f,
            ResourceType::XmlResourceMap => 0x0180,
            ResourceType::TablePackage => 0x0200,
            ResourceType::TableType => 0x0201,
            ResourceType::TableTypeSpec => 0x0202,
            ResourceType::TableLibrary => 0x0203,
            ResourceType::TableOverlayable => 0x0204,
            ResourceType::TableOverlayablePolicy => 0x0205,
            ResourceType::TableStagedAlias => 0x0206,
            ResourceType::Unknown(v) => v,
        }
    }
}

/// Header that appears at the front of every data chunk in a resource
///
/// See: https://cs.android.com/android/platform/superproject/+/android-latest-release:frameworks/base/libs/androidfw/include/androidfw/ResourceTypes.h;l=220
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResChunkHeader {
    /// Type identifier for this chunk. The meaning of this value depends on the containing chunk.
    pub type_: ResourceType,

    /// Size of the chunk header (in bytes).  Adding this value to
    /// the address of the chunk allows you to find its associated data
    /// (if any).
    pub header_size: u16,

    /// Total size of this chunk (in bytes), header and data included
    pub size: u32,
}

impl ResChunkHeader {
    #[inline]
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResChunkHeader> {
        (le_u16, le_u16, le_u32)
            .map(|(type_, header_size, size)| ResChunkHeader {
                type_: ResourceType::from(type_),
                header_size,
                size,
            })
            .parse_next(input)
    }

    /// Get the size of this structure in bytes
    #[inline(always)]
    pub const fn size_of() -> usize {
        // 2 bytes - ResourceTypes
        // 2 bytes - header_size
        // 4 bytes - size
        2 + 2 + 4
    }
}

/// Type of the data value
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
#[repr(u8)]
pub enum ResourceValueType {
    /// The `data` is either 0 or 1, specifying this resource is either undefined or empty, respectively.
    #[default]
    Null = 0x00,

    /// The `data` holds a ResTable_ref, a reference to another resource table entry.
    Reference = 0x01,

    /// The `data` holds an attribute resource identifier.
    Attribute = 0x02,

    /// The `data` holds an index into the containing resource table's global value string pool.
    String = 0x03,

    /// The `data` holds a single-precision floating point number.
    Float = 0x04,

    /// The `data` holds a complex number encoding a dimension value, such as "100in".
    Dimension = 0x05,

    /// The `data` holds a complex number encoding a fraction of a container.
    Fraction = 0x06,

    /// The `data` holds a reference to a resource in a shared library, must be rewritten at runtime
    DynamicReference = 0x07,

    /// The `data` holds an attribute of a shared library, must be rewritten at runtime
    DynamicAttribute = 0x08,

    /// The `data` is a raw integer value of the form n..n.
    Dec = 0x10,

    /// The `data` is a raw integer value of the form 0xn..n.
    Hex = 0x11,

    /// The `data` is either 0 or 1, for input "false" or "true" respectively.
    Boolean = 0x12,

    /// The `data` is a raw integer value of the form #aarrggbb.
    ColorArgb8 = 0x1c,

    /// The `data` is a raw integer value of the form #rrggbb.
    ColorRgb8 = 0x1d,

    /// The `data` is a raw integer value of the form #argb.
    ColorArgb4 = 0x1e,

    /// The `data` is a raw integer value of the form #rgb.
    ColorRgb4 = 0x1f,

    /// Unknown type value
    Unknown(u8),
}

impl From<u8> for ResourceValueType {
    fn from(value: u8) -> Self {
        match value {
            0x00 => ResourceValueType::Null,
            0x01 => ResourceValueType::Reference,
            0x02 => ResourceValueType::Attribute,
            0x03 => ResourceValueType::String,
            0x04 => ResourceValueType::Float,
            0x05 => ResourceValueType::Dimension,
            0x06 => ResourceValueType::Fraction,
            0x07 => ResourceValueType::DynamicReference,
            0x08 => ResourceValueType::DynamicAttribute,
            0x10 => ResourceValueType::Dec,
            0x11 => ResourceValueType::Hex,
            0x12 => ResourceValueType::Boolean,
            0x1c => ResourceValueType::ColorArgb8,
            0x1d => ResourceValueType::ColorRgb8,
            0x1e => ResourceValueType::ColorArgb4,
            0x1f => ResourceValueType::ColorRgb4,
            v => ResourceValueType::Unknown(v),
        }
    }
}

impl From<ResourceValueType> for u8 {
    fn from(value: ResourceValueType) -> Self {
        match value {
            ResourceValueType::Null => 0x00,
            ResourceValueType::Reference => 0x01,
            ResourceValueType::Attribute => 0x02,
            ResourceValueType::String => 0x03,
            ResourceValueType::Float => 0x04,
            ResourceValueType::Dimension => 0x05,
            ResourceValueType::Fraction => 0x06,
            ResourceValueType::DynamicReference => 0x07,
            ResourceValueType::DynamicAttribute => 0x08,
            ResourceValueType::Dec => 0x10,
            ResourceValueType::Hex => 0x11,
            ResourceValueType::Boolean => 0x12,
            ResourceValueType::ColorArgb8 => 0x1c,
            ResourceValueType::ColorRgb8 => 0x1d,
            ResourceValueType::ColorArgb4 => 0x1e,
            ResourceValueType::ColorRgb4 => 0x1f,
            ResourceValueType::Unknown(v) => v,
        }
    }
}

/// Representation of a value in a resource, supplying type information
///
/// Only the tag and the payload are kept, `size` and `res0` are checked while loading.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Hash)]
pub struct ResValue {
    /// Type of the data value
    pub data_type: ResourceValueType,

    /// Data itself
    pub data: u32,
}

impl ResValue {
    /// `data` of a [`ResourceValueType::Null`] value that was never defined
    pub const DATA_NULL_UNDEFINED: u32 = 0;

    /// `data` of a [`ResourceValueType::Null`] value explicitly set to `@empty`
    pub const DATA_NULL_EMPTY: u32 = 1;

    /// Size of `Res_value` on disk
    pub const SIZE: usize = 8;

    const RADIX_MULTS: [f64; 4] = [0.00390625, 3.051758e-005, 1.192093e-007, 4.656613e-010];
    const DIMENSION_UNITS: [&str; 6] = ["px", "dip", "sp", "pt", "in", "mm"];
    const COMPLEX_UNIT_MASK: u32 = 0x0F;
    const FRACTION_UNITS: [&str; 2] = ["%", "%p"];

    #[inline]
    pub const fn new(data_type: ResourceValueType, data: u32) -> ResValue {
        ResValue { data_type, data }
    }

    /// Undefined null value, the starting point of every lookup
    #[inline]
    pub const fn null() -> ResValue {
        ResValue::new(ResourceValueType::Null, Self::DATA_NULL_UNDEFINED)
    }

    /// Parse on-disk `Res_value`, returns declared size alongside the value
    #[inline]
    pub fn parse_sized(input: &mut &[u8]) -> ModalResult<(u16, ResValue)> {
        (le_u16, le_u8, le_u8, le_u32)
            .map(|(size, _res0, data_type, data)| {
                (size, ResValue::new(ResourceValueType::from(data_type), data))
            })
            .parse_next(input)
    }

    #[inline]
    pub fn parse(input: &mut &[u8]) -> ModalResult<ResValue> {
        Self::parse_sized(input).map(|(_, value)| value)
    }

    #[inline(always)]
    pub fn is_null(&self) -> bool {
        self.data_type == ResourceValueType::Null
    }

    /// `@null` reference
    #[inline(always)]
    pub fn is_null_reference(&self) -> bool {
        self.data_type == ResourceValueType::Reference && self.data == 0
    }

    /// Format value, string values are taken from given pool
    pub fn format(&self, string_pool: Option<&ResStringPool>) -> String {
        match self.data_type {
            ResourceValueType::String => string_pool
                .and_then(|pool| pool.string_at(self.data as usize))
                .unwrap_or_else(|| format!("<string #{}>", self.data)),
            _ => self.to_string(),
        }
    }

    #[inline(always)]
    pub fn complex_to_float(&self) -> f64 {
        ((self.data & 0xFFFFFF00) as f64) * Self::RADIX_MULTS[((self.data >> 4) & 3) as usize]
    }

    #[inline(always)]
    fn fmt_package(&self) -> &str {
        if self.data >> 24 == 1 { "android:" } else { "" }
    }
}

impl fmt::Display for ResValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data_type {
            ResourceValueType::Null if self.data == Self::DATA_NULL_EMPTY => f.write_str("@empty"),
            ResourceValueType::Null => f.write_str("@null"),
            ResourceValueType::Reference if self.data == 0 => f.write_str("@null"),
            ResourceValueType::Reference | ResourceValueType::DynamicReference => {
                write!(f, "@{}{:08x}", self.fmt_package(), self.data)
            }
            ResourceValueType::Attribute | ResourceValueType::DynamicAttribute => {
                write!(f, "?{}{:08x}", self.fmt_package(), self.data)
            }
            ResourceValueType::String => write!(f, "<string #{}>", self.data),
            ResourceValueType::Float => write!(f, "{}", f32::from_bits(self.data)),
            ResourceValueType::Dimension => {
                let idx = (self.data & Self::COMPLEX_UNIT_MASK) as usize;
                let unit = Self::DIMENSION_UNITS.get(idx).unwrap_or(&"");
                write!(f, "{}{}", self.complex_to_float(), unit)
            }
            ResourceValueType::Fraction => {
                let idx = (self.data & Self::COMPLEX_UNIT_MASK) as usize;
                let unit = Self::FRACTION_UNITS.get(idx).unwrap_or(&"");
                write!(f, "{}{}", self.complex_to_float() * 100f64, unit)
            }
            ResourceValueType::Dec => write!(f, "{}", self.data as i32),
            ResourceValueType::Hex => write!(f, "0x{:08x}", self.data),
            ResourceValueType::Boolean => f.write_str(if self.data == 0 { "false" } else { "true" }),
            ResourceValueType::ColorArgb8
            | ResourceValueType::ColorRgb8
            | ResourceValueType::ColorArgb4
            | ResourceValueType::ColorRgb4 => write!(f, "#{:08x}", self.data),
            ResourceValueType::Unknown(t) => write!(f, "<0x{:x}, type 0x{:02x}>", self.data, t),
        }
    }
}

/// Split resource id into package, type and entry parts
#[inline(always)]
pub const fn split_resource_id(resid: u32) -> (u8, u8, u16) {
    ((resid >> 24) as u8, ((resid >> 16) & 0xff) as u8, (resid & 0xffff) as u16)
}

/// Generate Resource Id based on algorithm from AOSP
///
/// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/tools/aapt/ResourceTable.h;l=224)
#[inline(always)]
pub const fn make_resource_id(package_id: u8, type_id: u8, entry_id: u16) -> u32 {
    (entry_id as u32) | ((type_id as u32) << 16) | ((package_id as u32) << 24)
}

/// Valid ids have a non-zero type part
#[inline(always)]
pub const fn is_valid_resource_id(resid: u32) -> bool {
    (resid & 0x00ff_0000) != 0
}

/// Ids without package and type parts are attribute ordinals used by `attr` bags
#[inline(always)]
pub const fn is_internal_resource_id(resid: u32) -> bool {
    (resid & 0xffff_0000) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_parts() {
        assert_eq!(split_resource_id(0x7f01_0002), (0x7f, 0x01, 0x0002));
        assert_eq!(make_resource_id(0x7f, 0x01, 0x0002), 0x7f01_0002);
        assert!(!is_valid_resource_id(0x7f00_0001));
        assert!(is_internal_resource_id(0x0000_0005));
        assert!(!is_internal_resource_id(0x0101_0005));
    }

    #[test]
    fn parse_value() {
        let data = [0x08, 0x00, 0x00, 0x01, 0x00, 0x00, 0x01, 0x7f];
        let value = ResValue::parse(&mut &data[..]).unwrap();
        assert_eq!(value, ResValue::new(ResourceValueType::Reference, 0x7f01_0000));
    }

    #[test]
    fn format_values() {
        assert_eq!(ResValue::new(ResourceValueType::Reference, 0).to_string(), "@null");
        assert_eq!(
            ResValue::new(ResourceValueType::Attribute, 0x0101_0000).to_string(),
            "?android:01010000"
        );
        assert_eq!(ResValue::new(ResourceValueType::Boolean, 1).to_string(), "true");
        assert_eq!(ResValue::new(ResourceValueType::Dec, u32::MAX).to_string(), "-1");
        assert_eq!(
            ResValue::new(ResourceValueType::Null, ResValue::DATA_NULL_EMPTY).to_string(),
            "@empty"
        );
    }
}
