//! Decoded property values.

use veles_common::{Rotator, Vector3};

/// Declared property type tags, the low nibble of the info byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyType {
    None,
    Byte,
    Int,
    Bool,
    Float,
    Object,
    Name,
    String,
    Class,
    Array,
    Struct,
    Vector,
    Rotator,
    Str,
    /// Map and FixedArray tags. Essentially never serialized by this
    /// engine; seeing one means the walk is out of sync.
    Invalid(u8),
}

impl PropertyType {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            0 => Self::None,
            1 => Self::Byte,
            2 => Self::Int,
            3 => Self::Bool,
            4 => Self::Float,
            5 => Self::Object,
            6 => Self::Name,
            7 => Self::String,
            8 => Self::Class,
            9 => Self::Array,
            10 => Self::Struct,
            11 => Self::Vector,
            12 => Self::Rotator,
            13 => Self::Str,
            other => Self::Invalid(other),
        }
    }
}

/// A decoded property payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyValue {
    Byte(u8),
    Int(i32),
    /// Bool carries no payload bytes; the value lives in the info byte's
    /// array-flag bit.
    Bool(bool),
    Float(f32),
    /// An object-table reference: positive exports, negative imports,
    /// zero null. Resolution is the container's job.
    Object(i64),
    /// A name-table reference, resolved to its string.
    Name(String),
    Str(String),
    /// A dynamic array: element count plus the undecoded element bytes.
    /// Element layout depends on the owning class's declaration, which
    /// the stream does not carry.
    Array { count: i64, data: Vec<u8> },
    Struct(StructValue),
    Vector(Vector3),
    Rotator(Rotator),
    /// Payload kept verbatim because the type tag was unknown or the
    /// declared size did not match any known layout.
    Raw(Vec<u8>),
}

/// A struct-typed payload, decoded by struct name when the shape is known.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StructValue {
    Vector(Vector3),
    Rotator(Rotator),
    Color { r: u8, g: u8, b: u8, a: u8 },
    Scale(Vector3),
    Range { min: f32, max: f32 },
    Plane { x: f32, y: f32, z: f32, w: f32 },
    Box { min: Vector3, max: Vector3 },
    Guid([u32; 4]),
    /// A struct whose layout is not known; name and bytes kept as-is.
    Raw { name: String, data: Vec<u8> },
}

/// One decoded property of an export.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TaggedProperty {
    /// Resolved property name.
    pub name: String,
    /// Declared type tag.
    pub prop_type: PropertyType,
    /// Declared payload size in bytes.
    pub size: usize,
    /// Static-array slot, zero for scalar properties.
    pub array_index: u32,
    /// Struct type name, present only for struct-tagged properties.
    pub struct_name: Option<String>,
    /// The decoded payload.
    pub value: PropertyValue,
}

impl PropertyValue {
    /// The value as an integer, when it has a natural one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Byte(v) => Some(*v as i64),
            PropertyValue::Int(v) => Some(*v as i64),
            PropertyValue::Object(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a float, when it has a natural one.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f32),
            PropertyValue::Byte(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// The value as a string slice, for name and string properties.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Name(s) | PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}
