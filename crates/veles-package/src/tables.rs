//! Name, import and export table records.

use veles_common::ByteCursor;

use crate::error::Result;

/// One entry in the name table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NameEntry {
    /// Zero-based table index.
    pub index: usize,
    /// The string value.
    pub name: String,
    /// Name flags, usually zero.
    pub flags: u32,
}

impl NameEntry {
    /// Parse one name record at the cursor position.
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>, index: usize) -> Result<Self> {
        let name = cursor.read_string()?;
        let flags = cursor.read_u32()?;
        Ok(Self { index, name, flags })
    }
}

/// A reference to an object living in another file.
///
/// Imports are metadata only; nothing in this crate follows them across
/// file boundaries. They still matter because export class references are
/// usually negative indices into this table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ImportEntry {
    /// Negative object index, `-(table position + 1)`.
    pub index: i64,
    /// Name of the package the class comes from.
    pub class_package: String,
    /// Name of the referenced class.
    pub class_name: String,
    /// Outer-object reference.
    pub package: i32,
    /// Name of the referenced object.
    pub object_name: String,
}

/// Raw import fields before name-table resolution.
pub(crate) struct RawImport {
    pub class_package: i64,
    pub class_name: i64,
    pub package: i32,
    pub object_name: i64,
}

impl RawImport {
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let class_package = cursor.read_compact_index()?;
        let class_name = cursor.read_compact_index()?;
        let package = cursor.read_i32()?;
        let object_name = cursor.read_compact_index()?;
        Ok(Self {
            class_package,
            class_name,
            package,
            object_name,
        })
    }
}

/// One object stored in this file.
///
/// The entry owns no object data. `serial_offset` and `serial_size`
/// describe where the object's serialized bytes live in the file buffer;
/// [`Package::export_bytes`](crate::Package::export_bytes) slices them out.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ExportEntry {
    /// Positive object index, `table position + 1`.
    pub index: i64,
    /// Class reference: negative into imports, positive into exports,
    /// zero for a class definition itself.
    pub class_index: i64,
    /// Resolved class name, `"Class"` when `class_index` is zero.
    pub class_name: String,
    /// Superclass reference, same encoding as `class_index`.
    pub super_index: i64,
    /// Outer-object reference.
    pub package: i32,
    /// Resolved object name.
    pub object_name: String,
    /// Object flags.
    pub object_flags: u32,
    /// Length of the serialized bytes.
    pub serial_size: i64,
    /// Absolute offset of the serialized bytes, zero when `serial_size`
    /// is not positive.
    pub serial_offset: i64,
    /// False when the record failed to parse and this is a placeholder
    /// keeping the 1-based index space dense.
    pub malformed: bool,
}

/// Raw export fields before name-table and class resolution.
pub(crate) struct RawExport {
    pub class_index: i64,
    pub super_index: i64,
    pub package: i32,
    pub object_name: i64,
    pub object_flags: u32,
    pub serial_size: i64,
    pub serial_offset: i64,
}

impl RawExport {
    pub(crate) fn parse(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let class_index = cursor.read_compact_index()?;
        let super_index = cursor.read_compact_index()?;
        let package = cursor.read_i32()?;
        let object_name = cursor.read_compact_index()?;
        let object_flags = cursor.read_u32()?;
        let serial_size = cursor.read_compact_index()?;
        let serial_offset = if serial_size > 0 {
            cursor.read_compact_index()?
        } else {
            0
        };
        Ok(Self {
            class_index,
            super_index,
            package,
            object_name,
            object_flags,
            serial_size,
            serial_offset,
        })
    }
}
