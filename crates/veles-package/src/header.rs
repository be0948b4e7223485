//! Fixed package header.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Magic tag at the start of every package file.
pub const PACKAGE_MAGIC: u32 = 0x9E2A_83C1;

/// The fixed-size preamble of a package file.
///
/// All fields are little-endian. The three (count, offset) pairs address the
/// name, export and import tables anywhere in the file; the offsets are
/// absolute.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct PackageHeader {
    /// Magic tag, must equal [`PACKAGE_MAGIC`].
    pub tag: u32,
    /// File format version.
    pub file_version: u16,
    /// Licensee-specific version. Files sharing a `file_version` still
    /// diverge structurally, so neither field is a reliable layout oracle.
    pub licensee_version: u16,
    /// Package flags.
    pub flags: u32,
    /// Number of entries in the name table.
    pub name_count: u32,
    /// Absolute offset of the name table.
    pub name_offset: u32,
    /// Number of entries in the export table.
    pub export_count: u32,
    /// Absolute offset of the export table.
    pub export_offset: u32,
    /// Number of entries in the import table.
    pub import_count: u32,
    /// Absolute offset of the import table.
    pub import_offset: u32,
}

impl PackageHeader {
    /// Serialized size of the header in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}
