//! Package container parser.
//!
//! The container format holds all object data for one file behind a fixed
//! header and three tables:
//!
//! - **name table** - every string the file refers to, by dense index
//! - **export table** - objects owned by this file, with the offset and
//!   size of their serialized bytes
//! - **import table** - references to objects living in other files
//!
//! The tables are count-prefixed and addressed by absolute offsets in the
//! header, so they can be parsed in any order. Individual malformed records
//! are skipped and recorded as unknown regions rather than failing the
//! file: downstream consumers usually only need one or two exports out of
//! hundreds.
//!
//! # Example
//!
//! ```no_run
//! use veles_package::Package;
//!
//! let data = std::fs::read("chunk_n10_n10.vgr")?;
//! let package = Package::parse(&data)?;
//!
//! for export in package.exports_by_class("StaticMesh") {
//!     let bytes = package.export_bytes(export)?;
//!     println!("{}: {} bytes", export.object_name, bytes.len());
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod header;
mod package;
mod tables;

pub use error::{Error, Result};
pub use header::{PackageHeader, PACKAGE_MAGIC};
pub use package::Package;
pub use tables::{ExportEntry, ImportEntry, NameEntry};
