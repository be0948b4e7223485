//! Error types for the package crate.

use thiserror::Error;

/// Errors that can occur when parsing a package container.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// The buffer does not start with the container magic tag.
    #[error("not a package container: expected tag {expected:#010x}, got {actual:#010x}")]
    NotAContainer { expected: u32, actual: u32 },

    /// A table's declared extent runs past the end of the buffer.
    #[error("truncated container: {table} table ({count} records at {offset:#x}) exceeds file of {file_len} bytes")]
    TruncatedContainer {
        table: &'static str,
        count: u32,
        offset: u32,
        file_len: usize,
    },

    /// An export's serialized bytes lie outside the buffer.
    #[error("export {index} serial range {offset}+{size} exceeds file of {file_len} bytes")]
    SerialOutOfRange {
        index: usize,
        offset: i64,
        size: i64,
        file_len: usize,
    },

    /// A name/object reference points outside its table.
    #[error("reference {index} outside {table} table of {len} entries")]
    ReferenceOutOfRange {
        table: &'static str,
        index: i64,
        len: usize,
    },
}

/// Result type for package operations.
pub type Result<T> = std::result::Result<T, Error>;
