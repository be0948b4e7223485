//! Error types for the terrain crate.

use thiserror::Error;

/// Errors that can occur when decoding terrain exports.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// No size marker matching the expected payload size was found in the
    /// header prefix.
    #[error("no size marker for {expected} payload bytes within the first {searched} bytes")]
    MarkerNotFound { expected: u32, searched: usize },

    /// The payload behind the accepted marker is shorter than the declared
    /// dimensions require.
    #[error("payload needs {needed} bytes but only {available} follow the marker")]
    PayloadTooShort { needed: usize, available: usize },

    /// Declared dimensions are zero or overflow the payload size.
    #[error("implausible dimensions {width}x{height}")]
    BadDimensions { width: u32, height: u32 },

    /// The pixel format identifier is not one of the modeled formats.
    #[error("unsupported pixel format id {0}")]
    UnsupportedFormat(u8),

    /// A height sample was non-finite after correction and scaling.
    #[error("non-finite height value at cell ({x}, {y})")]
    CorruptHeightGrid { x: u32, y: u32 },
}

/// Result type for terrain operations.
pub type Result<T> = std::result::Result<T, Error>;
