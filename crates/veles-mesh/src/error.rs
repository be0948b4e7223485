//! Error types for the mesh crate.

use thiserror::Error;

/// Errors that can occur when decoding a static-mesh export.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// No known internal-version value found within the anchor scan
    /// window after the property block.
    #[error("no mesh core anchor within {searched} bytes of offset {from}")]
    UnrecognizedMeshCore { from: usize, searched: usize },

    /// A declared element count cannot fit the remaining bytes.
    #[error("implausible {field} count {count}")]
    ImplausibleCount { field: &'static str, count: i64 },

    /// The lazy-array skip signature (zero run plus forward file offset)
    /// was not found within its scan window.
    #[error("no lazy-array skip pointer within {searched} bytes of offset {from}")]
    SkipPointerNotFound { from: usize, searched: usize },
}

/// Result type for mesh operations.
pub type Result<T> = std::result::Result<T, Error>;
