//! Error types for the property crate.

use thiserror::Error;

/// Errors that can occur when decoding a tagged property stream.
#[derive(Debug, Error)]
pub enum Error {
    /// Common library error.
    #[error("{0}")]
    Common(#[from] veles_common::Error),

    /// Neither the given offset nor any probed nearby offset yields a
    /// property chain ending in the terminator name.
    #[error("no valid property start within {searched} bytes of offset {given}")]
    StartNotFound { given: usize, searched: usize },
}

/// Result type for property operations.
pub type Result<T> = std::result::Result<T, Error>;
