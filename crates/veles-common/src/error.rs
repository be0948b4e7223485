//! Error types for veles-common.

use thiserror::Error;

/// Common error type for Veles operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A read would run past the end of the buffer.
    ///
    /// This is always a recoverable decode error, never a panic: the
    /// container format lies about sizes often enough that running off the
    /// end of an export is an expected condition.
    #[error("out of bounds: needed {needed} bytes but only {available} available")]
    OutOfBounds { needed: usize, available: usize },

    /// A compact index ran past its maximum encoded length.
    #[error("compact index exceeds 5 bytes")]
    CompactIndexTooLong,

    /// A length-prefixed string declared a negative-after-negation length.
    #[error("invalid string length prefix: {0}")]
    InvalidStringLength(i64),
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
