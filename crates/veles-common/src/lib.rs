//! Common utilities for Veles.
//!
//! This crate provides foundational types used across all Veles crates:
//!
//! - [`ByteCursor`] - Bounds-checked forward reading from byte slices
//! - [`compact`] - The container format's variable-length signed integer codec
//! - [`CoverageReport`] - Bookkeeping of which byte ranges a decode pass understood
//! - [`Detected`] - Tagged outcome of a heuristic detection strategy

mod coverage;
mod cursor;
mod detect;
mod error;
mod geom;

pub mod compact;

pub use coverage::{CoverageReport, ExplainedRange, UnknownRegion};
pub use cursor::ByteCursor;
pub use detect::Detected;
pub use error::{Error, Result};
pub use geom::{Rotator, Vector3};

/// Re-export memchr for SIMD-accelerated byte searching
pub use memchr;
