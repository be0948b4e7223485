//! Tagged property stream decoder.
//!
//! Most exports open with a self-describing list of `(name, type, size,
//! payload)` entries terminated by the sentinel name `None`. The decoder
//! walks that list into an ordered mapping and reports where the binary
//! sections after it begin, which is the anchor every specialized decoder
//! needs.
//!
//! The export table does not say where the list starts: objects carry a
//! variable amount of class/state metadata first. When a caller's offset
//! does not decode, [`PropertyDecoder`] probes nearby offsets and scores
//! the chains they produce, recording that a heuristic was used.
//!
//! # Example
//!
//! ```no_run
//! use veles_props::PropertyDecoder;
//!
//! # let export_bytes: &[u8] = &[];
//! # let names: Vec<String> = Vec::new();
//! let decoder = PropertyDecoder::new(&names);
//! let decoded = decoder.decode(export_bytes, 0)?;
//!
//! let width = decoded.get_int("USize").unwrap_or(0);
//! let height = decoded.get_int("VSize").unwrap_or(0);
//! println!("texture is {width}x{height}, data starts at {}", decoded.end);
//! # Ok::<(), veles_props::Error>(())
//! ```

mod decoder;
mod error;
mod probe;
mod value;

pub use decoder::{DecodedProperties, PropertyDecoder, PropertyStart, TERMINATOR};
pub use error::{Error, Result};
pub use value::{PropertyType, PropertyValue, StructValue, TaggedProperty};
