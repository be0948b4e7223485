//! Adaptive decoder for static-mesh export payloads.
//!
//! Mesh serials carry a tagged property block, a core block with bounding
//! volumes and section records, a set of standard geometry streams that
//! are usually empty, and a vendor trailing block holding the real
//! per-LOD vertex and index data. None of the variant choices in that
//! layout are tagged in the file, so the decoder probes each one against
//! plausibility bounds and reports its confidence through
//! [`veles_common::CoverageReport`].
//!
//! # Example
//!
//! ```no_run
//! use veles_mesh::StaticMeshDecoder;
//!
//! # fn demo(serial: &[u8], property_end: usize, serial_offset: u32) -> veles_mesh::Result<()> {
//! let decoded = StaticMeshDecoder::new().decode(serial, property_end, serial_offset)?;
//! println!(
//!     "{} LODs, {} of {} bytes explained",
//!     decoded.mesh.lods.len(),
//!     decoded.coverage.bytes_explained(),
//!     decoded.coverage.total,
//! );
//! # Ok(())
//! # }
//! ```

mod anchor;
mod decoder;
mod error;
mod lod;
mod streams;
mod types;

pub use decoder::{DecodedMesh, StaticMeshDecoder};
pub use error::{Error, Result};
pub use types::{
    GeometrySource, LodHeaderShape, LodModel, MeshBounds, MeshConfig, MeshSection, SectionLong,
    SectionShape, SectionShort, StaticMesh, Vertex,
};
