//! Terrain heightmap and texture decoders.
//!
//! Terrain chunks store their height data as 16-bit samples inside
//! texture exports, preceded by a header that repeats the payload size in
//! several places; both decoders here share the marker rule that locates
//! the true payload among the false matches. Byte order, storage order,
//! the seam shift and the 256-boundary correction are empirical
//! parameters exposed through [`HeightmapConfig`] rather than baked in.
//!
//! # Example
//!
//! ```no_run
//! use veles_terrain::TerrainHeightmapDecoder;
//!
//! # fn demo(payload: &[u8]) -> veles_terrain::Result<()> {
//! let decoded = TerrainHeightmapDecoder::new().decode(payload, 256, 256)?;
//! println!(
//!     "corner height {}, {} cells corrected",
//!     decoded.grid.at(0, 0),
//!     decoded.corrected_cells,
//! );
//! # Ok(())
//! # }
//! ```

mod config;
mod dxt;
mod error;
mod heightmap;
mod marker;
mod texture;

pub use config::{HeightmapConfig, SampleOrder, StorageOrder, TextureConfig};
pub use error::{Error, Result};
pub use heightmap::{correct_boundary_steps, DecodedHeightmap, HeightGrid, TerrainHeightmapDecoder};
pub use texture::{DecodedTexture, MipLevel, TerrainTextureDecoder, TextureClass, TextureFormat};
