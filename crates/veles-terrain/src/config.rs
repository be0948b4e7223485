//! Empirically recovered terrain decode parameters.
//!
//! Nothing in the terrain data self-describes its byte order, storage
//! order or the axial seam position; the defaults here were recovered by
//! comparing decoded grids against in-game terrain. They are working
//! hypotheses, so every one of them is an overridable field rather than
//! an inline constant.

/// Byte order of the 16-bit height samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SampleOrder {
    /// Big-endian, the observed order despite the rest of the container
    /// being little-endian.
    #[default]
    Big,
    Little,
}

/// How the flat sample sequence maps onto the 2-D grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageOrder {
    /// One full column at a time, the observed order.
    #[default]
    ColumnMajor,
    RowMajor,
}

/// Tuning knobs for the heightmap decoder.
#[derive(Debug, Clone)]
pub struct HeightmapConfig {
    pub sample_order: SampleOrder,
    pub storage_order: StorageOrder,
    /// Column roll applied after reshaping, moving the internal seam to
    /// the grid edge.
    pub axial_shift: usize,
    /// Whether to run the 256-boundary neighbor correction pass.
    pub boundary_correction: bool,
    /// Step subtracted or added by the correction pass.
    pub correction_step: f32,
    /// Deviation band, centered near the step, within which a cell is
    /// considered to sit on the wrong side of a 256 boundary.
    pub correction_band: (f32, f32),
    /// Multiplier from raw sample units to world height units.
    pub height_scale: f32,
    /// Header prefix length scanned for the payload size marker.
    pub marker_window: usize,
}

impl Default for HeightmapConfig {
    fn default() -> Self {
        Self {
            sample_order: SampleOrder::Big,
            storage_order: StorageOrder::ColumnMajor,
            axial_shift: 34,
            boundary_correction: true,
            correction_step: 256.0,
            correction_band: (200.0, 320.0),
            height_scale: 3.0,
            marker_window: 500,
        }
    }
}

/// Tuning knobs for the texture decoder.
#[derive(Debug, Clone)]
pub struct TextureConfig {
    /// Header prefix length scanned for the payload size marker.
    pub marker_window: usize,
}

impl Default for TextureConfig {
    fn default() -> Self {
        Self { marker_window: 500 }
    }
}
