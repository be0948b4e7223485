//! Mesh value types and decode configuration.

use veles_common::Vector3;

/// Tuning knobs for the mesh decoder.
///
/// Every threshold here is an empirical working hypothesis recovered from
/// observed files, not an engine truth, so all of them are overridable.
#[derive(Debug, Clone)]
pub struct MeshConfig {
    /// Internal-version values that mark the start of the core block.
    pub known_versions: Vec<i32>,
    /// How many bytes past the property block to scan for the core anchor.
    pub anchor_window: usize,
    /// Largest believable section count.
    pub max_sections: i32,
    /// Largest believable count for the legacy vertex/color/alpha/UV
    /// streams.
    pub max_stream_count: i32,
    /// How many bytes to scan for the lazy-array skip signature.
    pub skip_scan_window: usize,
    /// Largest believable LOD count.
    pub max_lods: i32,
    /// Largest believable per-LOD vertex count; also decides between the
    /// 12-byte and 16-byte LOD header shapes.
    pub max_vertices: u32,
    /// Smallest index-buffer candidate worth considering (one triangle).
    pub min_indices: u32,
    /// Largest believable index-buffer count.
    pub max_indices: u32,
    /// How many count-prefixed arrays after a LOD's vertex block to probe
    /// for the index buffer.
    pub index_scan_slots: usize,
    /// Position component magnitude above which a vertex is considered
    /// misread header bytes.
    pub position_limit: f32,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            known_versions: vec![236],
            anchor_window: 64,
            max_sections: 100,
            max_stream_count: 500_000,
            skip_scan_window: 64,
            max_lods: 10,
            max_vertices: 100_000,
            min_indices: 3,
            max_indices: 1_000_000,
            index_scan_slots: 10,
            position_limit: 1e10,
        }
    }
}

/// Bounding volumes from the core block: an axis-aligned box with a
/// validity byte, then a sphere.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MeshBounds {
    pub box_min: Vector3,
    pub box_max: Vector3,
    pub box_valid: bool,
    pub sphere_center: Vector3,
    pub sphere_radius: f32,
}

impl MeshBounds {
    /// Serialized size: 25-byte box plus 16-byte sphere.
    pub const SIZE: usize = 41;
}

/// Which section record layout a file uses. Both occur at the same file
/// version; nothing in the header says which.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SectionShape {
    /// 14 bytes: `u32` strip flag plus five `u16` fields.
    Short,
    /// 24 bytes: `u32` strip flag plus five `u32` fields.
    Long,
}

impl SectionShape {
    pub const fn record_size(self) -> usize {
        match self {
            SectionShape::Short => 14,
            SectionShape::Long => 24,
        }
    }
}

/// A section record in the short layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionShort {
    pub is_strip: u32,
    pub first_index: u16,
    pub min_vertex_index: u16,
    pub max_vertex_index: u16,
    pub num_triangles: u16,
    pub num_primitives: u16,
}

/// A section record in the long layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionLong {
    pub is_strip: u32,
    pub first_index: u32,
    pub min_vertex_index: u32,
    pub max_vertex_index: u32,
    pub num_triangles: u32,
    pub num_primitives: u32,
}

/// One section record, tagged by layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MeshSection {
    Short(SectionShort),
    Long(SectionLong),
}

/// One mesh vertex in the vendor 56-byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vertex {
    pub position: Vector3,
    pub normal: Vector3,
    pub tangent_x: Vector3,
    pub tangent_y: Vector3,
    pub u: f32,
    pub v: f32,
}

impl Vertex {
    /// Serialized size in the vendor LOD vertex layout.
    pub const SIZE: usize = 56;
}

/// Which per-LOD header layout was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LodHeaderShape {
    /// Three `u32` fields, vertex count third. 12 bytes.
    Compact,
    /// Four `u32` fields, vertex count fourth. 16 bytes.
    Extended,
}

/// One decoded level-of-detail model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LodModel {
    /// Detected header layout; `None` when the geometry came from the
    /// legacy streams, which have no LOD header.
    pub header_shape: Option<LodHeaderShape>,
    pub vertices: Vec<Vertex>,
    /// Triangle-list indices into `vertices`.
    pub indices: Vec<u16>,
}

impl LodModel {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Where the decoded geometry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum GeometrySource {
    /// The standard vertex/index streams were populated and used
    /// directly.
    LegacyStreams,
    /// Geometry came from the vendor trailing block behind the
    /// lazy-array skip pointer, which is the common case.
    TrailingBlock,
}

/// A fully decoded static-mesh export.
#[derive(Debug, Clone)]
pub struct StaticMesh {
    pub bounds: MeshBounds,
    pub internal_version: i32,
    pub section_shape: SectionShape,
    pub sections: Vec<MeshSection>,
    pub source: GeometrySource,
    pub lods: Vec<LodModel>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sizes() {
        assert_eq!(SectionShape::Short.record_size(), 14);
        assert_eq!(SectionShape::Long.record_size(), 24);
        assert_eq!(Vertex::SIZE, 56);
        assert_eq!(MeshBounds::SIZE, 41);
    }
}
