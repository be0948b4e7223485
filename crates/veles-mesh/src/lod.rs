//! Per-LOD header detection, vertex block and index-buffer scan.

use veles_common::{ByteCursor, CoverageReport};

use crate::streams::read_vector3;
use crate::types::{LodHeaderShape, LodModel, MeshConfig, Vertex};

/// Why the LOD loop stopped early.
pub(crate) enum LodStop {
    /// Neither header interpretation gave a believable vertex count.
    UnrecognizedHeader,
    /// The claimed vertex block runs past the end of the buffer.
    TruncatedVertices,
}

/// Read one LOD model at the cursor position.
///
/// The header is either three or four `u32` fields with the vertex count
/// last; nothing tags which, so both are tried against a sane-count bound.
/// Returns `Err` with a stop reason when this LOD cannot be decoded; the
/// caller keeps the LODs decoded so far.
pub(crate) fn read_lod(
    cursor: &mut ByteCursor<'_>,
    config: &MeshConfig,
    coverage: &mut CoverageReport,
    lod_index: usize,
) -> Result<LodModel, LodStop> {
    let header_start = cursor.position();

    let mut header = [0u32; 3];
    for field in &mut header {
        *field = cursor.read_u32().map_err(|_| LodStop::UnrecognizedHeader)?;
    }

    let fits = |count: u32, cursor: &ByteCursor<'_>| {
        count <= config.max_vertices && count as usize * Vertex::SIZE <= cursor.remaining()
    };

    let (shape, vertex_count) = if fits(header[2], cursor) {
        (LodHeaderShape::Compact, header[2])
    } else {
        let fourth = cursor.read_u32().map_err(|_| LodStop::UnrecognizedHeader)?;
        if fits(fourth, cursor) {
            coverage.flag_heuristics();
            (LodHeaderShape::Extended, fourth)
        } else if header[2] as usize * Vertex::SIZE > cursor.remaining()
            && header[2] <= config.max_vertices
        {
            return Err(LodStop::TruncatedVertices);
        } else {
            return Err(LodStop::UnrecognizedHeader);
        }
    };
    coverage.explain(
        header_start,
        cursor.position(),
        format!("lod[{lod_index}] header"),
    );

    let vertex_start = cursor.position();
    let mut vertices = Vec::with_capacity(vertex_count as usize);
    for _ in 0..vertex_count {
        let mut vertex = Vertex {
            position: read_vector3(cursor).map_err(|_| LodStop::TruncatedVertices)?,
            normal: read_vector3(cursor).map_err(|_| LodStop::TruncatedVertices)?,
            tangent_x: read_vector3(cursor).map_err(|_| LodStop::TruncatedVertices)?,
            tangent_y: read_vector3(cursor).map_err(|_| LodStop::TruncatedVertices)?,
            u: cursor.read_f32().map_err(|_| LodStop::TruncatedVertices)?,
            v: cursor.read_f32().map_err(|_| LodStop::TruncatedVertices)?,
        };
        if !vertex.position.is_plausible(config.position_limit) {
            // header bytes misread as floats; zero the position so index
            // buffers stay valid, and leave a trace
            vertex.position = Default::default();
            coverage.note_anomalies(1);
        }
        vertices.push(vertex);
    }
    coverage.explain(
        vertex_start,
        cursor.position(),
        format!("lod[{lod_index}] vertices"),
    );

    let indices = scan_index_buffer(cursor, vertex_count, config, coverage, lod_index);

    Ok(LodModel {
        header_shape: Some(shape),
        vertices,
        indices,
    })
}

/// Probe the count-prefixed `u16` arrays after the vertex block for the
/// one that is actually the index buffer.
///
/// Several arrays of unknown purpose follow the vertices. A candidate is
/// plausible when its count is in range and nearly all of its values are
/// valid vertex indices; the largest plausible candidate is taken as the
/// main geometry.
fn scan_index_buffer(
    cursor: &mut ByteCursor<'_>,
    vertex_count: u32,
    config: &MeshConfig,
    coverage: &mut CoverageReport,
    lod_index: usize,
) -> Vec<u16> {
    let mut best: Vec<u16> = Vec::new();
    let mut best_span = None;

    for slot in 0..config.index_scan_slots {
        if cursor.remaining() < 4 {
            break;
        }
        let start = cursor.position();
        let count = match cursor.read_u32() {
            Ok(c) => c,
            Err(_) => break,
        };
        if count == 0 {
            coverage.explain(start, cursor.position(), format!("lod[{lod_index}] empty array"));
            continue;
        }
        if count > config.max_indices || count as usize * 2 > cursor.remaining() {
            cursor.seek(start);
            break;
        }
        let bytes = match cursor.read_bytes(count as usize * 2) {
            Ok(b) => b,
            Err(_) => {
                cursor.seek(start);
                break;
            }
        };
        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        let invalid = words.iter().filter(|&&w| w as u32 >= vertex_count).count();
        let tolerated = ((count as usize) / 20).max(1);
        if count >= config.min_indices && invalid < tolerated && words.len() > best.len() {
            best = words;
            best_span = Some((start, cursor.position()));
        } else {
            coverage.explain(
                start,
                cursor.position(),
                format!("lod[{lod_index}] array[{slot}]"),
            );
        }
    }
    if let Some((start, end)) = best_span {
        coverage.explain(start, end, format!("lod[{lod_index}] indices"));
    }
    best
}
