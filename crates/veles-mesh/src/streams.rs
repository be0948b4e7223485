//! Section array and legacy stream parsing.

use veles_common::{ByteCursor, CoverageReport, Detected, Vector3};

use crate::error::{Error, Result};
use crate::types::{
    MeshConfig, MeshSection, SectionLong, SectionShape, SectionShort, Vertex,
};

/// Decide which section record layout a file uses.
///
/// Both layouts occur at the same file version, so the choice is probed:
/// lay the section array out under each candidate and check whether the
/// stream counts that would follow it look sane. When both or neither
/// candidate probes clean the short layout is assumed and flagged.
pub(crate) fn detect_section_shape(
    data: &[u8],
    sections_start: usize,
    section_count: i32,
    config: &MeshConfig,
) -> Detected<SectionShape> {
    let short_ok = probe_stream_chain(
        data,
        sections_start + section_count as usize * SectionShape::Short.record_size(),
        config,
    );
    let long_ok = probe_stream_chain(
        data,
        sections_start + section_count as usize * SectionShape::Long.record_size(),
        config,
    );
    match (short_ok, long_ok) {
        (true, false) => Detected::Confident(SectionShape::Short),
        (false, true) => Detected::Confident(SectionShape::Long),
        (true, true) => Detected::BestEffort(
            SectionShape::Short,
            "both section layouts probe clean".to_string(),
        ),
        (false, false) => Detected::BestEffort(
            SectionShape::Short,
            "no section layout probes clean".to_string(),
        ),
    }
}

/// Whether the legacy stream counts starting at `pos` look like a real
/// stream chain. The vertex stream count is nearly always zero; when it
/// is, the color/alpha/UV counts that follow are checked as well, since a
/// zero can also be random bytes inside a misaligned section array.
fn probe_stream_chain(data: &[u8], pos: usize, config: &MeshConfig) -> bool {
    let mut cursor = ByteCursor::new_at(data, pos);
    let v_count = match cursor.read_i32() {
        Ok(v) => v,
        Err(_) => return false,
    };
    if v_count < 0 || v_count > config.max_stream_count {
        return false;
    }
    if v_count > 0 {
        return true;
    }
    // v_rev, then c_count, c_rev, a_count, a_rev, uv_count
    if cursor.read_i32().is_err() {
        return false;
    }
    for _ in 0..5 {
        match cursor.read_i32() {
            Ok(v) if (0..=config.max_stream_count).contains(&v) => {}
            _ => return false,
        }
    }
    true
}

pub(crate) fn read_sections(
    cursor: &mut ByteCursor<'_>,
    shape: SectionShape,
    count: i32,
) -> Result<Vec<MeshSection>> {
    let mut sections = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let section = match shape {
            SectionShape::Short => MeshSection::Short(SectionShort {
                is_strip: cursor.read_u32()?,
                first_index: cursor.read_u16()?,
                min_vertex_index: cursor.read_u16()?,
                max_vertex_index: cursor.read_u16()?,
                num_triangles: cursor.read_u16()?,
                num_primitives: cursor.read_u16()?,
            }),
            SectionShape::Long => MeshSection::Long(SectionLong {
                is_strip: cursor.read_u32()?,
                first_index: cursor.read_u32()?,
                min_vertex_index: cursor.read_u32()?,
                max_vertex_index: cursor.read_u32()?,
                num_triangles: cursor.read_u32()?,
                num_primitives: cursor.read_u32()?,
            }),
        };
        sections.push(section);
    }
    Ok(sections)
}

/// Geometry lifted from the standard streams, when they are populated.
pub(crate) struct LegacyStreams {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl LegacyStreams {
    pub fn is_populated(&self) -> bool {
        !self.vertices.is_empty()
    }
}

/// Walk the standard vertex/color/alpha/UV/index/wireframe streams and
/// the collision arrays.
///
/// In observed files these streams are almost always empty, with the real
/// geometry living in the vendor trailing block, but they still occupy
/// bytes that must be walked to reach the lazy-array skip pointer.
pub(crate) fn walk_legacy_streams(
    cursor: &mut ByteCursor<'_>,
    config: &MeshConfig,
    coverage: &mut CoverageReport,
) -> Result<LegacyStreams> {
    // vertex stream: 24-byte position + normal records, then a revision
    let start = cursor.position();
    let v_count = read_count(cursor, "legacy vertex", config)?;
    let mut vertices = Vec::with_capacity(v_count);
    for _ in 0..v_count {
        vertices.push(Vertex {
            position: read_vector3(cursor)?,
            normal: read_vector3(cursor)?,
            ..Vertex::default()
        });
    }
    cursor.read_i32()?;
    coverage.explain(start, cursor.position(), "vertex stream");

    let start = cursor.position();
    let c_count = read_count(cursor, "color", config)?;
    cursor.read_bytes(c_count * 4)?;
    cursor.read_i32()?;
    let a_count = read_count(cursor, "alpha", config)?;
    cursor.read_bytes(a_count * 4)?;
    cursor.read_i32()?;
    coverage.explain(start, cursor.position(), "color/alpha streams");

    let start = cursor.position();
    let uv_stream_count = read_count(cursor, "uv stream", config)?;
    for _ in 0..uv_stream_count {
        let uv_count = read_count(cursor, "uv", config)?;
        cursor.read_bytes(uv_count * 8)?;
        cursor.read_i32()?; // coord index
        cursor.read_i32()?; // revision
    }
    coverage.explain(start, cursor.position(), "uv streams");

    let start = cursor.position();
    let i_count = read_count(cursor, "index", config)?;
    let index_bytes = cursor.read_bytes(i_count * 2)?;
    let indices = index_bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    cursor.read_i32()?;
    let w_count = read_count(cursor, "wireframe", config)?;
    cursor.read_bytes(w_count * 2)?;
    cursor.read_i32()?;
    coverage.explain(start, cursor.position(), "index/wireframe streams");

    let start = cursor.position();
    cursor.read_i32()?; // collision model ref
    let ct_count = read_count(cursor, "collision triangle", config)?;
    cursor.read_bytes(ct_count * 10)?;
    let cn_count = read_count(cursor, "collision node", config)?;
    cursor.read_bytes(cn_count * 33)?;
    coverage.explain(start, cursor.position(), "collision data");

    Ok(LegacyStreams { vertices, indices })
}

fn read_count(cursor: &mut ByteCursor<'_>, field: &'static str, config: &MeshConfig) -> Result<usize> {
    let count = cursor.read_i32()?;
    if count < 0 || count > config.max_stream_count {
        return Err(Error::ImplausibleCount {
            field,
            count: count as i64,
        });
    }
    Ok(count as usize)
}

pub(crate) fn read_vector3(cursor: &mut ByteCursor<'_>) -> veles_common::Result<Vector3> {
    Ok(Vector3::new(
        cursor.read_f32()?,
        cursor.read_f32()?,
        cursor.read_f32()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_i32(buf: &mut Vec<u8>, v: i32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    /// An empty stream chain: v_count 0, v_rev, then c/a/uv counts and
    /// revisions all zero.
    fn empty_stream_chain() -> Vec<u8> {
        let mut buf = Vec::new();
        for _ in 0..7 {
            push_i32(&mut buf, 0);
        }
        buf
    }

    #[test]
    fn test_shape_detection_prefers_clean_probe() {
        // one section in the short layout, then an empty stream chain
        let mut data = vec![0xEEu8; 14];
        data.extend_from_slice(&empty_stream_chain());

        let detected = detect_section_shape(&data, 0, 1, &MeshConfig::default());
        assert_eq!(*detected.value(), SectionShape::Short);
        assert!(detected.is_confident());
    }

    #[test]
    fn test_shape_detection_long_layout() {
        let mut data = vec![0xEEu8; 24];
        data.extend_from_slice(&empty_stream_chain());

        let detected = detect_section_shape(&data, 0, 1, &MeshConfig::default());
        assert_eq!(*detected.value(), SectionShape::Long);
        assert!(detected.is_confident());
    }

    #[test]
    fn test_ambiguous_shape_falls_back_to_short() {
        // zero sections: both layouts land on the same offset
        let data = empty_stream_chain();
        let detected = detect_section_shape(&data, 0, 0, &MeshConfig::default());
        assert_eq!(*detected.value(), SectionShape::Short);
        assert!(!detected.is_confident());
    }

    #[test]
    fn test_walk_empty_streams() {
        let mut data = Vec::new();
        // vertex, color, alpha streams: count + revision each
        for _ in 0..6 {
            push_i32(&mut data, 0);
        }
        push_i32(&mut data, 0); // uv stream count
        for _ in 0..4 {
            push_i32(&mut data, 0); // index + wireframe counts and revisions
        }
        push_i32(&mut data, -1); // collision model ref
        push_i32(&mut data, 0); // collision triangles
        push_i32(&mut data, 0); // collision nodes

        let mut cursor = ByteCursor::new(&data);
        let mut coverage = CoverageReport::new(data.len());
        let streams = walk_legacy_streams(&mut cursor, &MeshConfig::default(), &mut coverage).unwrap();
        assert!(!streams.is_populated());
        assert_eq!(cursor.position(), data.len());
        assert_eq!(coverage.bytes_explained(), data.len());
    }

    #[test]
    fn test_populated_vertex_stream() {
        let mut data = Vec::new();
        push_i32(&mut data, 2); // vertex count
        for v in 0..2 {
            for f in [v as f32, 1.0, 2.0, 0.0, 0.0, 1.0] {
                data.extend_from_slice(&f.to_le_bytes());
            }
        }
        push_i32(&mut data, 1); // revision
        for _ in 0..4 {
            push_i32(&mut data, 0); // color/alpha
        }
        push_i32(&mut data, 0); // uv stream count
        push_i32(&mut data, 3); // index count
        data.extend_from_slice(&[0u8, 0, 1, 0, 2, 0]);
        push_i32(&mut data, 1); // index revision
        push_i32(&mut data, 0); // wireframe count
        push_i32(&mut data, 0); // wireframe revision
        push_i32(&mut data, -1); // collision model ref
        push_i32(&mut data, 0);
        push_i32(&mut data, 0);

        let mut cursor = ByteCursor::new(&data);
        let mut coverage = CoverageReport::new(data.len());
        let streams = walk_legacy_streams(&mut cursor, &MeshConfig::default(), &mut coverage).unwrap();
        assert!(streams.is_populated());
        assert_eq!(streams.vertices.len(), 2);
        assert_eq!(streams.vertices[1].position, Vector3::new(1.0, 1.0, 2.0));
        assert_eq!(streams.indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_negative_count_is_an_error() {
        let mut data = Vec::new();
        push_i32(&mut data, -5);
        let mut cursor = ByteCursor::new(&data);
        let mut coverage = CoverageReport::new(data.len());
        assert!(matches!(
            walk_legacy_streams(&mut cursor, &MeshConfig::default(), &mut coverage),
            Err(Error::ImplausibleCount { field: "legacy vertex", .. })
        ));
    }
}
