//! Static-mesh decode orchestration.

use veles_common::{ByteCursor, CoverageReport};

use crate::anchor::find_core_anchor;
use crate::error::{Error, Result};
use crate::lod::{read_lod, LodStop};
use crate::streams::{detect_section_shape, read_sections, walk_legacy_streams};
use crate::types::{GeometrySource, LodModel, MeshBounds, MeshConfig, StaticMesh};

/// A decoded mesh together with the byte accounting of the pass.
#[derive(Debug)]
pub struct DecodedMesh {
    pub mesh: StaticMesh,
    pub coverage: CoverageReport,
}

/// Decoder for static-mesh export payloads.
///
/// The payload starts with a tagged property block; `decode` takes over at
/// its end. The layout past the core block is not version-tagged, so the
/// decoder leans on bounded scans and plausibility checks, and reports
/// every guess it had to make through the [`CoverageReport`].
///
/// # Example
///
/// ```no_run
/// use veles_mesh::StaticMeshDecoder;
///
/// # fn demo(serial: &[u8], property_end: usize, serial_offset: u32) -> veles_mesh::Result<()> {
/// let decoded = StaticMeshDecoder::new().decode(serial, property_end, serial_offset)?;
/// for lod in &decoded.mesh.lods {
///     println!("{} vertices, {} triangles", lod.vertices.len(), lod.triangle_count());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct StaticMeshDecoder {
    config: MeshConfig,
}

impl StaticMeshDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MeshConfig) -> Self {
        Self { config }
    }

    /// Decode a static-mesh export payload.
    ///
    /// `data` is the full serial payload, `property_end` the offset just
    /// past the property terminator, and `serial_offset` the payload's
    /// absolute position in the container file, needed because the
    /// lazy-array skip pointer stores an absolute file offset.
    pub fn decode(
        &self,
        data: &[u8],
        property_end: usize,
        serial_offset: u32,
    ) -> Result<DecodedMesh> {
        let config = &self.config;
        let mut coverage = CoverageReport::new(data.len());
        coverage.explain(0, property_end, "properties");

        let anchor = find_core_anchor(data, property_end, config)?.record_in(&mut coverage);
        if anchor > property_end {
            coverage.mark_unknown_labeled(
                property_end,
                anchor,
                Some("pre-core gap".to_string()),
            );
        }

        let mut cursor = ByteCursor::new_at(data, anchor);
        let bounds = read_bounds(&mut cursor)?;
        let internal_version = cursor.read_i32()?;
        let section_count = cursor.read_i32()?;
        if section_count < 0 || section_count > config.max_sections {
            return Err(Error::ImplausibleCount {
                field: "section",
                count: section_count as i64,
            });
        }

        let section_shape = detect_section_shape(data, cursor.position(), section_count, config)
            .record_in(&mut coverage);
        let sections = read_sections(&mut cursor, section_shape, section_count)?;
        coverage.explain(anchor, cursor.position(), "mesh core");

        let legacy = walk_legacy_streams(&mut cursor, config, &mut coverage)?;
        if legacy.is_populated() {
            coverage.mark_unknown_labeled(
                cursor.position(),
                data.len(),
                Some("post_stream_data".to_string()),
            );
            return Ok(DecodedMesh {
                mesh: StaticMesh {
                    bounds,
                    internal_version,
                    section_shape,
                    sections,
                    source: GeometrySource::LegacyStreams,
                    lods: vec![LodModel {
                        header_shape: None,
                        vertices: legacy.vertices,
                        indices: legacy.indices,
                    }],
                },
                coverage,
            });
        }

        // the streams were empty; the geometry lives behind the lazy-array
        // skip pointer in the vendor trailing block
        let target = self.seek_past_skip(data, &mut cursor, serial_offset, &mut coverage)?;
        cursor.seek(target);

        let lods = self.read_lods(&mut cursor, &mut coverage);
        coverage.mark_unknown_labeled(
            cursor.position(),
            data.len(),
            Some("post_lod_data".to_string()),
        );

        Ok(DecodedMesh {
            mesh: StaticMesh {
                bounds,
                internal_version,
                section_shape,
                sections,
                source: GeometrySource::TrailingBlock,
                lods,
            },
            coverage,
        })
    }

    /// Locate the lazy-array skip signature near the cursor and return the
    /// local offset it points past.
    ///
    /// The signature is a run of six zero bytes followed by a `u32`
    /// absolute file offset. A match found at a nonzero scan offset means
    /// the stream walk drifted, so the jump is recorded as forced.
    fn seek_past_skip(
        &self,
        data: &[u8],
        cursor: &mut ByteCursor<'_>,
        serial_offset: u32,
        coverage: &mut CoverageReport,
    ) -> Result<usize> {
        let from = cursor.position();
        for off in 0..self.config.skip_scan_window {
            let pos = from + off;
            if pos + 10 > data.len() {
                break;
            }
            if data[pos..pos + 6].iter().any(|&b| b != 0) {
                continue;
            }
            let absolute = u32::from_le_bytes([
                data[pos + 6],
                data[pos + 7],
                data[pos + 8],
                data[pos + 9],
            ]);
            let target = match absolute.checked_sub(serial_offset) {
                Some(t) => t as usize,
                None => continue,
            };
            if target <= pos + 10 || target > data.len() {
                continue;
            }
            if off > 0 {
                coverage.flag_forced_skip();
                coverage.mark_unknown_labeled(from, pos, Some("pre-skip gap".to_string()));
            }
            coverage.explain(pos, pos + 10, "lazy-array skip pointer");
            coverage.explain(pos + 10, target, "raw triangles");
            return Ok(target);
        }
        Err(Error::SkipPointerNotFound {
            from,
            searched: self.config.skip_scan_window,
        })
    }

    /// Read the post-skip header and the LOD models it announces.
    ///
    /// A decode failure partway through keeps the LODs already read and
    /// leaves the rest of the buffer to the caller's unknown marking.
    fn read_lods(
        &self,
        cursor: &mut ByteCursor<'_>,
        coverage: &mut CoverageReport,
    ) -> Vec<LodModel> {
        let config = &self.config;
        let header_start = cursor.position();
        let lod_count = match self.read_lod_count(cursor, coverage) {
            Ok(c) => c,
            Err(_) => {
                coverage.note_anomalies(1);
                return Vec::new();
            }
        };
        coverage.explain(header_start, cursor.position(), "post-skip header");
        if lod_count <= 0 || lod_count > config.max_lods {
            coverage.note_anomalies(1);
            return Vec::new();
        }

        let mut lods = Vec::with_capacity(lod_count as usize);
        for lod_index in 0..lod_count as usize {
            let lod_start = cursor.position();
            match read_lod(cursor, config, coverage, lod_index) {
                Ok(lod) => lods.push(lod),
                Err(LodStop::UnrecognizedHeader) | Err(LodStop::TruncatedVertices) => {
                    cursor.seek(lod_start);
                    break;
                }
            }
        }
        lods
    }

    /// Read physics and authoring fields, then the LOD count.
    ///
    /// Some files carry an extra flag integer before the count; when the
    /// value in the count slot is itself an unbelievable count it is taken
    /// as that flag and the real count read behind it.
    fn read_lod_count(
        &self,
        cursor: &mut ByteCursor<'_>,
        coverage: &mut CoverageReport,
    ) -> Result<i32> {
        cursor.read_i32()?; // physics properties ref
        cursor.read_i32()?; // authoring tool version
        let flag_or_count = cursor.read_i32()?;
        if flag_or_count > self.config.max_lods {
            coverage.flag_heuristics();
            let count = cursor.read_i32()?;
            return Ok(count);
        }
        if flag_or_count > 0 {
            return Ok(flag_or_count);
        }
        let mut count = cursor.read_i32()?;
        if count == 0 && cursor.remaining() >= 4 {
            coverage.flag_heuristics();
            count = cursor.read_i32()?;
        }
        Ok(count)
    }
}

fn read_bounds(cursor: &mut ByteCursor<'_>) -> veles_common::Result<MeshBounds> {
    Ok(MeshBounds {
        box_min: crate::streams::read_vector3(cursor)?,
        box_max: crate::streams::read_vector3(cursor)?,
        box_valid: cursor.read_u8()? != 0,
        sphere_center: crate::streams::read_vector3(cursor)?,
        sphere_radius: cursor.read_f32()?,
    })
}
