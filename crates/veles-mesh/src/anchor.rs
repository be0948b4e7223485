//! Core-block anchor scanning.
//!
//! The standard mesh block (bounds, internal version, sections) does not
//! start at the property terminator: observed files leave a gap of a few
//! bytes whose meaning is unknown and whose length varies per file. The
//! bounding volumes carry no recognizable magic, but the internal version
//! integer that follows them is drawn from a small known set, so the scan
//! keys on it.

use veles_common::{ByteCursor, Detected};

use crate::error::{Error, Result};
use crate::types::{MeshBounds, MeshConfig};

/// Find the start of the core block at or shortly after `from`.
///
/// For each candidate gap the `i32` at `gap + 41` (past box and sphere)
/// is tested against the configured known-version set. A zero gap is the
/// documented layout; any other gap is a best effort.
pub(crate) fn find_core_anchor(
    data: &[u8],
    from: usize,
    config: &MeshConfig,
) -> Result<Detected<usize>> {
    for gap in 0..=config.anchor_window {
        let version_pos = from + gap + MeshBounds::SIZE;
        let cursor = ByteCursor::new_at(data, version_pos);
        let version = match cursor.peek_i32() {
            Ok(v) => v,
            Err(_) => break,
        };
        if config.known_versions.contains(&version) {
            let anchor = from + gap;
            return Ok(if gap == 0 {
                Detected::Confident(anchor)
            } else {
                Detected::BestEffort(
                    anchor,
                    format!("core anchor {gap} bytes past the property block"),
                )
            });
        }
    }
    Err(Error::UnrecognizedMeshCore {
        from,
        searched: config.anchor_window,
    })
}
