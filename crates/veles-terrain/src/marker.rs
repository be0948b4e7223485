//! Payload size-marker location, shared by the heightmap and texture
//! decoders.
//!
//! The header region before the pixel data repeats the payload size in
//! several places, and unrelated fields can coincidentally hold the same
//! value, so the size alone does not pin the payload start. The rule
//! recovered from observed files: among all occurrences of the
//! little-endian size in the header prefix, the last one followed by
//! non-zero bytes is the true marker. Matches sitting on pure zero
//! padding are rejected.

use veles_common::memchr::memmem;
use veles_common::Detected;

/// Bytes after the marker inspected for the all-zero padding rejection.
const PADDING_PROBE: usize = 8;

/// Find the payload start for a payload of `expected` bytes.
///
/// Scans the first `window` bytes of `data` and returns the offset just
/// past the accepted marker. The result is a best effort when a later
/// candidate had to be rejected as padding.
pub(crate) fn find_payload_start(
    data: &[u8],
    expected: u32,
    window: usize,
) -> Option<Detected<usize>> {
    let prefix = &data[..window.min(data.len())];
    let needle = expected.to_le_bytes();
    let candidates: Vec<usize> = memmem::find_iter(prefix, &needle).collect();

    for (back, &pos) in candidates.iter().rev().enumerate() {
        let payload = pos + needle.len();
        let probe = &data[payload.min(data.len())..(payload + PADDING_PROBE).min(data.len())];
        if probe.iter().any(|&b| b != 0) {
            return Some(if back == 0 {
                Detected::Confident(payload)
            } else {
                Detected::BestEffort(
                    payload,
                    format!("{back} later size marker(s) rejected as zero padding"),
                )
            });
        }
    }
    None
}
