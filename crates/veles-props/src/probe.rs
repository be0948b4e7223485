//! Property-start probing.
//!
//! Export data usually begins with class/state metadata of a length the
//! export table does not describe. When a caller's guessed offset does not
//! decode, nearby offsets are scored by how plausible a property chain
//! they produce, and the best-scoring one wins.

use veles_common::ByteCursor;

use crate::decoder::{read_array_index, validate_type_size};
use crate::value::PropertyType;

/// How well a property chain starting at `start` holds together.
///
/// One point per structurally consistent property, a large bonus for
/// reaching the terminator name, penalties for names that look like
/// object identifiers rather than property names.
pub(crate) fn score_property_chain(data: &[u8], names: &[String], start: usize) -> i32 {
    let mut cursor = ByteCursor::new_at(data, start);
    let mut score = 0i32;
    let mut seen = 0i32;

    while seen < 100 {
        let name_idx = match cursor.read_compact_index() {
            Ok(idx) => idx,
            Err(_) => break,
        };
        let name = match usize::try_from(name_idx).ok().and_then(|i| names.get(i)) {
            Some(name) => name.as_str(),
            None => break,
        };
        if name == "None" {
            score += 10 + seen * 2;
            break;
        }
        if name.is_empty() || name.len() > 100 {
            break;
        }
        if name.starts_with(|c: char| c.is_ascii_digit()) || name.starts_with('_') {
            score -= 5;
        }
        // Names like "CompoundObject61" are object names, not properties
        if name.ends_with(|c: char| c.is_ascii_digit())
            && name.contains(|c: char| c.is_ascii_alphabetic())
        {
            score -= 3;
        }

        let info = match cursor.read_u8() {
            Ok(b) => b,
            Err(_) => break,
        };
        let prop_type = PropertyType::from_tag(info & 0x0F);
        let size_type = (info >> 4) & 0x07;
        let is_array = info & 0x80 != 0;

        if prop_type == PropertyType::Struct && cursor.read_compact_index().is_err() {
            break;
        }

        let size = match read_declared_size(&mut cursor, prop_type, size_type) {
            Ok(size) => size,
            Err(_) => break,
        };
        if size > cursor.remaining() || !validate_type_size(prop_type, size) {
            break;
        }

        if is_array && prop_type != PropertyType::Bool && read_array_index(&mut cursor).is_err() {
            break;
        }
        cursor.advance(size);
        seen += 1;
        score += 1;
    }
    score
}

/// Find the best property start in `[from, from + window)`, if any offset
/// there scores positively.
pub(crate) fn find_property_start(
    data: &[u8],
    names: &[String],
    from: usize,
    window: usize,
) -> Option<usize> {
    let mut best = None;
    let mut best_score = 0i32;
    for start in from..(from + window).min(data.len()) {
        let score = score_property_chain(data, names, start);
        if score > best_score {
            best_score = score;
            best = Some(start);
        }
    }
    best
}

/// Read the declared payload size. Bool carries none; size classes 0-4 are
/// implicit, 5-7 read an explicit u8/u16/u32 field.
pub(crate) fn read_declared_size(
    cursor: &mut ByteCursor<'_>,
    prop_type: PropertyType,
    size_type: u8,
) -> veles_common::Result<usize> {
    if prop_type == PropertyType::Bool {
        return Ok(0);
    }
    Ok(match size_type {
        0 => 1,
        1 => 2,
        2 => 4,
        3 => 12,
        4 => 16,
        5 => cursor.read_u8()? as usize,
        6 => cursor.read_u16()? as usize,
        _ => cursor.read_u32()? as usize,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veles_common::compact;

    fn names() -> Vec<String> {
        ["None", "DrawScale", "bHidden"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// DrawScale=Float(2.0), bHidden=Bool(true), None.
    fn valid_chain() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&compact::encode(1).unwrap());
        buf.push(0x24); // Float, size class 2 (4 bytes)
        buf.extend_from_slice(&2.0f32.to_le_bytes());
        buf.extend_from_slice(&compact::encode(2).unwrap());
        buf.push(0x83); // Bool, value in array flag
        buf.extend_from_slice(&compact::encode(0).unwrap()); // None
        buf
    }

    #[test]
    fn test_terminated_chain_scores_high() {
        let names = names();
        let chain = valid_chain();
        let score = score_property_chain(&chain, &names, 0);
        // two properties plus the terminator bonus
        assert_eq!(score, 2 + 10 + 2 * 2);
    }

    #[test]
    fn test_probe_finds_offset_past_preamble() {
        let names = names();
        let mut data = vec![0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let preamble = data.len();
        data.extend_from_slice(&valid_chain());
        assert_eq!(find_property_start(&data, &names, 0, 50), Some(preamble));
    }

    #[test]
    fn test_probe_reaches_the_final_byte() {
        let names = names();
        // a bare terminator as the very last byte of the buffer
        let data = [0xF1u8, 0xE2, 0x00];
        assert_eq!(find_property_start(&data, &names, 0, 50), Some(2));
    }

    #[test]
    fn test_garbage_scores_zero() {
        let names = names();
        let data = [0xF1u8, 0xE2, 0xD3, 0xC4, 0xB5, 0xA6];
        assert_eq!(find_property_start(&data, &names, 0, 50), None);
    }
}
