//! The tagged property stream walker.

use veles_common::{ByteCursor, CoverageReport, Rotator, Vector3};

use crate::error::{Error, Result};
use crate::probe::{find_property_start, read_declared_size};
use crate::value::{PropertyType, PropertyValue, StructValue, TaggedProperty};

/// The sentinel name terminating a property list.
pub const TERMINATOR: &str = "None";

/// How the decoder settled on its start position.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyStart {
    /// The caller's offset decoded cleanly.
    AsGiven,
    /// The caller's offset did not decode; a nearby offset was probed
    /// and used instead.
    Probed { offset: usize },
    /// The stream was empty or led with the terminator.
    Empty,
}

/// The result of walking one export's property stream.
#[derive(Debug, Clone)]
pub struct DecodedProperties {
    /// Properties in stream order. Duplicate names can occur for
    /// static-array slots; lookups return the first match.
    pub properties: Vec<TaggedProperty>,
    /// Position immediately after the terminator name. Callers use this
    /// as the anchor for the binary sections that follow.
    pub end: usize,
    /// How the start position was settled.
    pub start: PropertyStart,
    /// Byte accounting over the walked span.
    pub coverage: CoverageReport,
}

impl DecodedProperties {
    /// First property with this name, if any.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(PropertyValue::as_int)
    }

    pub fn get_float(&self, name: &str) -> Option<f32> {
        self.get(name).and_then(PropertyValue::as_float)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropertyValue::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(PropertyValue::as_bool)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }
}

/// Walks the self-describing property stream at the start of an export.
///
/// Each entry is `[name index][info byte][struct name?][size?][array
/// index?][payload]`. The info byte packs the type tag in its low nibble,
/// a size class in bits 4-6 and an array flag in bit 7. The walk stops at
/// the terminator name and reports the position after it.
pub struct PropertyDecoder<'n> {
    names: &'n [String],
    max_properties: usize,
    probe_window: usize,
}

impl<'n> PropertyDecoder<'n> {
    pub fn new(names: &'n [String]) -> Self {
        Self {
            names,
            max_properties: 200,
            probe_window: 50,
        }
    }

    /// Override the start-probe window (in bytes).
    pub fn with_probe_window(mut self, window: usize) -> Self {
        self.probe_window = window;
        self
    }

    /// Decode the property stream of `data` starting at `start`.
    ///
    /// When `start` does not decode, nearby offsets are probed; the
    /// fallback is recorded in [`DecodedProperties::start`] and flagged as
    /// a heuristic in the coverage report. Fails only when no offset in
    /// the probe window yields a plausible chain.
    pub fn decode(&self, data: &[u8], start: usize) -> Result<DecodedProperties> {
        let mut coverage = CoverageReport::new(data.len());

        if start >= data.len() {
            return Ok(DecodedProperties {
                properties: Vec::new(),
                end: start.min(data.len()),
                start: PropertyStart::Empty,
                coverage,
            });
        }

        match self.walk(data, start, &mut coverage) {
            Some(decoded) => Ok(decoded),
            None => {
                let probed = find_property_start(data, self.names, start, self.probe_window)
                    .filter(|&offset| offset != start)
                    .ok_or(Error::StartNotFound {
                        given: start,
                        searched: self.probe_window,
                    })?;

                let mut coverage = CoverageReport::new(data.len());
                coverage.flag_heuristics();
                coverage.mark_unknown_labeled(
                    start,
                    probed,
                    Some("pre-property preamble".to_string()),
                );
                let mut decoded =
                    self.walk(data, probed, &mut coverage)
                        .ok_or(Error::StartNotFound {
                            given: start,
                            searched: self.probe_window,
                        })?;
                decoded.start = PropertyStart::Probed { offset: probed };
                Ok(decoded)
            }
        }
    }

    /// Walk the stream at `start`. Returns `None` when the very first
    /// entry is not decodable, which signals the caller to re-probe.
    fn walk(
        &self,
        data: &[u8],
        start: usize,
        coverage: &mut CoverageReport,
    ) -> Option<DecodedProperties> {
        let mut cursor = ByteCursor::new_at(data, start);
        let mut properties = Vec::new();

        loop {
            let prop_start = cursor.position();

            let name = match self.read_name(&mut cursor) {
                Some(name) => name,
                None if properties.is_empty() => return None,
                None => {
                    // Mid-stream desync: keep what decoded, give up on
                    // the rest of the buffer.
                    coverage.mark_unknown_labeled(
                        prop_start,
                        data.len(),
                        Some("property stream desync".to_string()),
                    );
                    coverage.note_anomalies(1);
                    return Some(DecodedProperties {
                        properties,
                        end: prop_start,
                        start: PropertyStart::AsGiven,
                        coverage: std::mem::take(coverage),
                    });
                }
            };

            if name == TERMINATOR {
                coverage.explain(prop_start, cursor.position(), "terminator");
                let start_mode = if properties.is_empty() {
                    PropertyStart::Empty
                } else {
                    PropertyStart::AsGiven
                };
                return Some(DecodedProperties {
                    properties,
                    end: cursor.position(),
                    start: start_mode,
                    coverage: std::mem::take(coverage),
                });
            }

            match self.read_property(&mut cursor, name) {
                Some(prop) if properties.len() < self.max_properties => {
                    coverage.explain(prop_start, cursor.position(), format!("prop {}", prop.name));
                    properties.push(prop);
                }
                _ if properties.is_empty() => return None,
                _ => {
                    coverage.mark_unknown_labeled(
                        prop_start,
                        data.len(),
                        Some("property stream desync".to_string()),
                    );
                    coverage.note_anomalies(1);
                    return Some(DecodedProperties {
                        properties,
                        end: prop_start,
                        start: PropertyStart::AsGiven,
                        coverage: std::mem::take(coverage),
                    });
                }
            }
        }
    }

    fn read_name(&self, cursor: &mut ByteCursor<'_>) -> Option<String> {
        let index = cursor.read_compact_index().ok()?;
        let name = usize::try_from(index).ok().and_then(|i| self.names.get(i))?;
        if name.is_empty() || name.len() > 100 {
            return None;
        }
        Some(name.clone())
    }

    /// Read one property after its name. `None` means the structure no
    /// longer makes sense at this position.
    fn read_property(&self, cursor: &mut ByteCursor<'_>, name: String) -> Option<TaggedProperty> {
        let info = cursor.read_u8().ok()?;
        let prop_type = PropertyType::from_tag(info & 0x0F);
        let size_type = (info >> 4) & 0x07;
        let is_array = info & 0x80 != 0;

        let struct_name = if prop_type == PropertyType::Struct {
            let index = cursor.read_compact_index().ok()?;
            usize::try_from(index)
                .ok()
                .and_then(|i| self.names.get(i))
                .cloned()
        } else {
            None
        };

        let size = read_declared_size(cursor, prop_type, size_type).ok()?;
        if size > cursor.remaining() || !validate_type_size(prop_type, size) {
            return None;
        }

        let array_index = if is_array && prop_type != PropertyType::Bool {
            read_array_index(cursor).ok()?
        } else {
            0
        };

        let payload = cursor.read_bytes(size).ok()?;
        let value = decode_value(prop_type, payload, struct_name.as_deref(), is_array, self.names);

        Some(TaggedProperty {
            name,
            prop_type,
            size,
            array_index,
            struct_name,
            value,
        })
    }
}

/// Whether a declared (type, size) pair is structurally possible. A
/// mismatch means the walk is reading non-property bytes.
pub(crate) fn validate_type_size(prop_type: PropertyType, size: usize) -> bool {
    match prop_type {
        PropertyType::Invalid(_) | PropertyType::None => false,
        PropertyType::Byte => size == 1,
        PropertyType::Int | PropertyType::Float => size == 4,
        PropertyType::Bool => size == 0,
        PropertyType::Vector | PropertyType::Rotator => size == 12,
        PropertyType::String | PropertyType::Str => size >= 2,
        _ => true,
    }
}

/// The static-array slot index: one byte below 128, two bytes below
/// 16384, four bytes beyond.
pub(crate) fn read_array_index(cursor: &mut ByteCursor<'_>) -> veles_common::Result<u32> {
    let b = cursor.read_u8()?;
    if b < 0x80 {
        Ok(b as u32)
    } else if b & 0x40 == 0 {
        let b1 = cursor.read_u8()?;
        Ok((((b & 0x3F) as u32) << 8) | b1 as u32)
    } else {
        let b1 = cursor.read_u8()?;
        let b2 = cursor.read_u8()?;
        let b3 = cursor.read_u8()?;
        Ok((((b & 0x3F) as u32) << 24) | ((b1 as u32) << 16) | ((b2 as u32) << 8) | b3 as u32)
    }
}

fn decode_value(
    prop_type: PropertyType,
    payload: &[u8],
    struct_name: Option<&str>,
    array_flag: bool,
    names: &[String],
) -> PropertyValue {
    let mut cursor = ByteCursor::new(payload);
    match prop_type {
        PropertyType::Byte => PropertyValue::Byte(payload[0]),
        PropertyType::Int => match cursor.read_i32() {
            Ok(v) => PropertyValue::Int(v),
            Err(_) => PropertyValue::Raw(payload.to_vec()),
        },
        PropertyType::Bool => PropertyValue::Bool(array_flag),
        PropertyType::Float => match cursor.read_f32() {
            Ok(v) => PropertyValue::Float(v),
            Err(_) => PropertyValue::Raw(payload.to_vec()),
        },
        PropertyType::Object | PropertyType::Class => match cursor.read_compact_index() {
            Ok(index) => PropertyValue::Object(index),
            Err(_) => PropertyValue::Raw(payload.to_vec()),
        },
        PropertyType::Name => {
            let resolved = cursor
                .read_compact_index()
                .ok()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| names.get(i));
            match resolved {
                Some(name) => PropertyValue::Name(name.clone()),
                None => PropertyValue::Raw(payload.to_vec()),
            }
        }
        PropertyType::String | PropertyType::Str => match cursor.read_string() {
            Ok(s) => PropertyValue::Str(s),
            Err(_) => PropertyValue::Raw(payload.to_vec()),
        },
        PropertyType::Array => match cursor.read_compact_index() {
            Ok(count) if count >= 0 => PropertyValue::Array {
                count,
                data: payload[cursor.position()..].to_vec(),
            },
            _ => PropertyValue::Raw(payload.to_vec()),
        },
        PropertyType::Struct => {
            PropertyValue::Struct(decode_struct(struct_name.unwrap_or(""), payload))
        }
        PropertyType::Vector => match read_vector3(&mut cursor) {
            Some(v) => PropertyValue::Vector(v),
            None => PropertyValue::Raw(payload.to_vec()),
        },
        PropertyType::Rotator => match read_rotator(&mut cursor) {
            Some(r) => PropertyValue::Rotator(r),
            None => PropertyValue::Raw(payload.to_vec()),
        },
        PropertyType::None | PropertyType::Invalid(_) => PropertyValue::Raw(payload.to_vec()),
    }
}

/// Decode a struct payload by its declared type name. Unknown names or
/// unexpected sizes keep the bytes verbatim.
fn decode_struct(name: &str, payload: &[u8]) -> StructValue {
    let mut cursor = ByteCursor::new(payload);
    match (name, payload.len()) {
        ("Vector" | "Location" | "ColLocation" | "Min" | "Max", 12) => {
            match read_vector3(&mut cursor) {
                Some(v) => StructValue::Vector(v),
                None => raw_struct(name, payload),
            }
        }
        ("Rotator", 12) => match read_rotator(&mut cursor) {
            Some(r) => StructValue::Rotator(r),
            None => raw_struct(name, payload),
        },
        ("Color", 4) => StructValue::Color {
            r: payload[0],
            g: payload[1],
            b: payload[2],
            a: payload[3],
        },
        ("Scale" | "MainScale" | "PostScale" | "DrawScale3D", 12) => {
            match read_vector3(&mut cursor) {
                Some(v) => StructValue::Scale(v),
                None => raw_struct(name, payload),
            }
        }
        ("Range" | "LifetimeRange" | "StartSizeRange", 8) => {
            match (cursor.read_f32(), cursor.read_f32()) {
                (Ok(min), Ok(max)) => StructValue::Range { min, max },
                _ => raw_struct(name, payload),
            }
        }
        ("Plane", 16) => {
            let mut vals = [0.0f32; 4];
            for v in &mut vals {
                match cursor.read_f32() {
                    Ok(f) => *v = f,
                    Err(_) => return raw_struct(name, payload),
                }
            }
            StructValue::Plane {
                x: vals[0],
                y: vals[1],
                z: vals[2],
                w: vals[3],
            }
        }
        ("Box", n) if n >= 24 => match (read_vector3(&mut cursor), read_vector3(&mut cursor)) {
            (Some(min), Some(max)) => StructValue::Box { min, max },
            _ => raw_struct(name, payload),
        },
        ("Guid", 16) => {
            let mut vals = [0u32; 4];
            for v in &mut vals {
                match cursor.read_u32() {
                    Ok(u) => *v = u,
                    Err(_) => return raw_struct(name, payload),
                }
            }
            StructValue::Guid(vals)
        }
        _ => raw_struct(name, payload),
    }
}

fn raw_struct(name: &str, payload: &[u8]) -> StructValue {
    StructValue::Raw {
        name: name.to_string(),
        data: payload.to_vec(),
    }
}

fn read_vector3(cursor: &mut ByteCursor<'_>) -> Option<Vector3> {
    Some(Vector3::new(
        cursor.read_f32().ok()?,
        cursor.read_f32().ok()?,
        cursor.read_f32().ok()?,
    ))
}

fn read_rotator(cursor: &mut ByteCursor<'_>) -> Option<Rotator> {
    Some(Rotator {
        pitch: cursor.read_i32().ok()?,
        yaw: cursor.read_i32().ok()?,
        roll: cursor.read_i32().ok()?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use veles_common::compact;

    fn names(extra: &[&str]) -> Vec<String> {
        let mut names = vec!["None".to_string()];
        names.extend(extra.iter().map(|s| s.to_string()));
        names
    }

    fn push_compact(buf: &mut Vec<u8>, value: i64) {
        buf.extend_from_slice(&compact::encode(value).unwrap());
    }

    #[test]
    fn test_empty_stream() {
        let names = names(&[]);
        let decoder = PropertyDecoder::new(&names);
        let decoded = decoder.decode(&[], 0).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.start, PropertyStart::Empty);
        assert_eq!(decoded.end, 0);
        assert_eq!(decoded.coverage.bytes_unknown(), 0);
    }

    #[test]
    fn test_terminator_only() {
        let names = names(&[]);
        let mut data = Vec::new();
        push_compact(&mut data, 0); // "None"
        let decoder = PropertyDecoder::new(&names);
        let decoded = decoder.decode(&data, 0).unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.start, PropertyStart::Empty);
        assert_eq!(decoded.end, 1);
        assert!(decoded.coverage.is_complete());
    }

    #[test]
    fn test_scalar_properties() {
        let names = names(&["DrawScale", "MaxParticles", "bHidden", "Tag"]);
        let mut data = Vec::new();

        push_compact(&mut data, 1); // DrawScale
        data.push(0x24); // Float, size class 2
        data.extend_from_slice(&1.5f32.to_le_bytes());

        push_compact(&mut data, 2); // MaxParticles
        data.push(0x22); // Int, size class 2
        data.extend_from_slice(&512i32.to_le_bytes());

        push_compact(&mut data, 3); // bHidden
        data.push(0x83); // Bool, array flag carries "true"

        push_compact(&mut data, 4); // Tag
        data.push(0x06); // Name, size class 0 (1 byte)
        push_compact(&mut data, 3); // -> "bHidden"

        push_compact(&mut data, 0); // terminator
        let end = data.len();
        data.extend_from_slice(&[0xDE, 0xAD]); // trailing binary section

        let decoder = PropertyDecoder::new(&names);
        let decoded = decoder.decode(&data, 0).unwrap();

        assert_eq!(decoded.start, PropertyStart::AsGiven);
        assert_eq!(decoded.end, end);
        assert_eq!(decoded.len(), 4);
        assert_eq!(decoded.get_float("DrawScale"), Some(1.5));
        assert_eq!(decoded.get_int("MaxParticles"), Some(512));
        assert_eq!(decoded.get_bool("bHidden"), Some(true));
        assert_eq!(decoded.get_str("Tag"), Some("bHidden"));
        assert!(!decoded.coverage.used_heuristics);
    }

    #[test]
    fn test_struct_property_with_name_and_explicit_size() {
        let names = names(&["Location", "Vector"]);
        let mut data = Vec::new();

        push_compact(&mut data, 1); // Location
        data.push(0x5A); // Struct, size class 5 (explicit u8 size)
        push_compact(&mut data, 2); // struct name "Vector"
        data.push(12); // size field follows the struct name
        data.extend_from_slice(&10.0f32.to_le_bytes());
        data.extend_from_slice(&20.0f32.to_le_bytes());
        data.extend_from_slice(&(-5.0f32).to_le_bytes());
        push_compact(&mut data, 0);

        let decoder = PropertyDecoder::new(&names);
        let decoded = decoder.decode(&data, 0).unwrap();
        assert_eq!(decoded.end, data.len());

        let prop = &decoded.properties[0];
        assert_eq!(prop.struct_name.as_deref(), Some("Vector"));
        assert_eq!(
            prop.value,
            PropertyValue::Struct(StructValue::Vector(Vector3::new(10.0, 20.0, -5.0)))
        );
    }

    #[test]
    fn test_vector_property_implicit_size() {
        let names = names(&["Velocity"]);
        let mut data = Vec::new();
        push_compact(&mut data, 1);
        data.push(0x3B); // Vector, size class 3 (12 bytes implicit)
        for v in [1.0f32, 2.0, 3.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        push_compact(&mut data, 0);

        let decoder = PropertyDecoder::new(&names);
        let decoded = decoder.decode(&data, 0).unwrap();
        assert_eq!(
            decoded.get("Velocity"),
            Some(&PropertyValue::Vector(Vector3::new(1.0, 2.0, 3.0)))
        );
    }

    #[test]
    fn test_array_property_keeps_raw_elements() {
        let names = names(&["Layers"]);
        let elements = [7u8, 8, 9];
        let mut data = Vec::new();
        push_compact(&mut data, 1);
        data.push(0x59); // Array, size class 5
        data.push(1 + elements.len() as u8); // count byte + elements
        push_compact(&mut data, elements.len() as i64);
        data.extend_from_slice(&elements);
        push_compact(&mut data, 0);

        let decoder = PropertyDecoder::new(&names);
        let decoded = decoder.decode(&data, 0).unwrap();
        assert_eq!(
            decoded.get("Layers"),
            Some(&PropertyValue::Array {
                count: 3,
                data: elements.to_vec()
            })
        );
    }

    #[test]
    fn test_static_array_slot_index() {
        let names = names(&["Sounds"]);
        let mut data = Vec::new();
        push_compact(&mut data, 1);
        data.push(0xA2); // Int, size class 2, array flag
        data.push(3); // slot 3
        data.extend_from_slice(&99i32.to_le_bytes());
        push_compact(&mut data, 0);

        let decoder = PropertyDecoder::new(&names);
        let decoded = decoder.decode(&data, 0).unwrap();
        assert_eq!(decoded.properties[0].array_index, 3);
        assert_eq!(decoded.get_int("Sounds"), Some(99));
    }

    #[test]
    fn test_probed_start_is_flagged() {
        let names = names(&["DrawScale"]);
        // six bytes of object metadata the export table says nothing about
        let mut data = vec![0xFF; 6];
        let probed = data.len();
        push_compact(&mut data, 1);
        data.push(0x24);
        data.extend_from_slice(&3.0f32.to_le_bytes());
        push_compact(&mut data, 0);

        let decoder = PropertyDecoder::new(&names);
        let decoded = decoder.decode(&data, 0).unwrap();
        assert_eq!(decoded.start, PropertyStart::Probed { offset: probed });
        assert!(decoded.coverage.used_heuristics);
        assert_eq!(decoded.get_float("DrawScale"), Some(3.0));
        assert_eq!(decoded.end, data.len());
    }

    #[test]
    fn test_unprobeable_garbage_is_an_error() {
        let names = names(&[]);
        let data = [0xF7u8, 0xE6, 0xD5, 0xC4];
        let decoder = PropertyDecoder::new(&names);
        assert!(matches!(
            decoder.decode(&data, 0),
            Err(Error::StartNotFound { .. })
        ));
    }

    #[test]
    fn test_mid_stream_desync_keeps_prefix() {
        let names = names(&["DrawScale"]);
        let mut data = Vec::new();
        push_compact(&mut data, 1);
        data.push(0x24);
        data.extend_from_slice(&2.0f32.to_le_bytes());
        let desync_at = data.len();
        data.extend_from_slice(&[0x7F, 0x0E, 0x00]); // name index far out of range

        let decoder = PropertyDecoder::new(&names);
        let decoded = decoder.decode(&data, 0).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded.end, desync_at);
        assert_eq!(decoded.coverage.anomalies, 1);
        assert!(decoded.coverage.bytes_unknown() > 0);
    }
}
