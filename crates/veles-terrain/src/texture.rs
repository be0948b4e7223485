//! Terrain texture decoding into canonical RGBA.

use veles_common::CoverageReport;

use crate::config::TextureConfig;
use crate::dxt;
use crate::error::{Error, Result};
use crate::marker::find_payload_start;

/// Pixel formats observed in terrain packages, keyed by the format
/// identifier from the export's properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextureFormat {
    Dxt1,
    /// Raw 8-bit channels, stored blue-first despite the generic name in
    /// the format table.
    Bgra8,
    Dxt3,
    Dxt5,
    /// 16-bit grayscale, used for heightmaps and alpha masks.
    Gray16,
}

impl TextureFormat {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            3 => Some(TextureFormat::Dxt1),
            5 => Some(TextureFormat::Bgra8),
            6 => Some(TextureFormat::Dxt3),
            7 => Some(TextureFormat::Dxt5),
            10 => Some(TextureFormat::Gray16),
            _ => None,
        }
    }

    /// Payload size in bytes for a `width` x `height` mip.
    pub fn payload_size(self, width: u32, height: u32) -> u64 {
        let texels = width as u64 * height as u64;
        match self {
            TextureFormat::Dxt1 => texels / 2,
            TextureFormat::Dxt3 | TextureFormat::Dxt5 => texels,
            TextureFormat::Bgra8 => texels * 4,
            TextureFormat::Gray16 => texels * 2,
        }
    }
}

/// What kind of texture an export is, as far as decode transforms go.
///
/// Terrain-chunk color textures are stored transposed relative to the
/// heightmap grid and are flipped back during decode; that transform must
/// not touch other texture classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureClass {
    #[default]
    Generic,
    TerrainChunkColor,
}

/// One level of a texture's mip chain.
///
/// The pixel payload stays in the export buffer; `offset` and `size`
/// address it so callers can decode lower mips on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    /// Byte offset of the pixel payload within the export data.
    pub offset: usize,
    /// Payload size in bytes.
    pub size: usize,
}

/// A decoded texture in canonical RGBA order, together with the byte
/// accounting of the pass.
#[derive(Debug, Clone)]
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, row-major RGBA, decoded from mip 0.
    pub rgba: Vec<u8>,
    /// Every mip level in chain order, mip 0 first.
    pub mips: Vec<MipLevel>,
    pub coverage: CoverageReport,
}

/// Decoder for texture export payloads.
///
/// The caller supplies the format identifier and dimensions from the
/// export's tagged properties; the decoder locates the mip chain behind
/// the size marker, walks every level, and decodes mip 0 to RGBA.
#[derive(Debug, Default)]
pub struct TerrainTextureDecoder {
    config: TextureConfig,
}

impl TerrainTextureDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TextureConfig) -> Self {
        Self { config }
    }

    /// Decode a texture export: walk the mip chain and decode mip 0.
    pub fn decode(
        &self,
        data: &[u8],
        format_id: u8,
        width: u32,
        height: u32,
        class: TextureClass,
    ) -> Result<DecodedTexture> {
        let format = TextureFormat::from_id(format_id).ok_or(Error::UnsupportedFormat(format_id))?;
        let expected = format.payload_size(width, height);
        if width == 0 || height == 0 || expected == 0 || expected > u32::MAX as u64 {
            return Err(Error::BadDimensions { width, height });
        }
        let expected = expected as usize;

        let mut coverage = CoverageReport::new(data.len());
        let start = find_payload_start(data, expected as u32, self.config.marker_window)
            .ok_or(Error::MarkerNotFound {
                expected: expected as u32,
                searched: self.config.marker_window,
            })?
            .record_in(&mut coverage);
        coverage.mark_unknown_labeled(0, start - 4, Some("texture header".to_string()));

        if data.len() - start < expected {
            return Err(Error::PayloadTooShort {
                needed: expected,
                available: data.len() - start,
            });
        }

        let mips = walk_mip_chain(data, start - 4, width, height, &mut coverage);
        let top = &mips[0];
        let payload = &data[top.offset..top.offset + top.size];

        let mut rgba = match format {
            TextureFormat::Dxt1 => dxt::decode_dxt1(payload, width, height),
            TextureFormat::Dxt3 => dxt::decode_dxt3(payload, width, height),
            TextureFormat::Dxt5 => dxt::decode_dxt5(payload, width, height),
            TextureFormat::Bgra8 => payload
                .chunks_exact(4)
                .flat_map(|p| [p[2], p[1], p[0], p[3]])
                .collect(),
            TextureFormat::Gray16 => payload
                .chunks_exact(2)
                .flat_map(|pair| {
                    let gray = pair[0]; // big-endian high byte
                    [gray, gray, gray, 255]
                })
                .collect(),
        };

        let (width, height) = if class == TextureClass::TerrainChunkColor {
            rgba = transpose_rgba(&rgba, width, height);
            (height, width)
        } else {
            (width, height)
        };

        Ok(DecodedTexture {
            width,
            height,
            rgba,
            mips,
            coverage,
        })
    }
}

/// Walk the mip chain starting at the first size field.
///
/// Each level is a little-endian `i32` byte size, the pixel payload, and a
/// 10-byte footer repeating the dimensions and their log2 values. Footer
/// dimensions outside 1..=8192 are treated as misread and replaced with
/// the declared dimensions halved per level; an implausible size field
/// ends the walk. The caller guarantees the first level fits, so the
/// returned chain is never empty.
fn walk_mip_chain(
    data: &[u8],
    at: usize,
    width: u32,
    height: u32,
    coverage: &mut CoverageReport,
) -> Vec<MipLevel> {
    let mut mips: Vec<MipLevel> = Vec::new();
    let mut pos = at;

    while data.len() - pos >= 4 {
        let size = i32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
        if size <= 0 || size as usize > data.len() - pos - 4 {
            break;
        }
        let size = size as usize;
        let level = mips.len();
        coverage.explain(pos, pos + 4, format!("mip[{level}] size"));
        let payload_start = pos + 4;
        coverage.explain(payload_start, payload_start + size, format!("mip[{level}] pixels"));
        pos = payload_start + size;

        let mut w = (width >> level).max(1);
        let mut h = (height >> level).max(1);
        if data.len() - pos >= 10 {
            let fw = u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]);
            let fh = u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]]);
            if (1..=8192).contains(&fw) && (1..=8192).contains(&fh) {
                coverage.explain(pos, pos + 10, format!("mip[{level}] footer"));
                w = fw;
                h = fh;
            } else {
                coverage.mark_unknown_labeled(
                    pos,
                    pos + 10,
                    Some(format!("mip[{level}] footer")),
                );
            }
            pos += 10;
        }
        mips.push(MipLevel {
            width: w,
            height: h,
            offset: payload_start,
            size,
        });
    }

    if pos < data.len() {
        coverage.mark_unknown_labeled(pos, data.len(), Some("post-mip data".to_string()));
    }
    mips
}

/// Swap rows and columns of a row-major RGBA image.
fn transpose_rgba(rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0u8; rgba.len()];
    for y in 0..height as usize {
        for x in 0..width as usize {
            let src = (y * width as usize + x) * 4;
            let dst = (x * height as usize + y) * 4;
            out[dst..dst + 4].copy_from_slice(&rgba[src..src + 4]);
        }
    }
    out
}
