//! Block-compressed texture decoding (DXT1/3/5).
//!
//! Standard 4x4 texel block algorithms; nothing here is specific to the
//! container format beyond the little-endian field order.

/// Expand a 5:6:5 packed color to 8-bit channels.
fn rgb565(c: u16) -> [u8; 3] {
    let r = ((c >> 11) & 0x1F) as u32;
    let g = ((c >> 5) & 0x3F) as u32;
    let b = (c & 0x1F) as u32;
    [
        (r * 255 / 31) as u8,
        (g * 255 / 63) as u8,
        (b * 255 / 31) as u8,
    ]
}

fn lerp3(a: u8, b: u8, num: u32, den: u32) -> u8 {
    ((a as u32 * (den - num) + b as u32 * num) / den) as u8
}

/// The four-entry color palette of one block.
///
/// DXT1 switches to a three-color palette with a transparent fourth entry
/// when `c0 <= c1`; DXT3/5 always use the four-color form.
fn color_palette(c0: u16, c1: u16, opaque_only: bool) -> [[u8; 4]; 4] {
    let a = rgb565(c0);
    let b = rgb565(c1);
    let mut palette = [[0u8; 4]; 4];
    palette[0] = [a[0], a[1], a[2], 255];
    palette[1] = [b[0], b[1], b[2], 255];
    if opaque_only || c0 > c1 {
        for ch in 0..3 {
            palette[2][ch] = lerp3(a[ch], b[ch], 1, 3);
            palette[3][ch] = lerp3(a[ch], b[ch], 2, 3);
        }
        palette[2][3] = 255;
        palette[3][3] = 255;
    } else {
        for ch in 0..3 {
            palette[2][ch] = lerp3(a[ch], b[ch], 1, 2);
        }
        palette[2][3] = 255;
        // palette[3] stays fully transparent black
    }
    palette
}

/// Write one block's texels into the output image, clipping at the image
/// edge for non-multiple-of-4 dimensions.
fn write_block(
    out: &mut [u8],
    width: u32,
    height: u32,
    bx: u32,
    by: u32,
    texel: impl Fn(u32, u32) -> [u8; 4],
) {
    for ty in 0..4 {
        for tx in 0..4 {
            let px = bx * 4 + tx;
            let py = by * 4 + ty;
            if px >= width || py >= height {
                continue;
            }
            let at = ((py * width + px) * 4) as usize;
            out[at..at + 4].copy_from_slice(&texel(tx, ty));
        }
    }
}

fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

/// Per-texel 2-bit palette index from a color block's index dword.
fn color_index(block: &[u8], tx: u32, ty: u32) -> usize {
    let row = block[4 + ty as usize];
    ((row >> (tx * 2)) & 0x3) as usize
}

pub(crate) fn decode_dxt1(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0u8; (width * height * 4) as usize];
    let blocks_x = width.div_ceil(4);
    for (i, block) in data.chunks_exact(8).enumerate() {
        let palette = color_palette(read_u16(block, 0), read_u16(block, 2), false);
        let (bx, by) = (i as u32 % blocks_x, i as u32 / blocks_x);
        write_block(&mut out, width, height, bx, by, |tx, ty| {
            palette[color_index(block, tx, ty)]
        });
    }
    out
}

pub(crate) fn decode_dxt3(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0u8; (width * height * 4) as usize];
    let blocks_x = width.div_ceil(4);
    for (i, block) in data.chunks_exact(16).enumerate() {
        let (alpha, color) = block.split_at(8);
        let palette = color_palette(read_u16(color, 0), read_u16(color, 2), true);
        let (bx, by) = (i as u32 % blocks_x, i as u32 / blocks_x);
        write_block(&mut out, width, height, bx, by, |tx, ty| {
            let nibble = (alpha[(ty * 2 + tx / 2) as usize] >> ((tx % 2) * 4)) & 0xF;
            let mut texel = palette[color_index(color, tx, ty)];
            texel[3] = nibble * 17;
            texel
        });
    }
    out
}

pub(crate) fn decode_dxt5(data: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0u8; (width * height * 4) as usize];
    let blocks_x = width.div_ceil(4);
    for (i, block) in data.chunks_exact(16).enumerate() {
        let (alpha, color) = block.split_at(8);
        let palette = color_palette(read_u16(color, 0), read_u16(color, 2), true);
        let alpha_palette = alpha_palette(alpha[0], alpha[1]);
        // 16 3-bit indices packed little-endian into six bytes
        let mut bits = 0u64;
        for (shift, &b) in alpha[2..8].iter().enumerate() {
            bits |= (b as u64) << (shift * 8);
        }
        let (bx, by) = (i as u32 % blocks_x, i as u32 / blocks_x);
        write_block(&mut out, width, height, bx, by, |tx, ty| {
            let idx = ((bits >> ((ty * 4 + tx) * 3)) & 0x7) as usize;
            let mut texel = palette[color_index(color, tx, ty)];
            texel[3] = alpha_palette[idx];
            texel
        });
    }
    out
}

/// The eight-entry interpolated alpha palette of a DXT5 block.
fn alpha_palette(a0: u8, a1: u8) -> [u8; 8] {
    let mut palette = [0u8; 8];
    palette[0] = a0;
    palette[1] = a1;
    if a0 > a1 {
        for i in 0..6 {
            palette[2 + i] = lerp3(a0, a1, i as u32 + 1, 7);
        }
    } else {
        for i in 0..4 {
            palette[2 + i] = lerp3(a0, a1, i as u32 + 1, 5);
        }
        palette[6] = 0;
        palette[7] = 255;
    }
    palette
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dxt1_solid_block() {
        // c0 = pure red, all indices 0
        let mut block = Vec::new();
        block.extend_from_slice(&0xF800u16.to_le_bytes());
        block.extend_from_slice(&0u16.to_le_bytes());
        block.extend_from_slice(&[0u8; 4]);

        let out = decode_dxt1(&block, 4, 4);
        assert_eq!(out.len(), 64);
        for texel in out.chunks_exact(4) {
            assert_eq!(texel, [255, 0, 0, 255]);
        }
    }

    #[test]
    fn test_dxt1_three_color_mode_transparent_index() {
        // c0 <= c1 selects the three-color palette; index 3 is transparent
        let mut block = Vec::new();
        block.extend_from_slice(&0u16.to_le_bytes());
        block.extend_from_slice(&0xFFFFu16.to_le_bytes());
        block.extend_from_slice(&[0xFF; 4]); // every texel uses index 3

        let out = decode_dxt1(&block, 4, 4);
        for texel in out.chunks_exact(4) {
            assert_eq!(texel, [0, 0, 0, 0]);
        }
    }

    #[test]
    fn test_dxt3_explicit_alpha_nibbles() {
        let mut block = Vec::new();
        // first texel alpha 0x0, second 0xF, rest 0
        block.push(0xF0);
        block.extend_from_slice(&[0u8; 7]);
        block.extend_from_slice(&0xF800u16.to_le_bytes());
        block.extend_from_slice(&0u16.to_le_bytes());
        block.extend_from_slice(&[0u8; 4]);

        let out = decode_dxt3(&block, 4, 4);
        assert_eq!(&out[0..4], &[255, 0, 0, 0]);
        assert_eq!(&out[4..8], &[255, 0, 0, 255]);
        assert_eq!(&out[8..12], &[255, 0, 0, 0]);
    }

    #[test]
    fn test_dxt5_constant_alpha() {
        let mut block = Vec::new();
        block.push(0x80); // a0
        block.push(0x00); // a1
        block.extend_from_slice(&[0u8; 6]); // all indices 0 -> a0
        block.extend_from_slice(&0x07E0u16.to_le_bytes()); // green
        block.extend_from_slice(&0u16.to_le_bytes());
        block.extend_from_slice(&[0u8; 4]);

        let out = decode_dxt5(&block, 4, 4);
        for texel in out.chunks_exact(4) {
            assert_eq!(texel, [0, 255, 0, 0x80]);
        }
    }

    #[test]
    fn test_edge_clipping() {
        // 2x2 image still consumes one full block
        let mut block = Vec::new();
        block.extend_from_slice(&0xF800u16.to_le_bytes());
        block.extend_from_slice(&0u16.to_le_bytes());
        block.extend_from_slice(&[0u8; 4]);

        let out = decode_dxt1(&block, 2, 2);
        assert_eq!(out.len(), 16);
        assert_eq!(&out[0..4], &[255, 0, 0, 255]);
    }
}
