//! The container format's variable-length signed integer codec.
//!
//! A compact index is 1 to 5 bytes long:
//!
//! - byte 0: bit 7 = sign, bit 6 = continuation, bits 0-5 = low 6 value bits
//! - bytes 1-3: bit 7 = continuation, bits 0-6 = next 7 value bits
//! - byte 4: all 8 bits are value bits (no further continuation)
//!
//! The format uses this encoding pervasively for array counts and object
//! references. Decoding is sign-magnitude, so the representable range is
//! `-(2^35 - 1) ..= 2^35 - 1`; in practice the format never writes values
//! outside `i32`.

use crate::{Error, Result};

/// Maximum encoded length in bytes.
pub const MAX_LEN: usize = 5;

/// Decode a compact index from the start of `data`.
///
/// Returns the decoded value and the number of bytes consumed. A buffer that
/// ends mid-sequence (a continuation bit set on the last available byte)
/// yields [`Error::OutOfBounds`], never a truncated wrong value.
pub fn decode(data: &[u8]) -> Result<(i64, usize)> {
    let mut iter = data.iter();
    let mut next = |consumed: usize| -> Result<u8> {
        iter.next().copied().ok_or(Error::OutOfBounds {
            needed: consumed + 1,
            available: consumed,
        })
    };

    let b0 = next(0)?;
    let negative = b0 & 0x80 != 0;
    let mut value = (b0 & 0x3F) as u64;
    let mut len = 1;

    if b0 & 0x40 != 0 {
        let mut shift = 6;
        loop {
            let b = next(len)?;
            len += 1;
            if len == MAX_LEN {
                // Final byte carries all 8 bits and cannot continue.
                value |= (b as u64) << shift;
                break;
            }
            value |= ((b & 0x7F) as u64) << shift;
            if b & 0x80 == 0 {
                break;
            }
            shift += 7;
        }
    }

    let value = value as i64;
    Ok((if negative { -value } else { value }, len))
}

/// Encode a value as a compact index.
///
/// The inverse of [`decode`]; used by tests and synthetic-package builders.
/// Values whose magnitude exceeds 35 bits cannot be represented and return
/// [`Error::CompactIndexTooLong`].
pub fn encode(value: i64) -> Result<Vec<u8>> {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    if magnitude >= 1 << 35 {
        return Err(Error::CompactIndexTooLong);
    }

    let mut out = Vec::with_capacity(MAX_LEN);
    let mut b0 = (magnitude & 0x3F) as u8;
    if negative {
        b0 |= 0x80;
    }
    magnitude >>= 6;
    if magnitude != 0 {
        b0 |= 0x40;
    }
    out.push(b0);

    while magnitude != 0 {
        if out.len() == MAX_LEN - 1 {
            // Final byte: all 8 bits, no continuation flag.
            out.push(magnitude as u8);
            break;
        }
        let mut b = (magnitude & 0x7F) as u8;
        magnitude >>= 7;
        if magnitude != 0 {
            b |= 0x80;
        }
        out.push(b);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_byte_values() {
        assert_eq!(decode(&[0x00]).unwrap(), (0, 1));
        assert_eq!(decode(&[0x01]).unwrap(), (1, 1));
        assert_eq!(decode(&[0x3F]).unwrap(), (63, 1));
        assert_eq!(decode(&[0x81]).unwrap(), (-1, 1));
    }

    #[test]
    fn test_multi_byte_values() {
        // 64 = continuation byte: 0x40 | 0, then 0x01 << 6
        assert_eq!(decode(&[0x40, 0x01]).unwrap(), (64, 2));
        // -64
        assert_eq!(decode(&[0xC0, 0x01]).unwrap(), (-64, 2));
    }

    #[test]
    fn test_round_trip() {
        let interesting: &[i64] = &[
            0,
            1,
            -1,
            63,
            -63,
            64,
            -64,
            8191,
            8192,
            -8192,
            1 << 20,
            (1 << 27) - 1,
            1 << 27,
            i32::MAX as i64,
            i32::MIN as i64,
            (1 << 35) - 1,
            -((1 << 35) - 1),
        ];
        for &v in interesting {
            let bytes = encode(v).unwrap();
            assert!(bytes.len() <= MAX_LEN, "{v} encoded to {} bytes", bytes.len());
            let (decoded, len) = decode(&bytes).unwrap();
            assert_eq!(decoded, v);
            assert_eq!(len, bytes.len());
        }
    }

    #[test]
    fn test_round_trip_exhaustive_small() {
        for v in -70000i64..70000 {
            let bytes = encode(v).unwrap();
            assert_eq!(decode(&bytes).unwrap(), (v, bytes.len()));
        }
    }

    #[test]
    fn test_truncated_sequence_is_out_of_bounds() {
        // Continuation flagged but the buffer ends.
        assert!(matches!(decode(&[0x40]), Err(Error::OutOfBounds { .. })));
        assert!(matches!(
            decode(&[0x40, 0x80]),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            decode(&[0x40, 0x80, 0x80, 0x80]),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_too_large_magnitude_rejected() {
        assert!(matches!(
            encode(1 << 35),
            Err(Error::CompactIndexTooLong)
        ));
    }

    #[test]
    fn test_empty_buffer() {
        assert!(matches!(decode(&[]), Err(Error::OutOfBounds { .. })));
    }
}
