//! UMP variable-length integer codec.
//!
//! This is the protocol's own prefix-counted encoding, NOT a protobuf
//! varint: the number of leading set bits of the first byte (capped at 4)
//! plus one gives the total size in bytes.
//!
//!   1 byte:  0xxxxxxx                  -> value = low 7 bits
//!   2 bytes: 10xxxxxx B                -> value = low 6 bits | B << 6
//!   3 bytes: 110xxxxx B C              -> value = low 5 bits | B << 5 | C << 13
//!   4 bytes: 1110xxxx B C D            -> value = low 4 bits | B << 4 | ...
//!   5 bytes: 1111xxxx B C D E          -> low nibble unused, value = LE u32

use crate::error::UmpError;

/// Decode a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed (1..=5). Fails with
/// `TruncatedInput` when `buf` holds fewer bytes than the size computed
/// from the first byte; decoding never reads past that size.
pub fn decode(buf: &[u8]) -> Result<(u32, usize), UmpError> {
    let first = *buf.first().ok_or(UmpError::TruncatedInput)?;
    let size = first.leading_ones().min(4) as usize + 1;
    if buf.len() < size {
        return Err(UmpError::TruncatedInput);
    }

    if size == 5 {
        // The first byte's low nibble carries nothing; the value is the
        // following four bytes, little-endian.
        let value = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        return Ok((value, 5));
    }

    let shift = 8 - size; // payload bits kept from the first byte
    let mut value = first as u32 & ((1u32 << shift) - 1);
    for (i, &b) in buf[1..size].iter().enumerate() {
        value |= (b as u32) << (shift + 8 * i);
    }
    Ok((value, size))
}

/// Append `value` to `out` using the minimal 1-4 byte encoding, or the
/// 5-byte form when the value needs more than 28 bits.
pub fn encode(out: &mut Vec<u8>, value: u32) {
    if value < 1 << 7 {
        out.push(value as u8);
    } else if value < 1 << 14 {
        out.push(0x80 | (value & 0x3F) as u8);
        out.push((value >> 6) as u8);
    } else if value < 1 << 21 {
        out.push(0xC0 | (value & 0x1F) as u8);
        out.push((value >> 5) as u8);
        out.push((value >> 13) as u8);
    } else if value < 1 << 28 {
        out.push(0xE0 | (value & 0x0F) as u8);
        out.push((value >> 4) as u8);
        out.push((value >> 12) as u8);
        out.push((value >> 20) as u8);
    } else {
        encode_full_width(out, value);
    }
}

/// Append `value` as the explicit 5-byte form, prefix byte 0xF0 with the
/// low nibble unused, followed by the raw little-endian u32.
pub fn encode_full_width(out: &mut Vec<u8>, value: u32) {
    out.push(0xF0);
    out.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: u32) {
        let mut buf = Vec::new();
        encode(&mut buf, value);
        let (decoded, consumed) = decode(&buf).expect("should decode");
        assert_eq!(decoded, value, "value mismatch for {value}");
        assert_eq!(consumed, buf.len(), "consumed length mismatch for {value}");
    }

    #[test]
    fn size_law_over_all_first_bytes() {
        // leading_ones(b) capped at 4, plus 1, is exactly the byte count
        // decode consumes.
        for b in 0..=255u8 {
            let expected = b.leading_ones().min(4) as usize + 1;
            let buf = [b, 0, 0, 0, 0];
            let (_, consumed) = decode(&buf).expect("5-byte buffer always suffices");
            assert_eq!(consumed, expected, "first byte {b:#x}");
        }
    }

    #[test]
    fn five_byte_low_nibble_ignored() {
        // 0xF0 followed by LE 0x00000042 decodes to 66 over 5 bytes; any
        // prefix low nibble gives the same answer.
        for prefix in [0xF0u8, 0xF7, 0xFF] {
            let buf = [prefix, 0x42, 0x00, 0x00, 0x00];
            assert_eq!(decode(&buf).unwrap(), (66, 5));
        }
    }

    #[test]
    fn boundaries_roundtrip() {
        roundtrip(0);
        roundtrip(127);
        roundtrip(128);
        roundtrip(16383); // max 2-byte
        roundtrip(16384);
        roundtrip(2_097_151); // max 3-byte
        roundtrip(2_097_152);
        roundtrip(268_435_455); // max 4-byte
        roundtrip(268_435_456);
        roundtrip(u32::MAX);
    }

    #[test]
    fn full_width_roundtrip() {
        let mut buf = Vec::new();
        encode_full_width(&mut buf, 66);
        assert_eq!(buf, [0xF0, 0x42, 0, 0, 0]);
        assert_eq!(decode(&buf).unwrap(), (66, 5));
    }

    #[test]
    fn truncated() {
        assert!(matches!(decode(&[]), Err(UmpError::TruncatedInput)));
        assert!(matches!(decode(&[0x80]), Err(UmpError::TruncatedInput)));
        assert!(matches!(
            decode(&[0xF0, 1, 2]),
            Err(UmpError::TruncatedInput)
        ));
    }
}
