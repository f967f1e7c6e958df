//! Minimal script-number codec.
//!
//! `encode`/`decode` work on a whole encoded operation (OP_0, OP_1..OP_16, OP_1NEGATE or a
//! data push); `encode_num`/`decode_num` work on the bare sign-magnitude payload.

use alloc::vec::Vec;

use crate::error::TemplateError;
use crate::script::push::{read_chunk, write_push_data};
use crate::script::{OP_0, OP_1, OP_16, OP_1NEGATE};

/// Longest payload `decode_num` accepts.
pub const MAX_NUM_LEN: usize = 8;

/// Minimal little-endian sign-magnitude payload. Zero is the empty payload.
pub fn encode_num(n: i64) -> Vec<u8> {
    let mut out = Vec::with_capacity(MAX_NUM_LEN + 1);
    if n == 0 {
        return out;
    }
    let negative = n < 0;
    let mut magnitude = n.unsigned_abs();
    while magnitude > 0 {
        out.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    // Top bit of the last byte is the sign.
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

pub fn decode_num(bytes: &[u8]) -> Result<i64, TemplateError> {
    let Some((&last, _)) = bytes.split_last() else {
        return Ok(0);
    };
    if bytes.len() > MAX_NUM_LEN {
        return Err(TemplateError::NumberOverflow(bytes.len()));
    }

    let mut magnitude: u64 = 0;
    for (i, b) in bytes.iter().enumerate() {
        magnitude |= (*b as u64) << (8 * i);
    }

    if last & 0x80 != 0 {
        magnitude &= !(0x80u64 << (8 * (bytes.len() - 1)));
        Ok(-(magnitude as i64))
    } else {
        Ok(magnitude as i64)
    }
}

/// Encodes `n` as a single canonical script operation.
///
/// The domain is `[-(2^63 - 1), 2^63 - 1]`: `i64::MIN` needs a 9-byte payload, which
/// `decode` rejects with `NumberOverflow(9)`.
pub fn encode(n: i64) -> Vec<u8> {
    match n {
        0 => alloc::vec![OP_0],
        1..=16 => alloc::vec![OP_1 + (n as u8 - 1)],
        -1 => alloc::vec![OP_1NEGATE],
        _ => {
            let payload = encode_num(n);
            let mut out = Vec::with_capacity(payload.len() + 1);
            write_push_data(&mut out, &payload);
            out
        }
    }
}

/// Decodes one operation produced by `encode`. Empty input is 0.
pub fn decode(bytes: &[u8]) -> Result<i64, TemplateError> {
    let Some(&opcode) = bytes.first() else {
        return Ok(0);
    };

    let (value, consumed) = match opcode {
        OP_1..=OP_16 => ((opcode - OP_1 + 1) as i64, 1),
        OP_1NEGATE => (-1, 1),
        _ => {
            let chunk = read_chunk(bytes, 0)?;
            let payload = chunk.data.ok_or(TemplateError::UnexpectedOpcode(opcode))?;
            (decode_num(payload)?, chunk.len)
        }
    };

    if consumed != bytes.len() {
        return Err(TemplateError::TrailingData(bytes.len() - consumed));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use proptest::prelude::*;

    #[test]
    fn canonical_forms() {
        assert_eq!(encode(0), vec![0x00]);
        assert_eq!(encode(1), vec![0x51]);
        assert_eq!(encode(16), vec![0x60]);
        assert_eq!(encode(-1), vec![0x4f]);
        assert_eq!(encode(17), vec![0x01, 0x11]);
        assert_eq!(encode(-2), vec![0x01, 0x82]);
        assert_eq!(encode(127), vec![0x01, 0x7f]);
        assert_eq!(encode(128), vec![0x02, 0x80, 0x00]);
        assert_eq!(encode(-128), vec![0x02, 0x80, 0x80]);
        assert_eq!(encode(255), vec![0x02, 0xff, 0x00]);
        assert_eq!(encode(256), vec![0x02, 0x00, 0x01]);
        assert_eq!(encode(800_000), vec![0x03, 0x00, 0x35, 0x0c]);
        assert_eq!(encode(2_147_483_647), vec![0x04, 0xff, 0xff, 0xff, 0x7f]);
    }

    #[test]
    fn heights_round_trip() {
        for h in [
            0i64, 1, 15, 16, 127, 128, 255, 256, 65_535, 500_000, 800_000, 2_147_483_647,
        ] {
            assert_eq!(decode(&encode(h)), Ok(h), "height {}", h);
            assert_eq!(decode(&encode(-h)), Ok(-h), "height -{}", h);
        }
    }

    #[test]
    fn empty_input_is_zero() {
        assert_eq!(decode(&[]), Ok(0));
        assert_eq!(decode_num(&[]), Ok(0));
    }

    #[test]
    fn non_canonical_payloads_still_decode() {
        // Negative zero and padded forms are accepted on read.
        assert_eq!(decode_num(&[0x80]), Ok(0));
        assert_eq!(decode_num(&[0x05, 0x00]), Ok(5));
        assert_eq!(decode(&[0x01, 0x05]), Ok(5));
    }

    #[test]
    fn malformed_operations_are_rejected() {
        assert_eq!(decode(&[0x76]), Err(TemplateError::UnexpectedOpcode(0x76)));
        assert_eq!(decode(&[0x03, 0x01]), Err(TemplateError::IncompleteData));
        assert_eq!(decode(&[0x51, 0x00]), Err(TemplateError::TrailingData(1)));
        assert_eq!(
            decode_num(&[1, 2, 3, 4, 5, 6, 7, 8, 9]),
            Err(TemplateError::NumberOverflow(9))
        );
        assert_eq!(decode(&encode(i64::MIN)), Err(TemplateError::NumberOverflow(9)));
        assert_eq!(decode(&encode(i64::MIN + 1)), Ok(i64::MIN + 1));
    }

    proptest! {
        #[test]
        fn encode_decode_identity(n in (i64::MIN + 1)..=i64::MAX) {
            prop_assert_eq!(decode(&encode(n)), Ok(n));
        }

        #[test]
        fn payload_is_minimal(n in (i64::MIN + 1)..=i64::MAX) {
            let payload = encode_num(n);
            if let Some((&last, rest)) = payload.split_last() {
                // A trailing sign-only byte is only present when the previous byte needs bit 7.
                if last & 0x7f == 0 {
                    prop_assert!(rest.last().map_or(false, |b| b & 0x80 != 0));
                }
            }
        }
    }
}
