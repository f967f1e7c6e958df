//! Bitcoin CompactSize (VarInt) encoding.
//! Length prefixes of the signed-message magic digest (bsm) and of the script code in the
//! FORKID sighash preimage (sighash).

use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

/// Number of bytes `write_compact_size` emits for `n`.
#[inline]
pub const fn compact_size_len(n: u64) -> usize {
    if n < 0xfd {
        1
    } else if n <= 0xffff {
        3
    } else if n <= 0xffff_ffff {
        5
    } else {
        9
    }
}

/// Appends `n` as CompactSize to `buf`.
/// 0–252: 1 byte; 253–0xFFFF: 0xFD + 2B LE; up to 0xFFFFFFFF: 0xFE + 4B LE; else 0xFF + 8B LE.
#[inline]
pub fn write_compact_size(buf: &mut Vec<u8>, n: u64) {
    let mut b = [0u8; 8];
    match compact_size_len(n) {
        1 => buf.push(n as u8),
        3 => {
            buf.push(0xfd);
            LittleEndian::write_u16(&mut b[..2], n as u16);
            buf.extend_from_slice(&b[..2]);
        }
        5 => {
            buf.push(0xfe);
            LittleEndian::write_u32(&mut b[..4], n as u32);
            buf.extend_from_slice(&b[..4]);
        }
        _ => {
            buf.push(0xff);
            LittleEndian::write_u64(&mut b, n);
            buf.extend_from_slice(&b);
        }
    }
}
