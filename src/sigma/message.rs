//! Input-anchored message: `sha256(outpoint) || sha256(script bytes before the segment)`.
//!
//! The outpoint is the anchor input's txid in wire order followed by its vout (u32 LE).
//! Binding the outpoint ties the signature to one specific spend.

use bitcoin::hashes::{sha256, Hash};
use bitcoin::OutPoint;
use byteorder::{ByteOrder, LittleEndian};

pub const MESSAGE_LEN: usize = 64;

/// 36-byte consensus serialization of an outpoint.
pub fn outpoint_bytes(outpoint: &OutPoint) -> [u8; 36] {
    let mut out = [0u8; 36];
    out[..32].copy_from_slice(&outpoint.txid.to_byte_array());
    LittleEndian::write_u32(&mut out[32..], outpoint.vout);
    out
}

pub fn input_hash(outpoint: &OutPoint) -> [u8; 32] {
    sha256::Hash::hash(&outpoint_bytes(outpoint)).to_byte_array()
}

pub fn data_hash(preceding_script: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(preceding_script).to_byte_array()
}

/// The 64-byte message the SIGMA signature commits to.
pub fn input_anchored(outpoint: &OutPoint, preceding_script: &[u8]) -> [u8; MESSAGE_LEN] {
    let mut message = [0u8; MESSAGE_LEN];
    message[..32].copy_from_slice(&input_hash(outpoint));
    message[32..].copy_from_slice(&data_hash(preceding_script));
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::Txid;

    fn outpoint() -> OutPoint {
        let mut txid = [0u8; 32];
        txid[0] = 0xaa;
        txid[31] = 0xbb;
        OutPoint {
            txid: Txid::from_byte_array(txid),
            vout: 0x0102_0304,
        }
    }

    #[test]
    fn outpoint_is_wire_order_txid_then_le_vout() {
        let bytes = outpoint_bytes(&outpoint());
        assert_eq!(bytes[0], 0xaa);
        assert_eq!(bytes[31], 0xbb);
        assert_eq!(&bytes[32..], &[0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn halves_are_independent_sha256() {
        let message = input_anchored(&outpoint(), b"data");
        assert_eq!(&message[..32], &input_hash(&outpoint()));
        assert_eq!(
            &message[32..],
            &sha256::Hash::hash(b"data").to_byte_array()
        );

        let mut other = outpoint();
        other.vout += 1;
        let changed = input_anchored(&other, b"data");
        assert_ne!(&changed[..32], &message[..32]);
        assert_eq!(&changed[32..], &message[32..]);
    }
}
