//! FORKID signature hash (BIP-143 layout, sighash flag 0x40).
//! Used by the Lock template to sign its unlocking script.

use alloc::vec::Vec;

use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{OutPoint, Transaction, TxOut};
use byteorder::{ByteOrder, LittleEndian};

use crate::compact_size::{compact_size_len, write_compact_size};
use crate::error::TemplateError;
use crate::sigma::message::outpoint_bytes;

pub const SIGHASH_ALL: u8 = 0x01;
pub const SIGHASH_NONE: u8 = 0x02;
pub const SIGHASH_SINGLE: u8 = 0x03;
pub const SIGHASH_FORKID: u8 = 0x40;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Which outputs the signature commits to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SighashMode {
    All,
    None,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SighashType {
    pub mode: SighashMode,
    pub anyone_can_pay: bool,
}

impl SighashType {
    pub const ALL: Self = Self::new(SighashMode::All, false);

    pub const fn new(mode: SighashMode, anyone_can_pay: bool) -> Self {
        Self {
            mode,
            anyone_can_pay,
        }
    }

    /// Byte appended to the DER signature; FORKID is always set.
    pub const fn to_u8(self) -> u8 {
        let base = match self.mode {
            SighashMode::All => SIGHASH_ALL,
            SighashMode::None => SIGHASH_NONE,
            SighashMode::Single => SIGHASH_SINGLE,
        };
        let acp = if self.anyone_can_pay {
            SIGHASH_ANYONECANPAY
        } else {
            0
        };
        base | SIGHASH_FORKID | acp
    }
}

fn sha256d_of(bytes: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(bytes).to_byte_array()
}

/// Serialize a single output in CTxOut format (8 value LE + compact size + script).
fn serialize_output(out: &mut Vec<u8>, txout: &TxOut) {
    let script = txout.script_pubkey.as_bytes();
    let mut val_buf = [0u8; 8];
    LittleEndian::write_u64(&mut val_buf, txout.value.to_sat());
    out.extend_from_slice(&val_buf);
    write_compact_size(out, script.len() as u64);
    out.extend_from_slice(script);
}

fn hash_prevouts(tx: &Transaction) -> [u8; 32] {
    let mut buf = Vec::with_capacity(36 * tx.input.len());
    for input in &tx.input {
        buf.extend_from_slice(&outpoint_bytes(&input.previous_output));
    }
    sha256d_of(&buf)
}

fn hash_sequence(tx: &Transaction) -> [u8; 32] {
    let mut buf = Vec::with_capacity(4 * tx.input.len());
    for input in &tx.input {
        let mut seq = [0u8; 4];
        LittleEndian::write_u32(&mut seq, input.sequence.0);
        buf.extend_from_slice(&seq);
    }
    sha256d_of(&buf)
}

fn hash_outputs(outputs: &[TxOut]) -> [u8; 32] {
    let mut buf = Vec::new();
    for txout in outputs {
        serialize_output(&mut buf, txout);
    }
    sha256d_of(&buf)
}

/// Builds the preimage for `input_index` spending an output of `value` satoshis locked by
/// `script_code`.
///
/// `version ‖ hashPrevouts ‖ hashSequence ‖ outpoint ‖ scriptCode ‖ value ‖ nSequence ‖
/// hashOutputs ‖ nLockTime ‖ sighash type (u32 LE)`
pub fn preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash: SighashType,
) -> Result<Vec<u8>, TemplateError> {
    let input = tx
        .input
        .get(input_index)
        .ok_or(TemplateError::InputIndexOutOfRange(input_index as u32))?;
    if input.previous_output == OutPoint::null() {
        return Err(TemplateError::MissingSourceTxid);
    }

    let zero = [0u8; 32];
    let prevouts = if sighash.anyone_can_pay {
        zero
    } else {
        hash_prevouts(tx)
    };
    let sequences = if sighash.anyone_can_pay || sighash.mode != SighashMode::All {
        zero
    } else {
        hash_sequence(tx)
    };
    let outputs = match sighash.mode {
        SighashMode::All => hash_outputs(&tx.output),
        SighashMode::Single => match tx.output.get(input_index) {
            Some(txout) => hash_outputs(core::slice::from_ref(txout)),
            None => zero,
        },
        SighashMode::None => zero,
    };

    let cap = 4 + 32 + 32 + 36 + compact_size_len(script_code.len() as u64)
        + script_code.len()
        + 8 + 4 + 32 + 4 + 4;
    let mut out = Vec::with_capacity(cap);
    let mut buf = [0u8; 8];

    LittleEndian::write_i32(&mut buf[..4], tx.version.0);
    out.extend_from_slice(&buf[..4]);
    out.extend_from_slice(&prevouts);
    out.extend_from_slice(&sequences);
    out.extend_from_slice(&outpoint_bytes(&input.previous_output));
    write_compact_size(&mut out, script_code.len() as u64);
    out.extend_from_slice(script_code);
    LittleEndian::write_u64(&mut buf, value);
    out.extend_from_slice(&buf);
    LittleEndian::write_u32(&mut buf[..4], input.sequence.0);
    out.extend_from_slice(&buf[..4]);
    out.extend_from_slice(&outputs);
    LittleEndian::write_u32(&mut buf[..4], tx.lock_time.to_consensus_u32());
    out.extend_from_slice(&buf[..4]);
    LittleEndian::write_u32(&mut buf[..4], sighash.to_u8() as u32);
    out.extend_from_slice(&buf[..4]);

    Ok(out)
}

/// Digest that is actually signed: `sha256d(preimage)`.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &[u8],
    value: u64,
    sighash: SighashType,
) -> Result<[u8; 32], TemplateError> {
    Ok(sha256d_of(&preimage(tx, input_index, script_code, value, sighash)?))
}
