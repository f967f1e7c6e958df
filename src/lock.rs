//! Lock: pay-to-pubkey-hash output spendable only from a given block height.
//!
//! ```text
//! OP_DUP OP_HASH160 <20-byte pkh> <height> OP_CHECKLOCKTIMEVERIFY OP_DROP OP_EQUALVERIFY OP_CHECKSIG
//! |---- prefix ---|                        |------------------- suffix --------------------|
//! ```
//!
//! Spending requires a transaction lock-time at or above the height and a non-final input
//! sequence (0). Both are checked by the ledger, not here.

use alloc::vec::Vec;

use bitcoin::hashes::Hash;
use bitcoin::{ScriptBuf, Transaction};
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};

use crate::address::Address;
use crate::error::TemplateError;
use crate::script::number;
use crate::script::{
    write_push_data, OP_CHECKLOCKTIMEVERIFY, OP_CHECKSIG, OP_DROP, OP_DUP, OP_EQUALVERIFY,
    OP_HASH160,
};
use crate::sighash::{self, SighashMode, SighashType};
use crate::template::UnlockingTemplate;

pub const LOCK_PREFIX: [u8; 2] = [OP_DUP, OP_HASH160];
pub const LOCK_SUFFIX: [u8; 4] = [OP_CHECKLOCKTIMEVERIFY, OP_DROP, OP_EQUALVERIFY, OP_CHECKSIG];

/// Push opcode of the 20-byte pkh.
const PKH_PUSH: u8 = 0x14;
const PKH_LEN: usize = 20;
const PKH_FIELD_LEN: usize = 1 + PKH_LEN;

/// Spending sequence the lock requires.
pub const LOCK_SEQUENCE: u32 = 0;

/// DER signature (≤72) + sighash byte, compressed pubkey (33), one push opcode each.
pub const UNLOCK_SCRIPT_MAX_LEN: usize = 1 + 73 + 1 + 33;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LockParameters {
    pub pubkey_hash: [u8; 20],
    pub until_height: i64,
}

impl LockParameters {
    /// Caller-side precheck of what the ledger enforces: lock-time at or above the height
    /// and input sequence 0.
    pub fn spendable_by(&self, tx: &Transaction, input_index: usize) -> bool {
        let Some(input) = tx.input.get(input_index) else {
            return false;
        };
        let lock_time = tx.lock_time.to_consensus_u32() as i64;
        lock_time >= self.until_height && input.sequence.0 == LOCK_SEQUENCE
    }

    pub fn to_script(&self) -> ScriptBuf {
        let height = number::encode(self.until_height);
        let mut out = Vec::with_capacity(
            LOCK_PREFIX.len() + PKH_FIELD_LEN + height.len() + LOCK_SUFFIX.len(),
        );
        out.extend_from_slice(&LOCK_PREFIX);
        write_push_data(&mut out, &self.pubkey_hash);
        out.extend_from_slice(&height);
        out.extend_from_slice(&LOCK_SUFFIX);
        ScriptBuf::from_bytes(out)
    }
}

/// Locking script paying `address` from `until_height` on.
pub fn lock(address: &str, until_height: i64) -> Result<ScriptBuf, TemplateError> {
    let address: Address = address.parse()?;
    Ok(LockParameters {
        pubkey_hash: address.pubkey_hash,
        until_height,
    }
    .to_script())
}

/// Prefix/suffix match only; the interior is not validated.
pub fn is_lock(script: &[u8]) -> bool {
    script.len() >= LOCK_PREFIX.len() + PKH_FIELD_LEN + LOCK_SUFFIX.len()
        && script.starts_with(&LOCK_PREFIX)
        && script.ends_with(&LOCK_SUFFIX)
}

pub fn decode(script: &[u8]) -> Result<LockParameters, TemplateError> {
    if !is_lock(script) {
        return Err(TemplateError::NotALockScript);
    }
    let pkh_start = LOCK_PREFIX.len();
    if script[pkh_start] != PKH_PUSH {
        tracing::debug!(opcode = script[pkh_start], "Lock pkh push malformed");
        return Err(TemplateError::NotALockScript);
    }
    let mut pubkey_hash = [0u8; PKH_LEN];
    pubkey_hash.copy_from_slice(&script[pkh_start + 1..pkh_start + PKH_FIELD_LEN]);

    let height_bytes = &script[pkh_start + PKH_FIELD_LEN..script.len() - LOCK_SUFFIX.len()];
    let until_height = number::decode(height_bytes)?;

    Ok(LockParameters {
        pubkey_hash,
        until_height,
    })
}

/// Deferred signer for spending a Lock output.
#[derive(Debug, Clone)]
pub struct LockUnlocker {
    key: SigningKey,
    sighash: SighashType,
    source_satoshis: Option<u64>,
    source_script: Option<ScriptBuf>,
}

/// Unlocker for a Lock output. The spent output's amount and locking script are required
/// when `sign` runs; missing either is fatal.
pub fn unlock(
    key: SigningKey,
    mode: SighashMode,
    anyone_can_pay: bool,
    source_satoshis: Option<u64>,
    source_script: Option<ScriptBuf>,
) -> LockUnlocker {
    LockUnlocker {
        key,
        sighash: SighashType::new(mode, anyone_can_pay),
        source_satoshis,
        source_script,
    }
}

impl LockUnlocker {
    pub fn sighash_type(&self) -> SighashType {
        self.sighash
    }

    fn checksig_signature(&self, digest: &[u8; 32]) -> Result<Vec<u8>, TemplateError> {
        let signature: Signature = self
            .key
            .sign_prehash(digest)
            .map_err(|_| TemplateError::SigningFailed)?;
        let signature = signature.normalize_s().unwrap_or(signature);
        let der = signature.to_der();
        let mut out = Vec::with_capacity(der.as_bytes().len() + 1);
        out.extend_from_slice(der.as_bytes());
        out.push(self.sighash.to_u8());
        Ok(out)
    }
}

impl UnlockingTemplate for LockUnlocker {
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<ScriptBuf, TemplateError> {
        let input = tx
            .input
            .get(input_index)
            .ok_or(TemplateError::InputIndexOutOfRange(input_index as u32))?;
        if input.previous_output.txid.to_byte_array() == [0u8; 32] {
            return Err(TemplateError::MissingSourceTxid);
        }
        let (Some(value), Some(script_code)) = (self.source_satoshis, self.source_script.as_ref())
        else {
            return Err(TemplateError::MissingSourceOutput);
        };

        let digest = sighash::signature_hash(tx, input_index, script_code.as_bytes(), value, self.sighash)?;
        let signature = self.checksig_signature(&digest)?;
        let pubkey = self.key.verifying_key().to_encoded_point(true);

        let mut out = Vec::with_capacity(UNLOCK_SCRIPT_MAX_LEN);
        write_push_data(&mut out, &signature);
        write_push_data(&mut out, pubkey.as_bytes());
        tracing::debug!(input_index, "Lock unlocking script built");
        Ok(ScriptBuf::from_bytes(out))
    }

    fn estimate_length(&self, _tx: &Transaction, _input_index: usize) -> usize {
        UNLOCK_SCRIPT_MAX_LEN
    }
}
