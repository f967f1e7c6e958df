//! Legacy message signing ("Bitcoin Signed Message").
//!
//! Digest: `sha256d(varint(24) || "Bitcoin Signed Message:\n" || varint(len) || message)`.
//! Signatures travel as 65-byte compact records: `27 + recid (+4 if compressed) || r || s`.
//!
//! Verification never trusts the header byte. Implementations disagree on how the header
//! maps to a recovery candidate, so every candidate in [`RECOVERY_CANDIDATES`] is tried and
//! the recovered key must both re-verify `(r, s)` and hash to the claimed address.

use alloc::string::String;
use alloc::vec::Vec;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bitcoin::hashes::{sha256d, Hash};
use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};

use crate::address::Address;
use crate::compact_size::write_compact_size;
use crate::error::TemplateError;

pub const MAGIC_PREFIX: &[u8] = b"Bitcoin Signed Message:\n";

pub const COMPACT_SIGNATURE_LEN: usize = 65;

/// Header base for compact signatures.
pub const COMPACT_HEADER_BASE: u8 = 27;
/// Added to the header when the signing key is advertised in compressed form.
pub const COMPACT_COMPRESSED_FLAG: u8 = 4;

/// Every public key an `(r, s)` pair can recover to.
pub const RECOVERY_CANDIDATES: [u8; 4] = [0, 1, 2, 3];

/// Magic-prefixed double-SHA-256 digest of `message`.
pub fn magic_hash(message: &[u8]) -> [u8; 32] {
    let mut buf = Vec::with_capacity(1 + MAGIC_PREFIX.len() + 9 + message.len());
    write_compact_size(&mut buf, MAGIC_PREFIX.len() as u64);
    buf.extend_from_slice(MAGIC_PREFIX);
    write_compact_size(&mut buf, message.len() as u64);
    buf.extend_from_slice(message);
    sha256d::Hash::hash(&buf).to_byte_array()
}

/// 65-byte compact recoverable signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSignature([u8; COMPACT_SIGNATURE_LEN]);

impl CompactSignature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TemplateError> {
        let arr: [u8; COMPACT_SIGNATURE_LEN] = bytes
            .try_into()
            .map_err(|_| TemplateError::InvalidSignatureLength(bytes.len()))?;
        Ok(Self(arr))
    }

    pub fn from_parts(recovery_id: RecoveryId, compressed: bool, signature: &Signature) -> Self {
        let mut out = [0u8; COMPACT_SIGNATURE_LEN];
        out[0] = COMPACT_HEADER_BASE
            + recovery_id.to_byte()
            + if compressed { COMPACT_COMPRESSED_FLAG } else { 0 };
        out[1..].copy_from_slice(&signature.to_bytes());
        Self(out)
    }

    pub fn from_base64(s: &str) -> Result<Self, TemplateError> {
        let bytes = STANDARD
            .decode(s.trim())
            .map_err(|_| TemplateError::InvalidBase64)?;
        Self::from_slice(&bytes)
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; COMPACT_SIGNATURE_LEN] {
        &self.0
    }

    pub fn header(&self) -> u8 {
        self.0[0]
    }

    /// Compression flag as advertised by the header. Informational only.
    pub fn claims_compressed(&self) -> bool {
        self.0[0] >= COMPACT_HEADER_BASE + COMPACT_COMPRESSED_FLAG
    }

    /// `(r, s)` with s normalized to the low half of the curve order.
    pub fn signature(&self) -> Option<Signature> {
        let sig = Signature::from_slice(&self.0[1..]).ok()?;
        Some(sig.normalize_s().unwrap_or(sig))
    }
}

/// Signs `message` with the legacy digest. The recovery factor is found by trial recovery
/// against the signer's own key.
pub fn sign(message: &[u8], key: &SigningKey) -> Result<CompactSignature, TemplateError> {
    let digest = magic_hash(message);
    let signature: Signature = key
        .sign_prehash(&digest)
        .map_err(|_| TemplateError::SigningFailed)?;
    let recovery_id =
        RecoveryId::trial_recovery_from_prehash(key.verifying_key(), &digest, &signature)
            .map_err(|_| TemplateError::SigningFailed)?;
    Ok(CompactSignature::from_parts(recovery_id, true, &signature))
}

/// Searches every recovery candidate for a key that re-verifies `signature` over `digest`
/// and hashes to `address`. Returns the first match.
pub fn recover_matching_key(
    digest: &[u8; 32],
    signature: &CompactSignature,
    address: &Address,
) -> Option<(RecoveryId, VerifyingKey)> {
    let sig = signature.signature()?;
    RECOVERY_CANDIDATES
        .iter()
        .find_map(|&candidate| try_candidate(digest, &sig, candidate, address))
}

fn try_candidate(
    digest: &[u8; 32],
    sig: &Signature,
    candidate: u8,
    address: &Address,
) -> Option<(RecoveryId, VerifyingKey)> {
    let recovery_id = RecoveryId::from_byte(candidate)?;
    let key = match VerifyingKey::recover_from_prehash(digest, sig, recovery_id) {
        Ok(key) => key,
        Err(_) => {
            tracing::trace!(candidate, "recovery failed");
            return None;
        }
    };
    if key.verify_prehash(digest, sig).is_err() {
        tracing::trace!(candidate, "recovered key does not verify");
        return None;
    }
    if !address.matches_key(&key) {
        tracing::trace!(candidate, "recovered key does not match address");
        return None;
    }
    Some((recovery_id, key))
}

/// Verifies a compact signature over `message` against a base58 address.
/// Malformed addresses verify as false.
pub fn verify(message: &[u8], signature: &CompactSignature, address: &str) -> bool {
    let Ok(address) = address.parse::<Address>() else {
        tracing::debug!("claimed address is not a valid P2PKH address");
        return false;
    };
    recover_matching_key(&magic_hash(message), signature, &address).is_some()
}
