//! SIGMA: address-anchored identity signatures bound to a transaction input.
//!
//! A SIGMA segment signs the bytes of its output script that precede it, together with the
//! outpoint of one input of the same transaction (the anchor). Moving the data to another
//! transaction, or spending a different input, invalidates the signature.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use bitcoin::{ScriptBuf, Transaction};
use k256::ecdsa::{SigningKey, VerifyingKey};

use crate::address::Address;
use crate::bsm::{self, CompactSignature};
use crate::direct::DirectRecovery;
use crate::error::TemplateError;
use crate::segment::{BitcomSegmenter, SegmentProvider};

pub mod codec;
pub mod message;

pub use codec::{decode_script, decode_segment, SIGMA_PREFIX};
pub use message::input_anchored;

// -----------------------------------------------------------------------------
// Record types
// -----------------------------------------------------------------------------

/// Wire label of each signing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    /// `BSM`: legacy signed message with a 65-byte compact signature.
    LegacyMessage,
    /// `BRC77`: opaque signature checked by a [`DirectRecovery`] implementation.
    DirectRecovery,
}

impl Algorithm {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LegacyMessage => "BSM",
            Self::DirectRecovery => "BRC77",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "BSM" => Some(Self::LegacyMessage),
            "BRC77" => Some(Self::DirectRecovery),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SigmaSignature {
    LegacyMessage(#[cfg_attr(feature = "serde", serde(with = "compact_serde"))] CompactSignature),
    DirectRecovery(Vec<u8>),
}

impl SigmaSignature {
    pub fn algorithm(&self) -> Algorithm {
        match self {
            Self::LegacyMessage(_) => Algorithm::LegacyMessage,
            Self::DirectRecovery(_) => Algorithm::DirectRecovery,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::LegacyMessage(sig) => sig.as_bytes(),
            Self::DirectRecovery(bytes) => bytes,
        }
    }
}

/// One SIGMA signature. `validity` is `None` until a verifier has looked at it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignatureRecord {
    pub signature: SigmaSignature,
    pub claimed_address: String,
    pub anchor_vin: u32,
    pub validity: Option<bool>,
    pub bitcom_index: Option<usize>,
}

impl SignatureRecord {
    pub fn algorithm(&self) -> Algorithm {
        self.signature.algorithm()
    }
}

#[cfg(feature = "serde")]
mod compact_serde {
    use alloc::string::String;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::bsm::CompactSignature;

    pub fn serialize<S: Serializer>(sig: &CompactSignature, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&sig.to_base64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<CompactSignature, D::Error> {
        let encoded = String::deserialize(d)?;
        CompactSignature::from_base64(&encoded).map_err(serde::de::Error::custom)
    }
}

// -----------------------------------------------------------------------------
// Signer / Verifier
// -----------------------------------------------------------------------------

/// How to sign. Variant-specific inputs live on their variant.
#[derive(Clone, Copy)]
pub enum SigningAlgorithm<'a> {
    LegacyMessage,
    DirectRecovery {
        scheme: &'a dyn DirectRecovery,
        /// Restricts verification to the holder of this key.
        verifier: Option<&'a VerifyingKey>,
    },
}

pub fn sign_message(
    message: &[u8],
    key: &SigningKey,
    algorithm: SigningAlgorithm<'_>,
) -> Result<SigmaSignature, TemplateError> {
    match algorithm {
        SigningAlgorithm::LegacyMessage => bsm::sign(message, key).map(SigmaSignature::LegacyMessage),
        SigningAlgorithm::DirectRecovery { scheme, verifier } => scheme
            .sign(message, key, verifier)
            .map(SigmaSignature::DirectRecovery),
    }
}

/// Verifies `record` against an independently rebuilt `message` and stores the outcome in
/// `record.validity`. A direct-recovery record without a `direct` implementation is invalid.
pub fn verify_record(
    record: &mut SignatureRecord,
    message: &[u8],
    direct: Option<&dyn DirectRecovery>,
    verifier_key: Option<&SigningKey>,
) -> bool {
    let valid = match &record.signature {
        SigmaSignature::LegacyMessage(sig) => bsm::verify(message, sig, &record.claimed_address),
        SigmaSignature::DirectRecovery(bytes) => match direct {
            Some(scheme) => scheme.verify(message, bytes, verifier_key),
            None => {
                tracing::debug!("no direct-recovery scheme supplied");
                false
            }
        },
    };
    tracing::debug!(
        algorithm = record.algorithm().label(),
        address = %record.claimed_address,
        valid,
        "SIGMA verification"
    );
    record.validity = Some(valid);
    valid
}

// -----------------------------------------------------------------------------
// Transaction-level driver
// -----------------------------------------------------------------------------

/// SIGMA operations on one output of a transaction.
///
/// `sig_index` counts SIGMA segments in the output script: index `n` addresses the n-th
/// existing segment, and index `count` addresses the next one to be appended.
pub struct Sigma<'a, P: SegmentProvider = BitcomSegmenter> {
    tx: &'a Transaction,
    target_vout: u32,
    anchor_vin: u32,
    sig_index: usize,
    provider: P,
}

impl<'a> Sigma<'a> {
    pub fn new(tx: &'a Transaction, target_vout: u32, anchor_vin: u32, sig_index: usize) -> Self {
        Self::with_provider(tx, target_vout, anchor_vin, sig_index, BitcomSegmenter)
    }
}

impl<'a, P: SegmentProvider> Sigma<'a, P> {
    pub fn with_provider(
        tx: &'a Transaction,
        target_vout: u32,
        anchor_vin: u32,
        sig_index: usize,
        provider: P,
    ) -> Self {
        Self {
            tx,
            target_vout,
            anchor_vin,
            sig_index,
            provider,
        }
    }

    fn script(&self) -> Result<&'a [u8], TemplateError> {
        self.tx
            .output
            .get(self.target_vout as usize)
            .map(|out| out.script_pubkey.as_bytes())
            .ok_or(TemplateError::OutputIndexOutOfRange(self.target_vout))
    }

    /// Script bytes the signature at `sig_index` covers.
    fn preceding_script(&self) -> Result<&'a [u8], TemplateError> {
        let script = self.script()?;
        let segments = self.provider.segments_with_label(script, SIGMA_PREFIX);
        match segments.get(self.sig_index) {
            Some(segment) => Ok(&script[..segment.position]),
            // A bare trailing OP_RETURN is rewritten by `sign`, so it is not signed over.
            None if self.sig_index == segments.len() => Ok(match data_section(script) {
                DataSection::Empty => &script[..script.len() - 1],
                DataSection::Absent | DataSection::Open => script,
            }),
            None => Err(TemplateError::SegmentNotFound(self.sig_index)),
        }
    }

    /// Message for the given anchor input.
    pub fn message_for(&self, anchor_vin: u32) -> Result<[u8; message::MESSAGE_LEN], TemplateError> {
        let input = self
            .tx
            .input
            .get(anchor_vin as usize)
            .ok_or(TemplateError::InputIndexOutOfRange(anchor_vin))?;
        Ok(input_anchored(&input.previous_output, self.preceding_script()?))
    }

    pub fn message(&self) -> Result<[u8; message::MESSAGE_LEN], TemplateError> {
        self.message_for(self.anchor_vin)
    }

    /// Signs the output and returns the transaction with the SIGMA segment written in.
    /// An existing segment at `sig_index` is replaced; otherwise one is appended.
    pub fn sign(
        &self,
        key: &SigningKey,
        algorithm: SigningAlgorithm<'_>,
    ) -> Result<(Transaction, SignatureRecord), TemplateError> {
        let message = self.message()?;
        let signature = sign_message(&message, key, algorithm)?;

        let script = self.script()?;
        let sigmas = self.provider.segments_with_label(script, SIGMA_PREFIX);

        let mut record = SignatureRecord {
            signature,
            claimed_address: Address::mainnet(key.verifying_key()).to_string(),
            anchor_vin: self.anchor_vin,
            validity: Some(true),
            bitcom_index: None,
        };

        let new_script = match sigmas.get(self.sig_index) {
            Some(existing) => codec::replace_segment(script, existing, &record),
            None => match data_section(script) {
                DataSection::Absent => codec::append_segment(script, false, &record),
                // Reopen a bare OP_RETURN so the segment is not preceded by an empty one.
                DataSection::Empty => {
                    codec::append_segment(&script[..script.len() - 1], false, &record)
                }
                DataSection::Open => codec::append_segment(script, true, &record),
            },
        };

        // The written segment must be what a verifier will find at `sig_index`.
        let written = self
            .provider
            .segments_with_label(&new_script, SIGMA_PREFIX)
            .into_iter()
            .nth(self.sig_index)
            .filter(|segment| decode_segment(segment).is_some())
            .ok_or(TemplateError::DataSectionNotSegmentable)?;
        record.bitcom_index = Some(written.index);

        let mut signed = self.tx.clone();
        signed.output[self.target_vout as usize].script_pubkey = ScriptBuf::from_bytes(new_script);
        tracing::debug!(
            vout = self.target_vout,
            sig_index = self.sig_index,
            algorithm = record.algorithm().label(),
            "SIGMA signed"
        );
        Ok((signed, record))
    }

    /// Every decodable SIGMA record of the output, unverified.
    pub fn records(&self) -> Result<Vec<SignatureRecord>, TemplateError> {
        Ok(decode_script(&self.provider, self.script()?))
    }

    /// Decodes and verifies the record at `sig_index`, rebuilding the message from the
    /// record's own anchor input.
    pub fn verify(
        &self,
        direct: Option<&dyn DirectRecovery>,
        verifier_key: Option<&SigningKey>,
    ) -> Result<SignatureRecord, TemplateError> {
        let script = self.script()?;
        let segment = self
            .provider
            .segments_with_label(script, SIGMA_PREFIX)
            .into_iter()
            .nth(self.sig_index)
            .ok_or(TemplateError::SegmentNotFound(self.sig_index))?;
        let mut record = decode_segment(&segment).ok_or(TemplateError::SegmentNotFound(self.sig_index))?;

        let message = self.message_for(record.anchor_vin)?;
        verify_record(&mut record, &message, direct, verifier_key);
        Ok(record)
    }

    /// Verifies every well-formed SIGMA segment of the output. Malformed ones are skipped.
    pub fn verify_all(
        &self,
        direct: Option<&dyn DirectRecovery>,
        verifier_key: Option<&SigningKey>,
    ) -> Result<Vec<SignatureRecord>, TemplateError> {
        let script = self.script()?;
        let segments = self.provider.segments_with_label(script, SIGMA_PREFIX);
        let mut out = Vec::with_capacity(segments.len());
        for segment in &segments {
            let Some(mut record) = decode_segment(segment) else {
                continue;
            };
            let Some(input) = self.tx.input.get(record.anchor_vin as usize) else {
                tracing::debug!(anchor_vin = record.anchor_vin, "anchor input missing");
                record.validity = Some(false);
                out.push(record);
                continue;
            };
            let message = input_anchored(&input.previous_output, &script[..segment.position]);
            verify_record(&mut record, &message, direct, verifier_key);
            out.push(record);
        }
        Ok(out)
    }
}

enum DataSection {
    Absent,
    /// `OP_RETURN` is the last operation of the script.
    Empty,
    Open,
}

fn data_section(script: &[u8]) -> DataSection {
    let op_return = crate::script::ChunkReader::new(script)
        .map_while(Result::ok)
        .find(|chunk| chunk.opcode == crate::script::OP_RETURN);
    match op_return {
        None => DataSection::Absent,
        Some(chunk) if chunk.offset + chunk.len == script.len() => DataSection::Empty,
        Some(_) => DataSection::Open,
    }
}
