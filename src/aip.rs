//! AIP: plain message signing over the protocol segment that precedes it.
//!
//! Signed bytes:
//! `OP_RETURN || prefix (UTF-8, unpushed) || push(field)... || '|'`
//!
//! Segment layout: `"15PciHG22SNLQJXMoSUaWVi7WSqc7hCfva" "BITCOIN_ECDSA" <address>
//! <base64 signature> [<field index>...]`. Field indexes (ASCII decimal, 0-based into the
//! signed segment's fields) restrict the signature to a subset of fields.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use k256::ecdsa::SigningKey;

use crate::address::Address;
use crate::bsm::{self, CompactSignature};
use crate::error::TemplateError;
use crate::script::{write_push_data, OP_RETURN, PIPE};
use crate::segment::{ProtocolSegment, SegmentProvider};

pub const AIP_PREFIX: &str = "15PciHG22SNLQJXMoSUaWVi7WSqc7hCfva";
pub const AIP_ALGORITHM: &str = "BITCOIN_ECDSA";

/// algorithm, address, signature.
pub const AIP_MIN_FIELDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AipRecord {
    #[cfg_attr(feature = "serde", serde(with = "signature_b64"))]
    pub signature: CompactSignature,
    pub claimed_address: String,
    /// Empty means every field of the signed segment.
    pub field_indexes: Vec<usize>,
    pub validity: Option<bool>,
    pub bitcom_index: Option<usize>,
}

#[cfg(feature = "serde")]
mod signature_b64 {
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

/// Flat message construction. Signing and verifying both go through here.
pub fn build_message(prefix: &str, chunks: &[&[u8]]) -> Vec<u8> {
    let body: usize = chunks.iter().map(|c| c.len() + 5).sum();
    let mut out = Vec::with_capacity(2 + prefix.len() + body);
    out.push(OP_RETURN);
    out.extend_from_slice(prefix.as_bytes());
    for chunk in chunks {
        write_push_data(&mut out, chunk);
    }
    out.push(PIPE);
    out
}

/// Message over `segment`, limited to `field_indexes` when non-empty.
/// `None` if an index is out of range.
pub fn message_for_segment(segment: &ProtocolSegment, field_indexes: &[usize]) -> Option<Vec<u8>> {
    let chunks: Vec<&[u8]> = if field_indexes.is_empty() {
        segment.fields.iter().map(Vec::as_slice).collect()
    } else {
        field_indexes
            .iter()
            .map(|&i| segment.fields.get(i).map(Vec::as_slice))
            .collect::<Option<_>>()?
    };
    Some(build_message(&segment.label, &chunks))
}

pub fn sign(message: &[u8], key: &SigningKey) -> Result<AipRecord, TemplateError> {
    let signature = bsm::sign(message, key)?;
    Ok(AipRecord {
        signature,
        claimed_address: Address::mainnet(key.verifying_key()).to_string(),
        field_indexes: Vec::new(),
        validity: Some(true),
        bitcom_index: None,
    })
}

/// Signs the fields of `segment` selected by `field_indexes` (all when empty).
pub fn sign_segment(
    segment: &ProtocolSegment,
    key: &SigningKey,
    field_indexes: &[usize],
) -> Result<AipRecord, TemplateError> {
    let message = message_for_segment(segment, field_indexes)
        .ok_or(TemplateError::SegmentNotFound(segment.index))?;
    let mut record = sign(&message, key)?;
    record.field_indexes = field_indexes.to_vec();
    Ok(record)
}

/// Verifies against a rebuilt message and records the outcome.
pub fn verify(record: &mut AipRecord, message: &[u8]) -> bool {
    let valid = bsm::verify(message, &record.signature, &record.claimed_address);
    tracing::debug!(address = %record.claimed_address, valid, "AIP verification");
    record.validity = Some(valid);
    valid
}

pub fn decode_segment(segment: &ProtocolSegment) -> Option<AipRecord> {
    if segment.label != AIP_PREFIX || segment.fields.len() < AIP_MIN_FIELDS {
        return None;
    }
    if segment.fields[0] != AIP_ALGORITHM.as_bytes() {
        tracing::trace!(index = segment.index, "unsupported AIP algorithm");
        return None;
    }
    let claimed_address = String::from_utf8(segment.fields[1].clone()).ok()?;
    let signature = CompactSignature::from_base64(core::str::from_utf8(&segment.fields[2]).ok()?).ok()?;
    let field_indexes = segment.fields[AIP_MIN_FIELDS..]
        .iter()
        .map(|f| core::str::from_utf8(f).ok()?.parse::<usize>().ok())
        .collect::<Option<Vec<_>>>()?;

    Some(AipRecord {
        signature,
        claimed_address,
        field_indexes,
        validity: None,
        bitcom_index: Some(segment.index),
    })
}

/// Appends `| AIP ...` to a script that already has an OP_RETURN data section.
pub fn append_segment(script: &[u8], record: &AipRecord) -> Vec<u8> {
    let mut out = script.to_vec();
    write_push_data(&mut out, &[PIPE]);
    write_push_data(&mut out, AIP_PREFIX.as_bytes());
    write_push_data(&mut out, AIP_ALGORITHM.as_bytes());
    write_push_data(&mut out, record.claimed_address.as_bytes());
    write_push_data(&mut out, record.signature.to_base64().as_bytes());
    for index in &record.field_indexes {
        write_push_data(&mut out, index.to_string().as_bytes());
    }
    out
}

/// Decodes and verifies every AIP segment in `script` against the segment directly before
/// it. An AIP segment with nothing (or an undecodable segment) before it is reported
/// invalid.
pub fn verify_script<P: SegmentProvider + ?Sized>(provider: &P, script: &[u8]) -> Vec<AipRecord> {
    let segments = provider.segments(script);
    let mut out = Vec::new();
    for segment in &segments {
        let Some(mut record) = decode_segment(segment) else {
            continue;
        };
        // Matched by bitcom index: a skipped segment must not shift what was signed.
        let message = segment
            .index
            .checked_sub(1)
            .and_then(|prev| segments.iter().find(|s| s.index == prev))
            .and_then(|prev| message_for_segment(prev, &record.field_indexes));
        match message {
            Some(message) => {
                verify(&mut record, &message);
            }
            None => record.validity = Some(false),
        }
        out.push(record);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn flat_message_layout() {
        let message = build_message("B", &[b"hi", b""]);
        assert_eq!(message, vec![0x6a, b'B', 0x02, b'h', b'i', 0x00, 0x7c]);
    }

    #[test]
    fn long_chunks_use_pushdata() {
        let data = [0u8; 80];
        let message = build_message("B", &[&data]);
        assert_eq!(&message[..4], &[0x6a, b'B', 0x4c, 80]);
        assert_eq!(message.len(), 2 + 2 + 80 + 1);
        assert_eq!(*message.last().expect("non-empty"), 0x7c);
    }

    #[test]
    fn sign_then_verify_and_reject_tamper() {
        let key = SigningKey::from_slice(&[0x42u8; 32]).expect("fixed test key is valid");
        let message = build_message("19HxigV4QyBv3tHpQVcUEQyq1pzZVdoAut", &[b"hello"]);
        let mut record = sign(&message, &key).expect("sign");
        assert!(verify(&mut record, &message));

        let mut tampered = message.clone();
        tampered[1] ^= 0x01;
        assert!(!verify(&mut record, &tampered));
        assert_eq!(record.validity, Some(false));
    }

    #[test]
    fn out_of_range_index_has_no_message() {
        let segment = ProtocolSegment {
            label: "B".into(),
            fields: vec![b"a".to_vec()],
            payload: Vec::new(),
            position: 0,
            index: 0,
        };
        assert!(message_for_segment(&segment, &[0]).is_some());
        assert!(message_for_segment(&segment, &[1]).is_none());
    }
}
