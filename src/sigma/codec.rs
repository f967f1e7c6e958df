//! SIGMA segment codec.
//!
//! Segment layout (after `OP_RETURN` or `|`):
//! `"SIGMA" <algorithm> <address> <signature> <anchor vin>`
//! Algorithm, address and vin are ASCII; the signature is raw bytes.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::bsm::CompactSignature;
use crate::script::{write_push_data, OP_RETURN, PIPE};
use crate::segment::{ProtocolSegment, SegmentProvider};
use crate::sigma::{Algorithm, SigmaSignature, SignatureRecord};

pub const SIGMA_PREFIX: &str = "SIGMA";

/// algorithm, address, signature, anchor vin.
pub const SIGMA_FIELD_COUNT: usize = 4;

/// Decodes one SIGMA segment. Short or malformed segments yield `None`.
pub fn decode_segment(segment: &ProtocolSegment) -> Option<SignatureRecord> {
    if segment.label != SIGMA_PREFIX {
        return None;
    }
    if segment.fields.len() < SIGMA_FIELD_COUNT {
        tracing::trace!(
            index = segment.index,
            fields = segment.fields.len(),
            "skipping short SIGMA segment"
        );
        return None;
    }

    let algorithm = Algorithm::from_label(core::str::from_utf8(&segment.fields[0]).ok()?)?;
    let claimed_address = String::from_utf8(segment.fields[1].clone()).ok()?;
    let signature = match algorithm {
        Algorithm::LegacyMessage => match CompactSignature::from_slice(&segment.fields[2]) {
            Ok(sig) => SigmaSignature::LegacyMessage(sig),
            Err(e) => {
                tracing::trace!(index = segment.index, error = %e, "skipping SIGMA segment");
                return None;
            }
        },
        Algorithm::DirectRecovery => SigmaSignature::DirectRecovery(segment.fields[2].clone()),
    };
    let anchor_vin = core::str::from_utf8(&segment.fields[3])
        .ok()?
        .parse::<u32>()
        .ok()?;

    Some(SignatureRecord {
        signature,
        claimed_address,
        anchor_vin,
        validity: None,
        bitcom_index: Some(segment.index),
    })
}

/// Every well-formed SIGMA record in `script`, in script order.
pub fn decode_script<P: SegmentProvider + ?Sized>(
    provider: &P,
    script: &[u8],
) -> Vec<SignatureRecord> {
    provider
        .segments_with_label(script, SIGMA_PREFIX)
        .iter()
        .filter_map(decode_segment)
        .collect()
}

/// Pushes of the segment body: label followed by the four fields.
pub fn encode_segment(record: &SignatureRecord) -> Vec<u8> {
    let mut out = Vec::new();
    write_push_data(&mut out, SIGMA_PREFIX.as_bytes());
    write_push_data(&mut out, record.signature.algorithm().label().as_bytes());
    write_push_data(&mut out, record.claimed_address.as_bytes());
    write_push_data(&mut out, record.signature.as_bytes());
    write_push_data(&mut out, record.anchor_vin.to_string().as_bytes());
    out
}

/// Appends a SIGMA segment, opening the data section with `OP_RETURN` when the script
/// has no protocol segments yet.
pub fn append_segment(script: &[u8], has_op_return: bool, record: &SignatureRecord) -> Vec<u8> {
    let body = encode_segment(record);
    let mut out = Vec::with_capacity(script.len() + 2 + body.len());
    out.extend_from_slice(script);
    if has_op_return {
        write_push_data(&mut out, &[PIPE]);
    } else {
        out.push(OP_RETURN);
    }
    out.extend_from_slice(&body);
    out
}

/// Replaces `segment`'s body with a new SIGMA record; the delimiter is kept.
pub fn replace_segment(script: &[u8], segment: &ProtocolSegment, record: &SignatureRecord) -> Vec<u8> {
    let delimiter_len = if script.get(segment.position) == Some(&OP_RETURN) {
        1
    } else {
        2
    };
    let body_start = segment.position + delimiter_len;
    let body_end = (body_start + segment.payload.len()).min(script.len());

    let body = encode_segment(record);
    let mut out = Vec::with_capacity(script.len() + body.len());
    out.extend_from_slice(&script[..body_start]);
    out.extend_from_slice(&body);
    out.extend_from_slice(&script[body_end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::BitcomSegmenter;
    use alloc::vec;

    fn legacy_record(vin: u32) -> SignatureRecord {
        let mut sig = [0x11u8; 65];
        sig[0] = 31;
        SignatureRecord {
            signature: SigmaSignature::LegacyMessage(
                CompactSignature::from_slice(&sig).expect("65 bytes"),
            ),
            claimed_address: "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH".into(),
            anchor_vin: vin,
            validity: Some(true),
            bitcom_index: None,
        }
    }

    #[test]
    fn append_then_decode() {
        let lock = [0x76u8, 0xa9];
        let script = append_segment(&lock, false, &legacy_record(3));
        assert_eq!(script[2], OP_RETURN);

        let records = decode_script(&BitcomSegmenter, &script);
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.anchor_vin, 3);
        assert_eq!(rec.claimed_address, "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH");
        assert_eq!(rec.signature, legacy_record(3).signature);
        assert_eq!(rec.validity, None);
        assert_eq!(rec.bitcom_index, Some(0));
    }

    #[test]
    fn second_segment_uses_pipe() {
        let script = append_segment(&[], false, &legacy_record(0));
        let script = append_segment(&script, true, &legacy_record(1));
        let records = decode_script(&BitcomSegmenter, &script);
        assert_eq!(records.iter().map(|r| r.anchor_vin).collect::<Vec<_>>(), vec![0, 1]);
    }

    #[test]
    fn replace_keeps_surroundings() {
        let script = append_segment(&[0xac], false, &legacy_record(0));
        let script = append_segment(&script, true, &legacy_record(1));
        let segments = BitcomSegmenter.segments_with_label(&script, SIGMA_PREFIX);

        let replaced = replace_segment(&script, &segments[0], &legacy_record(7));
        let records = decode_script(&BitcomSegmenter, &replaced);
        assert_eq!(records.iter().map(|r| r.anchor_vin).collect::<Vec<_>>(), vec![7, 1]);
        assert_eq!(replaced[0], 0xac);
    }

    #[test]
    fn malformed_fields_are_skipped() {
        let mut script = vec![OP_RETURN];
        for push in [&b"SIGMA"[..], b"BSM", b"addr", &[0u8; 64][..], b"0"] {
            write_push_data(&mut script, push);
        }
        write_push_data(&mut script, &[PIPE]);
        for push in [&b"SIGMA"[..], b"XYZ", b"addr", &[0u8; 65][..], b"0"] {
            write_push_data(&mut script, push);
        }
        write_push_data(&mut script, &[PIPE]);
        for push in [&b"SIGMA"[..], b"BSM", b"addr", &[0u8; 65][..], b"-1"] {
            write_push_data(&mut script, push);
        }
        assert!(decode_script(&BitcomSegmenter, &script).is_empty());
    }

    #[test]
    fn direct_recovery_bytes_are_opaque() {
        let record = SignatureRecord {
            signature: SigmaSignature::DirectRecovery(vec![1, 2, 3]),
            ..legacy_record(0)
        };
        let script = append_segment(&[], false, &record);
        let decoded = decode_script(&BitcomSegmenter, &script);
        assert_eq!(decoded[0].signature, SigmaSignature::DirectRecovery(vec![1, 2, 3]));
    }
}
