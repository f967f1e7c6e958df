//! JSON shape of the record types (requires `--features serde`).
#![cfg(feature = "serde")]

mod common;

use common::{b_script, test_key, tx_with_output};
use sigmalock::{aip, lock, AipRecord, BitcomSegmenter, LockParameters, SegmentProvider, Sigma, SignatureRecord, SigningAlgorithm};

#[test]
fn sigma_record_json_round_trip() {
    let tx = tx_with_output(b_script(b"hello"));
    let (_, record) = Sigma::new(&tx, 0, 0, 0)
        .sign(&test_key(0x42), SigningAlgorithm::LegacyMessage)
        .expect("sign");

    let json = serde_json::to_value(&record).expect("serialize");
    let encoded = json["signature"]["LegacyMessage"].as_str().expect("base64 string");
    assert_eq!(encoded.len(), 88);
    assert_eq!(json["anchor_vin"], 0);
    assert_eq!(json["validity"], true);

    let back: SignatureRecord = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, record);
}

#[test]
fn aip_record_json_round_trip() {
    let script = b_script(b"hello");
    let segment = BitcomSegmenter.segments(&script).remove(0);
    let record = aip::sign_segment(&segment, &test_key(0x42), &[0]).expect("sign");

    let json = serde_json::to_string(&record).expect("serialize");
    let back: AipRecord = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, record);
}

#[test]
fn bad_base64_signature_is_rejected() {
    let json = r#"{"signature":"not base64!","claimed_address":"x","field_indexes":[],"validity":null,"bitcom_index":null}"#;
    assert!(serde_json::from_str::<AipRecord>(json).is_err());
}

#[test]
fn lock_parameters_json() {
    let address = sigmalock::Address::mainnet(test_key(0x42).verifying_key()).to_string();
    let script = lock::lock(&address, 800_000).expect("lock");
    let params = lock::decode(script.as_bytes()).expect("decode");

    let json = serde_json::to_value(params).expect("serialize");
    assert_eq!(json["until_height"], 800_000);
    let back: LockParameters = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, params);
}
