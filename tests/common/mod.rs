//! Shared test helpers: fixed keys, B-protocol output scripts and transactions with real
//! anchor inputs.

#![allow(dead_code)]

use bitcoin::absolute::LockTime;
use bitcoin::hashes::Hash;
use bitcoin::transaction::Version;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};
use k256::ecdsa::SigningKey;
use sigmalock::script::{write_push_data, OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160, OP_RETURN};

/// B:// protocol prefix.
pub const B_PREFIX: &str = "19HxigV4QyBv3tHpQVcUEQyq1pzZVdoAut";

pub fn test_key(byte: u8) -> SigningKey {
    SigningKey::from_slice(&[byte; 32]).expect("fixed test key is valid")
}

/// Plain P2PKH locking script for a zero hash.
pub fn p2pkh_script() -> Vec<u8> {
    let mut s = vec![OP_DUP, OP_HASH160];
    write_push_data(&mut s, &[0u8; 20]);
    s.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    s
}

/// `P2PKH OP_RETURN B <content> <mime> <encoding>`.
pub fn b_script(content: &[u8]) -> Vec<u8> {
    let mut s = p2pkh_script();
    s.push(OP_RETURN);
    write_push_data(&mut s, B_PREFIX.as_bytes());
    write_push_data(&mut s, content);
    write_push_data(&mut s, b"text/plain");
    write_push_data(&mut s, b"utf-8");
    s
}

pub fn outpoint(fill: u8, vout: u32) -> OutPoint {
    OutPoint {
        txid: Txid::from_byte_array([fill; 32]),
        vout,
    }
}

pub fn input(previous_output: OutPoint, sequence: u32) -> TxIn {
    TxIn {
        previous_output,
        script_sig: ScriptBuf::new(),
        sequence: Sequence(sequence),
        witness: Witness::new(),
    }
}

/// Two funded inputs, one output carrying `script`.
pub fn tx_with_output(script: Vec<u8>) -> Transaction {
    Transaction {
        version: Version(1),
        lock_time: LockTime::ZERO,
        input: vec![
            input(outpoint(0xa1, 0), 0xffff_ffff),
            input(outpoint(0xb2, 3), 0xffff_ffff),
        ],
        output: vec![TxOut {
            value: Amount::from_sat(1),
            script_pubkey: ScriptBuf::from_bytes(script),
        }],
    }
}

pub fn output_bytes(tx: &Transaction, vout: usize) -> &[u8] {
    tx.output[vout].script_pubkey.as_bytes()
}

/// Offset of the first occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle present")
}
