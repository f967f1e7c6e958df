//! P2PKH addresses: base58check of `version || HASH160(pubkey)`.

use core::fmt;
use core::str::FromStr;

use alloc::string::String;
use alloc::vec::Vec;

use bitcoin::base58;
use bitcoin::hashes::{hash160, Hash};
use k256::ecdsa::VerifyingKey;

use crate::error::TemplateError;

pub const MAINNET_P2PKH: u8 = 0x00;
pub const TESTNET_P2PKH: u8 = 0x6f;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    pub version: u8,
    pub pubkey_hash: [u8; 20],
}

impl Address {
    pub fn new(version: u8, pubkey_hash: [u8; 20]) -> Self {
        Self {
            version,
            pubkey_hash,
        }
    }

    /// Address of `key` in compressed or uncompressed SEC1 form.
    pub fn from_public_key(key: &VerifyingKey, compressed: bool, version: u8) -> Self {
        let point = key.to_encoded_point(compressed);
        Self::new(version, hash160_of(point.as_bytes()))
    }

    /// Mainnet address of the compressed key; what the signers advertise.
    pub fn mainnet(key: &VerifyingKey) -> Self {
        Self::from_public_key(key, true, MAINNET_P2PKH)
    }

    /// True if `key` hashes to this address in either SEC1 form.
    pub fn matches_key(&self, key: &VerifyingKey) -> bool {
        [true, false]
            .iter()
            .any(|&compressed| Self::from_public_key(key, compressed, self.version) == *self)
    }

    pub fn to_base58(&self) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.version);
        payload.extend_from_slice(&self.pubkey_hash);
        base58::encode_check(&payload)
    }
}

pub fn hash160_of(bytes: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(bytes).to_byte_array()
}

impl FromStr for Address {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = base58::decode_check(s.trim()).map_err(|_| TemplateError::InvalidAddress)?;
        if payload.len() != 21 {
            return Err(TemplateError::InvalidAddress);
        }
        let mut pubkey_hash = [0u8; 20];
        pubkey_hash.copy_from_slice(&payload[1..]);
        Ok(Self::new(payload[0], pubkey_hash))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}
