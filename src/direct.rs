//! Direct-recovery signature scheme (SIGMA algorithm `BRC77`).
//!
//! The scheme's wire format is owned by the implementation behind this trait; signatures
//! are carried as opaque bytes and never parsed here.

use alloc::vec::Vec;

use k256::ecdsa::{SigningKey, VerifyingKey};

use crate::error::TemplateError;

pub trait DirectRecovery {
    /// Signs `message`. With `verifier` set the signature is private: only the holder of
    /// the verifier's private key can check it.
    fn sign(
        &self,
        message: &[u8],
        key: &SigningKey,
        verifier: Option<&VerifyingKey>,
    ) -> Result<Vec<u8>, TemplateError>;

    /// Checks `signature` over `message`. `verifier_key` is required for private
    /// signatures. Any failure is `false`.
    fn verify(&self, message: &[u8], signature: &[u8], verifier_key: Option<&SigningKey>) -> bool;
}
