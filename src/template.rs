//! Deferred unlocking-script construction.

use bitcoin::{ScriptBuf, Transaction};

use crate::error::TemplateError;

/// A signer that produces the unlocking script for one input once the spending
/// transaction is final.
pub trait UnlockingTemplate {
    fn sign(&self, tx: &Transaction, input_index: usize) -> Result<ScriptBuf, TemplateError>;

    /// Upper bound of the unlocking script size, for fee estimation before signing.
    fn estimate_length(&self, tx: &Transaction, input_index: usize) -> usize;
}
