// src/error.rs

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The script ended in the middle of a push-data operation.
    IncompleteData,

    /// Bytes were left over after a single encoded operation was decoded.
    TrailingData(usize),

    /// An opcode was found where a push (or small-integer) operation was required.
    UnexpectedOpcode(u8),

    /// Script-number payload is longer than 8 bytes and does not fit in an i64.
    NumberOverflow(usize),

    /// Script does not carry the Lock prefix/suffix.
    NotALockScript,

    /// Address failed base58check decoding or is not a 21-byte P2PKH payload.
    InvalidAddress,

    /// Compact signature was not exactly 65 bytes.
    InvalidSignatureLength(usize),

    /// Base64 transport encoding of a signature could not be decoded.
    InvalidBase64,

    /// The signing primitive (or the direct-recovery collaborator) failed.
    SigningFailed,

    /// Output index is not present in the transaction.
    OutputIndexOutOfRange(u32),

    /// Input index is not present in the transaction.
    InputIndexOutOfRange(u32),

    /// Spent outpoint is null, so the source transaction id cannot be determined.
    MissingSourceTxid,

    /// Source output amount or locking script was neither supplied nor available.
    MissingSourceOutput,

    /// No protocol segment exists at the requested signature index.
    SegmentNotFound(usize),

    /// The OP_RETURN data does not split into segments up to the end of the script, so an
    /// appended segment could not be found again.
    DataSectionNotSegmentable,
}

// Manual implementation of Display for no_std environments.
impl core::fmt::Display for TemplateError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::IncompleteData => write!(f, "Incomplete script data"),
            Self::TrailingData(n) => write!(f, "Trailing data: {} bytes left after decode", n),
            Self::UnexpectedOpcode(op) => write!(f, "Unexpected opcode: 0x{:02x}", op),
            Self::NumberOverflow(len) => {
                write!(f, "Script number too long: {} bytes (max 8)", len)
            }
            Self::NotALockScript => write!(f, "Not a Lock script"),
            Self::InvalidAddress => write!(f, "Invalid P2PKH address"),
            Self::InvalidSignatureLength(len) => {
                write!(f, "Invalid compact signature length: {} (expected 65)", len)
            }
            Self::InvalidBase64 => write!(f, "Invalid base64 signature encoding"),
            Self::SigningFailed => write!(f, "Signing failed"),
            Self::OutputIndexOutOfRange(i) => write!(f, "Output index {} out of range", i),
            Self::InputIndexOutOfRange(i) => write!(f, "Input index {} out of range", i),
            Self::MissingSourceTxid => {
                write!(f, "Source transaction id is required to build the unlocking script")
            }
            Self::MissingSourceOutput => {
                write!(f, "Source output amount and locking script are required")
            }
            Self::SegmentNotFound(i) => write!(f, "No protocol segment at signature index {}", i),
            Self::DataSectionNotSegmentable => {
                write!(f, "OP_RETURN data does not segment to the end of the script")
            }
        }
    }
}

// Enable standard Error trait if the "std" feature is on.
#[cfg(feature = "std")]
impl std::error::Error for TemplateError {}
