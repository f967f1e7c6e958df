#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

// Needed for Vec / String
extern crate alloc;

pub mod address;
pub mod aip;
pub mod bsm;
pub mod compact_size;
pub mod direct;
pub mod error;
pub mod lock;
pub mod script;
pub mod segment;
pub mod sighash;
pub mod sigma;
pub mod template;

pub use address::Address;
pub use aip::AipRecord;
pub use bsm::CompactSignature;
pub use direct::DirectRecovery;
pub use error::TemplateError;
pub use lock::{LockParameters, LockUnlocker};
pub use segment::{BitcomSegmenter, ProtocolSegment, SegmentProvider};
pub use sighash::{SighashMode, SighashType};
pub use sigma::{Algorithm, Sigma, SigmaSignature, SignatureRecord, SigningAlgorithm};
pub use template::UnlockingTemplate;
