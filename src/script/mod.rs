//! Script binary format: opcode constants, push-data chunks and minimal script numbers.

pub mod number;
pub mod push;

pub use push::{read_chunk, write_push_data, Chunk, ChunkReader};

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
/// `OP_1..OP_16` are `OP_1 + (n - 1)`.
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;

/// Largest length encoded directly in the opcode byte.
pub const MAX_DIRECT_PUSH: usize = 0x4b;

/// Bitcom segment delimiter (`|`), pushed as a one-byte data chunk.
pub const PIPE: u8 = 0x7c;
