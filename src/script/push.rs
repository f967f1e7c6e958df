// src/script/push.rs

use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::error::TemplateError;
use crate::script::{MAX_DIRECT_PUSH, OP_0, OP_PUSHDATA1, OP_PUSHDATA2, OP_PUSHDATA4};

/// One parsed script operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    pub opcode: u8,
    /// Payload of a push opcode (0x00–0x4e); `None` for every other opcode.
    pub data: Option<&'a [u8]>,
    /// Byte offset of the opcode within the script.
    pub offset: usize,
    /// Encoded length (opcode + length prefix + payload).
    pub len: usize,
}

impl Chunk<'_> {
    pub fn is_push(&self) -> bool {
        self.data.is_some()
    }

    /// True for a push of exactly `bytes`.
    pub fn pushes(&self, bytes: &[u8]) -> bool {
        self.data == Some(bytes)
    }
}

/// Appends `data` as one push operation using the shortest length encoding.
/// Empty → OP_0; 1–75 → length opcode; ≤255 → PUSHDATA1; ≤65535 → PUSHDATA2; else PUSHDATA4.
/// Single bytes 1–16 are NOT rewritten to OP_1..OP_16; signed messages depend on this.
pub fn write_push_data(buf: &mut Vec<u8>, data: &[u8]) {
    let len = data.len();
    if len == 0 {
        buf.push(OP_0);
        return;
    }
    if len <= MAX_DIRECT_PUSH {
        buf.push(len as u8);
    } else if len <= 0xff {
        buf.push(OP_PUSHDATA1);
        buf.push(len as u8);
    } else if len <= 0xffff {
        buf.push(OP_PUSHDATA2);
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, len as u16);
        buf.extend_from_slice(&b);
    } else {
        buf.push(OP_PUSHDATA4);
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, len as u32);
        buf.extend_from_slice(&b);
    }
    buf.extend_from_slice(data);
}

/// Parses the operation starting at `script[offset]`.
pub fn read_chunk(script: &[u8], offset: usize) -> Result<Chunk<'_>, TemplateError> {
    let rest = script.get(offset..).ok_or(TemplateError::IncompleteData)?;
    let (&opcode, after) = rest.split_first().ok_or(TemplateError::IncompleteData)?;

    let (prefix_len, data_len): (usize, usize) = match opcode {
        OP_0 => (0, 0),
        n if (n as usize) <= MAX_DIRECT_PUSH => (0, n as usize),
        OP_PUSHDATA1 => {
            let b = after.first().ok_or(TemplateError::IncompleteData)?;
            (1, *b as usize)
        }
        OP_PUSHDATA2 => {
            if after.len() < 2 {
                return Err(TemplateError::IncompleteData);
            }
            (2, LittleEndian::read_u16(&after[..2]) as usize)
        }
        OP_PUSHDATA4 => {
            if after.len() < 4 {
                return Err(TemplateError::IncompleteData);
            }
            (4, LittleEndian::read_u32(&after[..4]) as usize)
        }
        _ => {
            return Ok(Chunk {
                opcode,
                data: None,
                offset,
                len: 1,
            })
        }
    };

    let end = prefix_len
        .checked_add(data_len)
        .ok_or(TemplateError::IncompleteData)?;
    let payload = after
        .get(prefix_len..end)
        .ok_or(TemplateError::IncompleteData)?;
    Ok(Chunk {
        opcode,
        data: Some(payload),
        offset,
        len: 1 + prefix_len + data_len,
    })
}

/// Iterates a script chunk by chunk. Yields one `Err` on a truncated push, then stops.
pub struct ChunkReader<'a> {
    script: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> ChunkReader<'a> {
    pub fn new(script: &'a [u8]) -> Self {
        Self {
            script,
            offset: 0,
            failed: false,
        }
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = Result<Chunk<'a>, TemplateError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.script.len() {
            return None;
        }
        match read_chunk(self.script, self.offset) {
            Ok(chunk) => {
                self.offset += chunk.len;
                Some(Ok(chunk))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn push_opcode_boundaries() {
        let cases: [(usize, &[u8]); 6] = [
            (0, &[0x00]),
            (1, &[0x01]),
            (75, &[0x4b]),
            (76, &[0x4c, 0x4c]),
            (256, &[0x4d, 0x00, 0x01]),
            (65_536, &[0x4e, 0x00, 0x00, 0x01, 0x00]),
        ];
        for (len, prefix) in cases {
            let data = vec![0xabu8; len];
            let mut buf = Vec::new();
            write_push_data(&mut buf, &data);
            assert_eq!(&buf[..prefix.len()], prefix, "prefix for len {}", len);
            assert_eq!(buf.len(), prefix.len() + len);

            let chunk = read_chunk(&buf, 0).expect("read back");
            assert_eq!(chunk.data, Some(data.as_slice()));
            assert_eq!(chunk.len, buf.len());
        }
    }

    #[test]
    fn single_small_byte_stays_a_data_push() {
        let mut buf = Vec::new();
        write_push_data(&mut buf, &[0x05]);
        assert_eq!(buf, vec![0x01, 0x05]);
    }

    #[test]
    fn reader_reports_offsets_and_non_push_opcodes() {
        // OP_DUP, push(2), OP_RETURN
        let script = [0x76, 0x02, 0xaa, 0xbb, 0x6a];
        let chunks: Vec<_> = ChunkReader::new(&script)
            .collect::<Result<_, _>>()
            .expect("well formed");
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].opcode, 0x76);
        assert!(!chunks[0].is_push());
        assert_eq!(chunks[1].offset, 1);
        assert!(chunks[1].pushes(&[0xaa, 0xbb]));
        assert_eq!(chunks[2].offset, 4);
    }

    #[test]
    fn truncated_push_yields_one_error_then_stops() {
        let script = [0x01, 0x7c, 0x05, 0x01];
        let mut reader = ChunkReader::new(&script);
        assert!(reader.next().expect("first").is_ok());
        assert_eq!(reader.next(), Some(Err(TemplateError::IncompleteData)));
        assert_eq!(reader.next(), None);
    }

    #[test]
    fn oversized_pushdata4_length_is_incomplete() {
        assert_eq!(
            read_chunk(&[0x4e, 0xff, 0xff, 0xff, 0xff], 0),
            Err(TemplateError::IncompleteData)
        );
        assert_eq!(
            read_chunk(&[0x4d, 0xff, 0xff, 0x01], 0),
            Err(TemplateError::IncompleteData)
        );
    }
}
