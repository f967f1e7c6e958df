//! Protocol segmentation of output scripts.
//!
//! Bitcom convention: after the first top-level `OP_RETURN`, data pushes are grouped into
//! segments separated by a push of `|`. The first push of every segment is its protocol
//! label.
//!
//! ```text
//! <locking script> OP_RETURN <label A> <a1> <a2> | <label B> <b1> ...
//! ```

use alloc::string::String;
use alloc::vec::Vec;

use crate::script::{ChunkReader, OP_RETURN, PIPE};

/// A labeled byte range of an output script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSegment {
    pub label: String,
    /// Data pushes following the label.
    pub fields: Vec<Vec<u8>>,
    /// Raw script bytes of the segment (label included, delimiter excluded).
    pub payload: Vec<u8>,
    /// Offset of the delimiter that opens the segment (`OP_RETURN` or the `|` push).
    pub position: usize,
    /// Ordinal of the segment within the script.
    pub index: usize,
}

/// Splits an output script into protocol segments.
pub trait SegmentProvider {
    fn segments(&self, script: &[u8]) -> Vec<ProtocolSegment>;

    fn segments_with_label(&self, script: &[u8], label: &str) -> Vec<ProtocolSegment> {
        self.segments(script)
            .into_iter()
            .filter(|s| s.label == label)
            .collect()
    }
}

/// Default provider for pipe-delimited OP_RETURN data.
#[derive(Debug, Default, Clone, Copy)]
pub struct BitcomSegmenter;

struct Pending {
    position: usize,
    start: usize,
    pushes: Vec<Vec<u8>>,
}

impl Pending {
    fn new(position: usize, start: usize) -> Self {
        Self {
            position,
            start,
            pushes: Vec::new(),
        }
    }

    fn finish(self, script: &[u8], end: usize, index: usize) -> Option<ProtocolSegment> {
        let mut pushes = self.pushes.into_iter();
        let label = match String::from_utf8(pushes.next()?) {
            Ok(label) => label,
            Err(_) => {
                tracing::trace!(index, "skipping segment with non UTF-8 label");
                return None;
            }
        };
        Some(ProtocolSegment {
            label,
            fields: pushes.collect(),
            payload: script[self.start..end].to_vec(),
            position: self.position,
            index,
        })
    }
}

impl SegmentProvider for BitcomSegmenter {
    fn segments(&self, script: &[u8]) -> Vec<ProtocolSegment> {
        let mut out = Vec::new();
        let mut current: Option<Pending> = None;
        let mut index = 0usize;
        let mut end = script.len();

        for chunk in ChunkReader::new(script) {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    // Keep what was completed; the truncated tail is dropped.
                    tracing::trace!(error = %e, "script truncated inside a push");
                    current = None;
                    break;
                }
            };

            if current.is_none() {
                if chunk.opcode == OP_RETURN {
                    current = Some(Pending::new(chunk.offset, chunk.offset + chunk.len));
                }
                continue;
            }

            if chunk.pushes(&[PIPE]) {
                let next = Pending::new(chunk.offset, chunk.offset + chunk.len);
                if let Some(done) = current.replace(next) {
                    if let Some(segment) = done.finish(script, chunk.offset, index) {
                        out.push(segment);
                    }
                    index += 1;
                }
                continue;
            }

            match (chunk.data, current.as_mut()) {
                (Some(data), Some(pending)) => pending.pushes.push(data.to_vec()),
                (Some(_), None) => {}
                // Non-push opcodes inside OP_RETURN data end the segment list.
                (None, _) => {
                    end = chunk.offset;
                    break;
                }
            }
        }

        if let Some(done) = current {
            if let Some(segment) = done.finish(script, end, index) {
                out.push(segment);
            }
        }
        out
    }
}
