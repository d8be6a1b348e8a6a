//! Streaming H.264 Annex-B NAL unit framer.
//!
//! Accepts arbitrary byte chunks and emits whole NAL units as start codes are
//! located, carrying any unfinished NAL unit across calls — an incremental
//! scan suitable for a byte-oriented frame source that may split a start
//! code, or a whole stream, across any chunk boundary.

use crate::error::{Result, RtspError};

const START_CODE_3: &[u8] = &[0x00, 0x00, 0x01];
const START_CODE_4: &[u8] = &[0x00, 0x00, 0x00, 0x01];

/// Bounded scratch buffer that accumulates input between NAL boundaries.
pub struct NalFramer {
    buffer: Vec<u8>,
    capacity: usize,
}

/// Location and length of a start code found in the framer's buffer.
struct StartCode {
    offset: usize,
    len: usize,
}

fn find_start_code(buf: &[u8], from: usize) -> Option<StartCode> {
    let mut i = from;
    while i < buf.len() {
        if i + 3 <= buf.len() && &buf[i..i + 3] == START_CODE_3 {
            return Some(StartCode { offset: i, len: 3 });
        }
        if i + 4 <= buf.len() && &buf[i..i + 4] == START_CODE_4 {
            return Some(StartCode { offset: i, len: 4 });
        }
        i += 1;
    }
    None
}

impl NalFramer {
    /// `capacity` bounds the scratch buffer; 1 MiB is the historical default.
    pub fn new(capacity: usize) -> Self {
        NalFramer {
            buffer: Vec::new(),
            capacity,
        }
    }

    /// Feeds a chunk of Annex-B bytes in, returning every complete NAL unit
    /// (start code stripped) that became available. An empty chunk flushes
    /// any single trailing NAL unit instead of appending.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Vec<u8>>> {
        if data.is_empty() {
            return Ok(self.flush());
        }

        if self.buffer.len() + data.len() > self.capacity {
            return Err(RtspError::Protocol(format!(
                "NAL framing buffer overflow: {} + {} > {}",
                self.buffer.len(),
                data.len(),
                self.capacity
            )));
        }

        self.buffer.extend_from_slice(data);
        Ok(self.drain())
    }

    fn drain(&mut self) -> Vec<Vec<u8>> {
        let mut emitted = Vec::new();

        loop {
            let first = match find_start_code(&self.buffer, 0) {
                Some(sc) => sc,
                None => break, // no start code anywhere yet; stall
            };

            if first.offset > 0 {
                // Desync: drop the garbage prefix before the first start code.
                self.buffer.drain(0..first.offset);
            }

            let nal_start = first.len;
            match find_start_code(&self.buffer, nal_start) {
                Some(next) => {
                    emitted.push(self.buffer[nal_start..next.offset].to_vec());
                    self.buffer.drain(0..next.offset);
                }
                None => break, // incomplete trailing NAL, need more bytes
            }
        }

        emitted
    }

    fn flush(&mut self) -> Vec<Vec<u8>> {
        let result = match find_start_code(&self.buffer, 0) {
            Some(first) if first.offset == 0 && self.buffer.len() > first.len => {
                match find_start_code(&self.buffer, first.len) {
                    None => vec![self.buffer[first.len..].to_vec()],
                    Some(_) => Vec::new(),
                }
            }
            _ => Vec::new(),
        };
        self.buffer.clear();
        result
    }
}
