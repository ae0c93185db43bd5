//! Magic-tagged length-prefixed frames.
//!
//! Layout: `magic: u32 BE | len: u32 BE | JSON body (len bytes)`.
//! The decoder accepts bytes in arbitrary chunks. Anything that does not
//! look like a frame of the expected type is skipped, and decoding picks up
//! again at the next valid frame.

use crate::communication::messages::WireMessage;
use crate::global_variables::MAX_FRAME_LEN;
use log::debug;
use std::collections::VecDeque;
use std::marker::PhantomData;
use thiserror::Error;

pub const HEADER_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("frame body of {0} bytes exceeds the frame limit")]
    Oversized(usize),
    #[error("channel closed")]
    Closed,
}

pub fn encode_frame<T: WireMessage>(message: &T) -> Result<Vec<u8>, WireError> {
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(WireError::Oversized(body.len()));
    }
    let mut frame = Vec::with_capacity(HEADER_LEN + body.len());
    frame.extend_from_slice(&T::MAGIC.to_be_bytes());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Streaming decoder for frames carrying `T`.
#[derive(Debug)]
pub struct FrameDecoder<T> {
    buffer: VecDeque<u8>,
    discarded: u64,
    _message: PhantomData<fn() -> T>,
}

impl<T> Default for FrameDecoder<T> {
    fn default() -> Self {
        Self {
            buffer: VecDeque::new(),
            discarded: 0,
            _message: PhantomData,
        }
    }
}

impl<T: WireMessage> FrameDecoder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Bytes received but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Number of bytes skipped while looking for a valid frame.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn read_u32(&self, at: usize) -> u32 {
        let mut raw = [0u8; 4];
        for (i, byte) in raw.iter_mut().enumerate() {
            *byte = self.buffer[at + i];
        }
        u32::from_be_bytes(raw)
    }

    fn skip_byte(&mut self) {
        self.buffer.pop_front();
        self.discarded += 1;
    }

    /// Returns the next complete message, or `None` if more bytes are needed.
    pub fn next_message(&mut self) -> Option<T> {
        loop {
            if self.buffer.len() < HEADER_LEN {
                return None;
            }
            if self.read_u32(0) != T::MAGIC {
                self.skip_byte();
                continue;
            }
            let len = self.read_u32(4) as usize;
            if len > MAX_FRAME_LEN {
                debug!("discarding frame header with length {len}");
                self.skip_byte();
                continue;
            }
            if self.buffer.len() < HEADER_LEN + len {
                return None;
            }

            let body: Vec<u8> = self
                .buffer
                .range(HEADER_LEN..HEADER_LEN + len)
                .copied()
                .collect();
            match serde_json::from_slice::<T>(&body) {
                Ok(message) => {
                    self.buffer.drain(..HEADER_LEN + len);
                    return Some(message);
                }
                Err(e) => {
                    // The header may belong to a truncated frame whose declared
                    // length swallowed the frames behind it; rescan from the next byte.
                    debug!("discarding malformed frame: {e}");
                    self.skip_byte();
                }
            }
        }
    }
}
