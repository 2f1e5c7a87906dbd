//! Length-prefix framing and fragment reassembly.
//!
//! Every logical message on the TX/RX characteristics is prefixed with a
//! 2-byte big-endian length; the maximum message size is 1024 bytes.
//! Notifications deliver arbitrary fragments of that byte stream, so the
//! accumulator buffers chunks and extracts complete messages. Two guards
//! protect the stream: a length header above the maximum resets the buffer,
//! and a gap of more than 1000 ms between chunks discards any partial
//! message (a truncated frame left behind by a reconnect would otherwise
//! desynchronize every later message).

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::TransportError;

/// Size of the big-endian length prefix.
pub const LENGTH_PREFIX_LEN: usize = 2;

/// Maximum logical message size.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Inter-chunk gap after which a partial message is considered stale.
pub const REASSEMBLY_GAP: Duration = Duration::from_millis(1000);

/// Prefix `payload` with its 2-byte big-endian length.
pub fn frame(payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    if payload.len() > MAX_MESSAGE_LEN {
        return Err(TransportError::PayloadTooLarge(payload.len()));
    }
    let mut framed = Vec::with_capacity(LENGTH_PREFIX_LEN + payload.len());
    framed.extend_from_slice(&(payload.len() as u16).to_be_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Stateful accumulator that buffers notification chunks and extracts
/// complete length-prefixed messages.
///
/// The caller supplies the arrival time of each chunk so the stale-gap
/// behavior stays testable without sleeping.
pub struct FrameAccumulator {
    buffer: Vec<u8>,
    last_chunk_at: Option<Instant>,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_MESSAGE_LEN + LENGTH_PREFIX_LEN),
            last_chunk_at: None,
        }
    }

    /// Feed one notification chunk, returning every complete message it
    /// finishes.
    pub fn feed(&mut self, chunk: &[u8], now: Instant) -> Vec<Vec<u8>> {
        if let Some(previous) = self.last_chunk_at {
            if now.saturating_duration_since(previous) > REASSEMBLY_GAP && !self.buffer.is_empty() {
                debug!(
                    discarded = self.buffer.len(),
                    "discarding stale partial frame"
                );
                self.buffer.clear();
            }
        }
        self.last_chunk_at = Some(now);
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while self.buffer.len() >= LENGTH_PREFIX_LEN {
            let length = u16::from_be_bytes([self.buffer[0], self.buffer[1]]) as usize;
            if length > MAX_MESSAGE_LEN {
                warn!(length, "oversize frame header, resetting buffer");
                self.buffer.clear();
                break;
            }
            if self.buffer.len() < LENGTH_PREFIX_LEN + length {
                break;
            }
            let message = self.buffer[LENGTH_PREFIX_LEN..LENGTH_PREFIX_LEN + length].to_vec();
            self.buffer.drain(..LENGTH_PREFIX_LEN + length);
            messages.push(message);
        }
        messages
    }

    /// Drop any buffered partial message.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last_chunk_at = None;
    }
}

impl Default for FrameAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
