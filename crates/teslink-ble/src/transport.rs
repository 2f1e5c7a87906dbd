//! Framed message transport over a GATT link.
//!
//! Outbound messages are length-prefixed and written in MTU-derived chunks
//! behind a FIFO: a send does not begin until the previous send has fully
//! completed, so frames from different logical messages never interleave on
//! the air. Inbound notification chunks are reassembled into complete
//! messages by a pump task and surfaced as [`TransportEvent`]s.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::framing::{frame, FrameAccumulator};
use crate::link::{GattLink, WriteCaps, WriteMode};
use crate::TransportError;

/// Default block length when the MTU is unknown.
pub const DEFAULT_BLOCK_LENGTH: usize = 185;

/// Smallest block length the fallback path will shrink to.
pub const MIN_BLOCK_LENGTH: usize = 20;

/// MTU requested on platforms that permit it (best-effort).
pub const PREFERRED_MTU: usize = 247;

/// Derive the write block length from a negotiated MTU.
///
/// `min(preferred, max(20, mtu - 3))`; when the stack exposes no MTU the
/// block length is capped at the safe default of 185.
#[must_use]
pub fn block_length_for_mtu(preferred: usize, mtu: Option<usize>) -> usize {
    match mtu {
        Some(mtu) => preferred.min(MIN_BLOCK_LENGTH.max(mtu.saturating_sub(3))),
        None => preferred.min(DEFAULT_BLOCK_LENGTH),
    }
}

/// Events surfaced to the layer above.
#[derive(Debug)]
pub enum TransportEvent {
    /// A complete reassembled message.
    Message(Vec<u8>),
    /// The link dropped; no further events will follow.
    Disconnected,
}

struct SendState {
    block_length: usize,
    mode: WriteMode,
}

/// Framed transport over a [`GattLink`].
pub struct BleTransport<L: GattLink> {
    link: Arc<L>,
    caps: WriteCaps,
    send_state: Mutex<SendState>,
    connected: Arc<AtomicBool>,
    events: Option<mpsc::Receiver<TransportEvent>>,
    pump: JoinHandle<()>,
}

impl<L: GattLink> BleTransport<L> {
    /// Wrap a connected link, spawning the notification pump.
    pub fn new(mut link: L, preferred_block_length: usize, mtu: Option<usize>) -> Self {
        let chunks = link.take_chunks();
        let caps = link.write_caps();
        let (event_tx, event_rx) = mpsc::channel(64);
        let connected = Arc::new(AtomicBool::new(true));
        let pump = tokio::spawn(Self::pump(chunks, event_tx, Arc::clone(&connected)));

        Self {
            link: Arc::new(link),
            caps,
            send_state: Mutex::new(SendState {
                block_length: block_length_for_mtu(preferred_block_length, mtu),
                mode: caps.preferred(),
            }),
            connected,
            events: Some(event_rx),
            pump,
        }
    }

    async fn pump(
        mut chunks: mpsc::Receiver<Vec<u8>>,
        events: mpsc::Sender<TransportEvent>,
        connected: Arc<AtomicBool>,
    ) {
        let mut accumulator = FrameAccumulator::new();
        while let Some(chunk) = chunks.recv().await {
            for message in accumulator.feed(&chunk, Instant::now()) {
                if events.send(TransportEvent::Message(message)).await.is_err() {
                    return;
                }
            }
        }
        connected.store(false, Ordering::SeqCst);
        let _ = events.send(TransportEvent::Disconnected).await;
    }

    /// Take the event stream. May only be called once.
    pub fn events(&mut self) -> mpsc::Receiver<TransportEvent> {
        self.events
            .take()
            .expect("transport event stream already taken")
    }

    /// Whether the link is still up.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Frame `payload` and write it in block-sized chunks.
    ///
    /// Holding the send-state lock for the whole message serializes sends
    /// into a FIFO. On a chunk write failure the transport retries in the
    /// other supported write mode; if that fails too it halves the block
    /// length (down to 20) and retries from the failed offset.
    pub async fn send(&self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        let framed = frame(payload)?;
        let mut state = self.send_state.lock().await;

        let mut offset = 0;
        while offset < framed.len() {
            let end = (offset + state.block_length).min(framed.len());
            match self.write_with_fallback(&framed[offset..end], &mut state).await {
                Ok(()) => offset = end,
                Err(err) if state.block_length > MIN_BLOCK_LENGTH => {
                    state.block_length = (state.block_length / 2).max(MIN_BLOCK_LENGTH);
                    warn!(
                        block_length = state.block_length,
                        error = %err,
                        "chunk write failed, shrinking block length"
                    );
                }
                Err(err) => {
                    self.connected.store(false, Ordering::SeqCst);
                    let _ = self.link.close().await;
                    return Err(err);
                }
            }
        }
        Ok(())
    }

    async fn write_with_fallback(
        &self,
        chunk: &[u8],
        state: &mut SendState,
    ) -> Result<(), TransportError> {
        let first_error = match self.link.write(chunk, state.mode).await {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };

        let fallback = state.mode.other();
        if self.caps.supports(fallback) {
            debug!(?fallback, error = %first_error, "write failed, trying other mode");
            if self.link.write(chunk, fallback).await.is_ok() {
                // The fallback mode worked; keep using it.
                state.mode = fallback;
                return Ok(());
            }
        }
        Err(TransportError::WriteFailed(first_error.to_string()))
    }

    /// Tear down the link. Pending events drain, then `Disconnected` fires.
    pub async fn close(&self) -> Result<(), TransportError> {
        self.connected.store(false, Ordering::SeqCst);
        self.link.close().await
    }
}

impl<L: GattLink> Drop for BleTransport<L> {
    fn drop(&mut self) {
        self.pump.abort();
    }
}
