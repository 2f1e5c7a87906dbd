//! In-memory [`GattLink`] for protocol tests.
//!
//! [`MockLink`] stands in for a connected peripheral: writes land in a
//! channel the test (or a scripted mock vehicle) drains, and inbound
//! notification chunks are injected through a [`MockLinkHandle`]. Dropping
//! the connection from the handle closes the chunk channel, which the
//! transport observes as a GATT disconnect.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::mpsc;

use crate::framing::{frame, FrameAccumulator};
use crate::link::{GattLink, WriteCaps, WriteMode};
use crate::TransportError;

type SharedChunkSender = Arc<Mutex<Option<mpsc::Sender<Vec<u8>>>>>;

/// Scriptable in-memory GATT link.
pub struct MockLink {
    caps: WriteCaps,
    chunk_rx: Option<mpsc::Receiver<Vec<u8>>>,
    chunk_tx: SharedChunkSender,
    writes: mpsc::UnboundedSender<(WriteMode, Vec<u8>)>,
    fail_writes: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
}

/// Test-side controls for a [`MockLink`].
pub struct MockLinkHandle {
    chunk_tx: SharedChunkSender,
    writes: mpsc::UnboundedReceiver<(WriteMode, Vec<u8>)>,
    fail_writes: Arc<AtomicUsize>,
    closed: Arc<AtomicBool>,
    reassembly: FrameAccumulator,
    pending_messages: Vec<Vec<u8>>,
}

impl MockLink {
    /// Create a link supporting both write modes, plus its control handle.
    pub fn new() -> (Self, MockLinkHandle) {
        Self::with_caps(WriteCaps {
            with_response: true,
            without_response: true,
        })
    }

    /// Create a link with specific write capabilities.
    pub fn with_caps(caps: WriteCaps) -> (Self, MockLinkHandle) {
        let (chunk_tx, chunk_rx) = mpsc::channel(256);
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let chunk_tx = Arc::new(Mutex::new(Some(chunk_tx)));
        let fail_writes = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicBool::new(false));

        let link = Self {
            caps,
            chunk_rx: Some(chunk_rx),
            chunk_tx: Arc::clone(&chunk_tx),
            writes: write_tx,
            fail_writes: Arc::clone(&fail_writes),
            closed: Arc::clone(&closed),
        };
        let handle = MockLinkHandle {
            chunk_tx,
            writes: write_rx,
            fail_writes,
            closed,
            reassembly: FrameAccumulator::new(),
            pending_messages: Vec::new(),
        };
        (link, handle)
    }
}

impl GattLink for MockLink {
    fn name(&self) -> &str {
        "MockLink"
    }

    fn write_caps(&self) -> WriteCaps {
        self.caps
    }

    async fn write(&self, chunk: &[u8], mode: WriteMode) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        if self
            .fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(TransportError::WriteFailed("injected failure".to_string()));
        }
        self.writes
            .send((mode, chunk.to_vec()))
            .map_err(|_| TransportError::NotConnected)
    }

    fn take_chunks(&mut self) -> mpsc::Receiver<Vec<u8>> {
        self.chunk_rx.take().expect("chunk stream already taken")
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.closed.store(true, Ordering::SeqCst);
        self.chunk_tx.lock().expect("poisoned").take();
        Ok(())
    }
}

impl MockLinkHandle {
    /// Inject one inbound notification chunk.
    pub async fn inject(&self, chunk: &[u8]) {
        let sender = self.chunk_tx.lock().expect("poisoned").clone();
        if let Some(sender) = sender {
            let _ = sender.send(chunk.to_vec()).await;
        }
    }

    /// Frame `payload` and inject it split into `chunk_size`-byte pieces.
    pub async fn inject_message(&self, payload: &[u8], chunk_size: usize) {
        let framed = frame(payload).expect("payload within frame limit");
        for chunk in framed.chunks(chunk_size.max(1)) {
            self.inject(chunk).await;
        }
    }

    /// Close the chunk channel, which the transport observes as a
    /// disconnect.
    pub fn drop_connection(&self) {
        self.chunk_tx.lock().expect("poisoned").take();
    }

    /// Make the next `n` writes fail.
    pub fn fail_next_writes(&self, n: usize) {
        self.fail_writes.store(n, Ordering::SeqCst);
    }

    /// Whether the link has been closed from the transport side.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// The next successfully written chunk, or `None` if the link dropped.
    pub async fn next_write(&mut self) -> Option<(WriteMode, Vec<u8>)> {
        self.writes.recv().await
    }

    /// Reassemble written chunks until one complete outbound message is
    /// available, mirroring the vehicle's view of the TX stream.
    pub async fn next_message(&mut self) -> Option<Vec<u8>> {
        loop {
            if !self.pending_messages.is_empty() {
                return Some(self.pending_messages.remove(0));
            }
            let (_, chunk) = self.next_write().await?;
            self.pending_messages
                .extend(self.reassembly.feed(&chunk, Instant::now()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_is_observable() {
        let (link, mut handle) = MockLink::new();
        link.write(&[1, 2, 3], WriteMode::WithResponse).await.unwrap();
        assert_eq!(
            handle.next_write().await,
            Some((WriteMode::WithResponse, vec![1, 2, 3])),
        );
    }

    #[tokio::test]
    async fn test_injected_failures_are_consumed() {
        let (link, handle) = MockLink::new();
        handle.fail_next_writes(1);
        assert!(link.write(&[0], WriteMode::WithResponse).await.is_err());
        assert!(link.write(&[0], WriteMode::WithResponse).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_rejects_writes() {
        let (link, _handle) = MockLink::new();
        link.close().await.unwrap();
        assert!(matches!(
            link.write(&[0], WriteMode::WithResponse).await,
            Err(TransportError::NotConnected),
        ));
    }

    #[tokio::test]
    async fn test_next_message_reassembles_writes() {
        let (link, mut handle) = MockLink::new();
        let framed = frame(&[0xAA; 50]).unwrap();
        for chunk in framed.chunks(7) {
            link.write(chunk, WriteMode::WithResponse).await.unwrap();
        }
        assert_eq!(handle.next_message().await, Some(vec![0xAA; 50]));
    }
}
