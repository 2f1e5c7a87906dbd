//! Low-level GATT link abstraction.
//!
//! [`GattLink`] is the seam between the framing/dispatch machinery and a
//! concrete BLE stack. The production implementation wraps a btleplug
//! peripheral; tests use the in-memory link from [`crate::testing`].

use std::future::Future;

use tokio::sync::mpsc;

use crate::TransportError;

/// GATT write mode for the TX characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    WithResponse,
    WithoutResponse,
}

impl WriteMode {
    /// The alternative mode, used for fallback after a write failure.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            WriteMode::WithResponse => WriteMode::WithoutResponse,
            WriteMode::WithoutResponse => WriteMode::WithResponse,
        }
    }
}

/// Write modes the TX characteristic supports.
#[derive(Debug, Clone, Copy)]
pub struct WriteCaps {
    pub with_response: bool,
    pub without_response: bool,
}

impl WriteCaps {
    pub fn supports(&self, mode: WriteMode) -> bool {
        match mode {
            WriteMode::WithResponse => self.with_response,
            WriteMode::WithoutResponse => self.without_response,
        }
    }

    /// The mode to start with: acknowledged writes when available.
    pub fn preferred(&self) -> WriteMode {
        if self.with_response {
            WriteMode::WithResponse
        } else {
            WriteMode::WithoutResponse
        }
    }
}

/// A connected GATT link carrying raw characteristic traffic.
///
/// Implementations bridge to an actual BLE stack; the transport layer above
/// handles framing, chunking, and write scheduling.
pub trait GattLink: Send + Sync + 'static {
    /// Human-readable identifier for logging.
    fn name(&self) -> &str;

    /// Write modes the TX characteristic supports.
    fn write_caps(&self) -> WriteCaps;

    /// Write one chunk to the TX characteristic.
    fn write(
        &self,
        chunk: &[u8],
        mode: WriteMode,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Take the RX notification chunk stream.
    ///
    /// The channel closes when the underlying connection drops. May only be
    /// called once; implementations panic on a second call.
    fn take_chunks(&mut self) -> mpsc::Receiver<Vec<u8>>;

    /// Tear down the connection: cancel subscriptions and disconnect.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}
