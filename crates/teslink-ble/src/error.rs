//! Error types for the transport layer.

/// Errors that can occur during BLE transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("BLE error: {0}")]
    Ble(#[from] btleplug::Error),

    #[error("no Bluetooth adapter available")]
    NoAdapter,

    #[error("no matching vehicle found within the scan timeout")]
    NoDeviceFound,

    #[error("GATT characteristic {0} not found")]
    CharacteristicMissing(&'static str),

    #[error("transport not connected")]
    NotConnected,

    #[error("payload too large: {0} bytes (max 1024)")]
    PayloadTooLarge(usize),

    #[error("write failed after mode fallback and block shrinking: {0}")]
    WriteFailed(String),

    #[error("transport stopped")]
    Stopped,
}
