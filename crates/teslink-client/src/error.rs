//! Error types for the session layer.

use teslink_ble::TransportError;
use teslink_crypto::CryptoError;
use teslink_proto::ProtoError;

/// Errors surfaced by the vehicle session façade.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtoError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Session-info HMAC mismatch or response decryption failure. The
    /// session is invalidated; the next call re-handshakes.
    #[error("authentication failed: {0}")]
    Authentication(&'static str),

    /// The vehicle processed the request and reported an error of its own.
    #[error("vehicle reported error: {0}")]
    VehicleReported(String),

    #[error("request timed out")]
    Timeout,

    #[error("transport disconnected")]
    Disconnected,

    #[error("no established session for domain")]
    NoSession,
}
