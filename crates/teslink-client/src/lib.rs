//! Authenticated BLE command-and-state session for Tesla vehicles.
//!
//! This crate ties the transport, codec, and crypto layers together: the
//! ECDH handshake authenticating vehicle session info, per-domain session
//! state with anti-replay counters, the UUID-keyed request multiplexer, and
//! the [`Vehicle`] façade exposing encrypted state fetches and key
//! enrollment.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod session;
pub mod vehicle;

pub use config::ClientConfig;
pub use error::ClientError;
pub use vehicle::{Vehicle, VehicleStateResult};
