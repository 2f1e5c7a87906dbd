//! BLE GATT transport for the teslink vehicle client.
//!
//! This crate provides the byte-level transport: device discovery filtered
//! by the VIN-derived advertisement name, the fixed GATT service and
//! characteristics, 2-byte length-prefix framing with fragment reassembly,
//! and chunked FIFO writes with write-mode fallback.

pub mod error;
pub mod framing;
pub mod link;
pub mod peripheral;
pub mod testing;
pub mod transport;
pub mod uuids;

pub use error::TransportError;
pub use link::{GattLink, WriteCaps, WriteMode};
pub use peripheral::{scan_for_vehicle, BlePeripheralLink, DiscoveryMode};
pub use transport::{BleTransport, TransportEvent};
