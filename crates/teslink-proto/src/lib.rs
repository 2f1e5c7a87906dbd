//! Wire schema and codec for the teslink vehicle BLE client.
//!
//! This crate defines the static protobuf schema descriptor for the
//! vehicle's routing envelope and nested payloads, the canonical TLV
//! metadata serializer used as AEAD associated data and HMAC input, and the
//! builder/extractor operations the session layer drives.

pub mod error;
pub mod messages;
pub mod metadata;
pub mod schema;
pub mod types;

pub use error::ProtoError;
pub use metadata::{Metadata, MetadataTag};
pub use types::{InvalidLength, RequestUuid, RoutingAddress};
