//! Canonical TLV metadata serialization.
//!
//! Commands and session-info verification both bind a canonical byte string:
//! each item is emitted as `tag(1) || len(1) || value(len)`, items appear in
//! strictly ascending tag order, empty values are skipped, and a single
//! `0xFF` byte terminates the sequence. The vehicle performs the identical
//! serialization on its side, so any divergence surfaces as an
//! authentication failure rather than decrypted garbage.
//!
//! The serialized bytes are used directly as HMAC input for session-info
//! authentication, and hashed with SHA-256 to form the AES-GCM associated
//! data for commands and responses.

use crate::ProtoError;

/// Metadata item tags. Values are part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum MetadataTag {
    SignatureType = 0,
    Domain = 1,
    Personalization = 2,
    Epoch = 3,
    ExpiresAt = 4,
    Counter = 5,
    Challenge = 6,
    Flags = 7,
    RequestHash = 8,
    Fault = 9,
}

impl TryFrom<u8> for MetadataTag {
    type Error = ProtoError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MetadataTag::SignatureType),
            1 => Ok(MetadataTag::Domain),
            2 => Ok(MetadataTag::Personalization),
            3 => Ok(MetadataTag::Epoch),
            4 => Ok(MetadataTag::ExpiresAt),
            5 => Ok(MetadataTag::Counter),
            6 => Ok(MetadataTag::Challenge),
            7 => Ok(MetadataTag::Flags),
            8 => Ok(MetadataTag::RequestHash),
            9 => Ok(MetadataTag::Fault),
            other => Err(ProtoError::UnsupportedTag(other)),
        }
    }
}

/// Terminator byte closing every metadata sequence.
pub const END_TAG: u8 = 0xFF;

/// Maximum length of a single item value.
pub const MAX_VALUE_LEN: usize = 255;

/// Incremental canonical TLV serializer.
pub struct Metadata {
    buf: Vec<u8>,
    last_tag: Option<u8>,
}

impl Metadata {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(64),
            last_tag: None,
        }
    }

    /// Append an item. Items must be added in strictly ascending tag order;
    /// empty values advance the order check but emit nothing.
    ///
    /// # Errors
    ///
    /// [`ProtoError::MetadataTagOrder`] if `tag` does not exceed the previous
    /// tag, [`ProtoError::MetadataValueTooLong`] if `value` exceeds 255 bytes.
    pub fn add(&mut self, tag: MetadataTag, value: &[u8]) -> Result<(), ProtoError> {
        if value.len() > MAX_VALUE_LEN {
            return Err(ProtoError::MetadataValueTooLong);
        }
        if let Some(last) = self.last_tag {
            if tag as u8 <= last {
                return Err(ProtoError::MetadataTagOrder);
            }
        }
        self.last_tag = Some(tag as u8);
        if value.is_empty() {
            return Ok(());
        }
        self.buf.push(tag as u8);
        self.buf.push(value.len() as u8);
        self.buf.extend_from_slice(value);
        Ok(())
    }

    /// Append a single-byte item.
    pub fn add_u8(&mut self, tag: MetadataTag, value: u8) -> Result<(), ProtoError> {
        self.add(tag, &[value])
    }

    /// Append a u32 item encoded as 4 bytes big-endian.
    pub fn add_u32(&mut self, tag: MetadataTag, value: u32) -> Result<(), ProtoError> {
        self.add(tag, &value.to_be_bytes())
    }

    /// Finish the sequence: returns the serialized items followed by the
    /// `0xFF` terminator.
    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.push(END_TAG);
        self.buf
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new()
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// The serializer is deterministic: the same ordered items always
        /// produce identical bytes.
        #[test]
        fn serialization_is_deterministic(
            values in proptest::collection::vec(
                proptest::collection::vec(any::<u8>(), 0..32),
                1..8,
            ),
        ) {
            let tags = [
                MetadataTag::SignatureType,
                MetadataTag::Domain,
                MetadataTag::Personalization,
                MetadataTag::Epoch,
                MetadataTag::ExpiresAt,
                MetadataTag::Counter,
                MetadataTag::Challenge,
                MetadataTag::Flags,
            ];
            let mut a = Metadata::new();
            let mut b = Metadata::new();
            for (tag, value) in tags.iter().zip(values.iter()) {
                a.add(*tag, value).unwrap();
                b.add(*tag, value).unwrap();
            }
            prop_assert_eq!(a.into_bytes(), b.into_bytes());
        }
    }
}
