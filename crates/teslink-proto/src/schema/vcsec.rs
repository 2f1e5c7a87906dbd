//! Vehicle security domain messages: the key-enrollment envelope.

use super::keys;

/// Signature schemes understood by the security controller.
///
/// `PresentKey` means "no cryptographic signature; the request is authorized
/// by a physical NFC-card tap on the vehicle".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SignatureType {
    None = 0,
    PresentKey = 2,
}

/// Physical form factor of the key being enrolled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum KeyFormFactor {
    Unknown = 0,
    NfcCard = 1,
    IosDevice = 6,
    AndroidDevice = 7,
    CloudKey = 9,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PublicKey {
    /// 65-byte uncompressed SEC1 P-256 point.
    #[prost(bytes = "vec", tag = "1")]
    pub public_key_raw: Vec<u8>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyMetadata {
    #[prost(enumeration = "KeyFormFactor", tag = "1")]
    pub key_form_factor: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PermissionChange {
    #[prost(message, optional, tag = "1")]
    pub key: Option<PublicKey>,
    /// 0 means no expiry.
    #[prost(uint32, tag = "2")]
    pub seconds_to_be_active: u32,
    #[prost(enumeration = "keys::Role", tag = "3")]
    pub key_role: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WhitelistOperation {
    #[prost(oneof = "whitelist_operation::SubMessage", tags = "1, 2, 3, 4, 6")]
    pub sub_message: Option<whitelist_operation::SubMessage>,
    #[prost(message, optional, tag = "14")]
    pub metadata_for_key: Option<KeyMetadata>,
}

pub mod whitelist_operation {
    use super::{PermissionChange, PublicKey};

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum SubMessage {
        #[prost(message, tag = "1")]
        AddPublicKeyToWhitelist(PublicKey),
        #[prost(message, tag = "2")]
        RemovePublicKeyFromWhitelist(PublicKey),
        #[prost(message, tag = "3")]
        AddPermissionsToPublicKey(PermissionChange),
        #[prost(message, tag = "4")]
        RemovePermissionsFromPublicKey(PermissionChange),
        #[prost(message, tag = "6")]
        AddKeyToWhitelistAndAddPermissions(PermissionChange),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UnsignedMessage {
    #[prost(oneof = "unsigned_message::SubMessage", tags = "16")]
    pub sub_message: Option<unsigned_message::SubMessage>,
}

pub mod unsigned_message {
    use super::WhitelistOperation;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum SubMessage {
        #[prost(message, tag = "16")]
        WhitelistOperation(WhitelistOperation),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SignedMessage {
    /// Encoded [`UnsignedMessage`].
    #[prost(bytes = "vec", tag = "2")]
    pub protobuf_message_as_bytes: Vec<u8>,
    #[prost(enumeration = "SignatureType", tag = "3")]
    pub signature_type: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ToVcsecMessage {
    #[prost(message, optional, tag = "1")]
    pub signed_message: Option<SignedMessage>,
}
