//! Signature payloads: session info and the per-scheme signature data
//! attached to authenticated messages.

/// Signature scheme selectors. The oneof field numbers in [`SignatureData`]
/// deliberately equal these values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SignatureType {
    AesGcm = 0,
    AesGcmPersonalized = 5,
    Hmac = 6,
    HmacPersonalized = 8,
    AesGcmResponse = 9,
}

/// Whether the queried key was known to the vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SessionInfoStatus {
    Ok = 0,
    KeyNotOnWhitelist = 1,
}

/// Vehicle-supplied session context for one domain.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionInfo {
    /// Anti-replay counter floor; client counters must exceed it.
    #[prost(uint32, tag = "1")]
    pub counter: u32,
    /// Vehicle's P-256 public key, 65-byte uncompressed SEC1.
    #[prost(bytes = "vec", tag = "2")]
    pub public_key: Vec<u8>,
    /// Opaque epoch binding session validity; a new epoch voids prior counters.
    #[prost(bytes = "vec", tag = "3")]
    pub epoch: Vec<u8>,
    /// Vehicle clock, seconds.
    #[prost(uint32, tag = "4")]
    pub clock_time: u32,
    #[prost(enumeration = "SessionInfoStatus", tag = "5")]
    pub status: i32,
}

/// Identity of the message signer.
#[derive(Clone, PartialEq, prost::Message)]
pub struct KeyIdentity {
    #[prost(oneof = "key_identity::IdentityType", tags = "1, 3")]
    pub identity_type: Option<key_identity::IdentityType>,
}

pub mod key_identity {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum IdentityType {
        #[prost(bytes = "vec", tag = "1")]
        PublicKey(Vec<u8>),
        #[prost(bytes = "vec", tag = "3")]
        Handle(Vec<u8>),
    }
}

impl KeyIdentity {
    pub fn from_public_key(public_key: &[u8]) -> Self {
        Self {
            identity_type: Some(key_identity::IdentityType::PublicKey(public_key.to_vec())),
        }
    }
}

/// AES-GCM command signature material.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AesGcmPersonalizedData {
    #[prost(bytes = "vec", tag = "1")]
    pub epoch: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub nonce: Vec<u8>,
    #[prost(uint32, tag = "3")]
    pub counter: u32,
    #[prost(uint32, tag = "4")]
    pub expires_at: u32,
    #[prost(bytes = "vec", tag = "5")]
    pub tag: Vec<u8>,
}

/// AES-GCM response signature material.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AesGcmResponseData {
    #[prost(bytes = "vec", tag = "1")]
    pub nonce: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub counter: u32,
    #[prost(bytes = "vec", tag = "3")]
    pub tag: Vec<u8>,
}

/// Bare HMAC tag.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HmacData {
    #[prost(bytes = "vec", tag = "1")]
    pub tag: Vec<u8>,
}

/// Personalized HMAC signature material.
#[derive(Clone, PartialEq, prost::Message)]
pub struct HmacPersonalizedData {
    #[prost(bytes = "vec", tag = "1")]
    pub epoch: Vec<u8>,
    #[prost(uint32, tag = "2")]
    pub counter: u32,
    #[prost(uint32, tag = "3")]
    pub expires_at: u32,
    #[prost(bytes = "vec", tag = "4")]
    pub tag: Vec<u8>,
}

/// HMAC authenticating a session-info payload.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionInfoTag {
    #[prost(bytes = "vec", tag = "1")]
    pub tag: Vec<u8>,
}

/// Signature attached to a routable message.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SignatureData {
    #[prost(message, optional, tag = "1")]
    pub signer_identity: Option<KeyIdentity>,
    #[prost(oneof = "signature_data::SigType", tags = "5, 6, 7, 8, 9")]
    pub sig_type: Option<signature_data::SigType>,
}

pub mod signature_data {
    use super::{
        AesGcmPersonalizedData, AesGcmResponseData, HmacData, HmacPersonalizedData,
        SessionInfoTag,
    };

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum SigType {
        #[prost(message, tag = "5")]
        AesGcmPersonalizedData(AesGcmPersonalizedData),
        #[prost(message, tag = "6")]
        SessionInfoTag(SessionInfoTag),
        #[prost(message, tag = "7")]
        HmacData(HmacData),
        #[prost(message, tag = "8")]
        HmacPersonalizedData(HmacPersonalizedData),
        #[prost(message, tag = "9")]
        AesGcmResponseData(AesGcmResponseData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_session_info_roundtrip() {
        let info = SessionInfo {
            counter: 7,
            public_key: vec![0x04; 65],
            epoch: vec![0xEE; 16],
            clock_time: 100,
            status: SessionInfoStatus::Ok as i32,
        };
        let decoded = SessionInfo::decode(info.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn test_signature_data_roundtrip_all_variants() {
        let variants = vec![
            signature_data::SigType::AesGcmPersonalizedData(AesGcmPersonalizedData {
                epoch: vec![1; 16],
                nonce: vec![2; 12],
                counter: 3,
                expires_at: 4,
                tag: vec![5; 16],
            }),
            signature_data::SigType::SessionInfoTag(SessionInfoTag { tag: vec![6; 32] }),
            signature_data::SigType::HmacData(HmacData { tag: vec![7; 32] }),
            signature_data::SigType::HmacPersonalizedData(HmacPersonalizedData {
                epoch: vec![8; 16],
                counter: 9,
                expires_at: 10,
                tag: vec![11; 32],
            }),
            signature_data::SigType::AesGcmResponseData(AesGcmResponseData {
                nonce: vec![12; 12],
                counter: 13,
                tag: vec![14; 16],
            }),
        ];
        for sig_type in variants {
            let data = SignatureData {
                signer_identity: Some(KeyIdentity::from_public_key(&[0x04; 65])),
                sig_type: Some(sig_type),
            };
            let decoded = SignatureData::decode(data.encode_to_vec().as_slice()).unwrap();
            assert_eq!(decoded, data);
        }
    }

    #[test]
    fn test_oneof_field_numbers_match_signature_types() {
        // The oneof field number doubles as the signature type value; a
        // decoded wire message must come back through the matching variant.
        let data = SignatureData {
            signer_identity: None,
            sig_type: Some(signature_data::SigType::AesGcmResponseData(
                AesGcmResponseData {
                    nonce: vec![0; 12],
                    counter: 1,
                    tag: vec![0; 16],
                },
            )),
        };
        let encoded = data.encode_to_vec();
        // Field 9 length-delimited = key (9 << 3) | 2 = 0x4A.
        assert_eq!(encoded[0], 0x4A);
        assert_eq!(0x4A >> 3, SignatureType::AesGcmResponse as u8);
    }
}
