//! Routing envelope: `RoutableMessage` and its addressing types.

use super::signatures;

/// Vehicle subsystem terminating a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Domain {
    Broadcast = 0,
    VehicleSecurity = 2,
    Infotainment = 3,
}

/// Routable message flag: ask the vehicle to encrypt its response.
pub const FLAG_ENCRYPT_RESPONSE: u32 = 1 << 1;

/// Outcome of processing a signed message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OperationStatus {
    Ok = 0,
    Wait = 1,
    Error = 2,
}

/// Fault codes reported in `MessageStatus.signed_message_fault`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum MessageFault {
    None = 0,
    Busy = 1,
    Timeout = 2,
    UnknownKeyId = 3,
    InactiveKey = 4,
    InvalidSignature = 5,
    InvalidTokenOrCounter = 6,
    InsufficientPrivileges = 7,
    InvalidDomains = 8,
    InvalidCommand = 9,
    Decoding = 10,
    Internal = 11,
    WrongPersonalization = 12,
    BadParameter = 13,
    KeychainIsFull = 14,
    IncorrectEpoch = 15,
    IvIncorrectLength = 16,
    TimeExpired = 17,
    NotProvisionedWithIdentity = 18,
    CouldNotHashMetadata = 19,
    TimeToLiveTooLong = 20,
    RemoteAccessDisabled = 21,
    RemoteServiceAccessDisabled = 22,
    CommandRequiresAccountCredentials = 23,
}

/// Either a domain selector or a 16-byte client routing address.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Destination {
    #[prost(oneof = "destination::SubDestination", tags = "1, 2")]
    pub sub_destination: Option<destination::SubDestination>,
}

pub mod destination {
    use super::Domain;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum SubDestination {
        #[prost(enumeration = "Domain", tag = "1")]
        Domain(i32),
        #[prost(bytes = "vec", tag = "2")]
        RoutingAddress(Vec<u8>),
    }
}

impl Destination {
    /// Destination addressing a vehicle domain.
    pub fn domain(domain: Domain) -> Self {
        Self {
            sub_destination: Some(destination::SubDestination::Domain(domain as i32)),
        }
    }

    /// Destination addressing a client routing address.
    pub fn routing_address(address: &[u8]) -> Self {
        Self {
            sub_destination: Some(destination::SubDestination::RoutingAddress(
                address.to_vec(),
            )),
        }
    }

    /// The domain selector, if this destination carries one.
    pub fn as_domain(&self) -> Option<Domain> {
        match self.sub_destination {
            Some(destination::SubDestination::Domain(raw)) => Domain::try_from(raw).ok(),
            _ => None,
        }
    }
}

/// Processing status attached to responses.
#[derive(Clone, PartialEq, prost::Message)]
pub struct MessageStatus {
    #[prost(enumeration = "OperationStatus", tag = "1")]
    pub operation_status: i32,
    #[prost(enumeration = "MessageFault", tag = "2")]
    pub signed_message_fault: i32,
}

/// Request for the vehicle's session context for one domain.
#[derive(Clone, PartialEq, prost::Message)]
pub struct SessionInfoRequest {
    #[prost(bytes = "vec", tag = "1")]
    pub public_key: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub challenge: Vec<u8>,
}

/// The routing envelope carried on every framed BLE message.
#[derive(Clone, PartialEq, prost::Message)]
pub struct RoutableMessage {
    #[prost(message, optional, tag = "6")]
    pub to_destination: Option<Destination>,
    #[prost(message, optional, tag = "7")]
    pub from_destination: Option<Destination>,
    #[prost(oneof = "routable_message::Payload", tags = "10, 14, 15")]
    pub payload: Option<routable_message::Payload>,
    #[prost(message, optional, tag = "12")]
    pub signed_message_status: Option<MessageStatus>,
    #[prost(message, optional, tag = "13")]
    pub signature_data: Option<signatures::SignatureData>,
    /// UUID of the request this message responds to.
    #[prost(bytes = "vec", tag = "50")]
    pub request_uuid: Vec<u8>,
    #[prost(bytes = "vec", tag = "51")]
    pub uuid: Vec<u8>,
    #[prost(uint32, tag = "52")]
    pub flags: u32,
}

pub mod routable_message {
    use super::SessionInfoRequest;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Payload {
        /// Opaque payload bytes, possibly ciphertext.
        #[prost(bytes = "vec", tag = "10")]
        ProtobufMessageAsBytes(Vec<u8>),
        #[prost(message, tag = "14")]
        SessionInfoRequest(SessionInfoRequest),
        /// Encoded `signatures::SessionInfo`, kept opaque because the HMAC
        /// covers the exact bytes as transmitted.
        #[prost(bytes = "vec", tag = "15")]
        SessionInfo(Vec<u8>),
    }
}

impl RoutableMessage {
    /// The fault code from `signed_message_status`, `None` fault when absent.
    pub fn fault(&self) -> u32 {
        self.signed_message_status
            .as_ref()
            .map(|status| status.signed_message_fault as u32)
            .unwrap_or(0)
    }
}
