//! Builder and extractor operations over the wire schema.
//!
//! Each function here corresponds to one message shape the session layer
//! sends or receives. Builders return encoded bytes ready for framing;
//! extractors validate the fields the protocol depends on and fail with
//! [`ProtoError`] rather than propagating partially-decoded messages.

use prost::Message;

use crate::schema::carserver::{
    self, action, response, result_reason, vehicle_action, Action, GetVehicleData, Response,
    VehicleAction,
};
use crate::schema::signatures::{
    signature_data, AesGcmPersonalizedData, KeyIdentity, SessionInfo, SignatureData,
};
use crate::schema::universal::{
    routable_message, Destination, Domain, RoutableMessage, SessionInfoRequest,
};
use crate::schema::vcsec::{
    self, unsigned_message, whitelist_operation, KeyFormFactor, KeyMetadata, PermissionChange,
    SignedMessage, ToVcsecMessage, UnsignedMessage, WhitelistOperation,
};
use crate::schema::keys::Role;
use crate::types::{RequestUuid, RoutingAddress};
use crate::ProtoError;

/// Length of an uncompressed P-256 point on the wire.
pub const PUBLIC_KEY_LEN: usize = 65;

/// Maximum length of a session epoch.
pub const MAX_EPOCH_LEN: usize = 16;

/// The twelve vehicle-state categories a data fetch can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateCategory {
    Charge,
    Climate,
    Drive,
    Location,
    Closures,
    ChargeSchedule,
    PreconditioningSchedule,
    TirePressure,
    Media,
    MediaDetail,
    SoftwareUpdate,
    ParentalControls,
}

impl StateCategory {
    pub const ALL: [StateCategory; 12] = [
        StateCategory::Charge,
        StateCategory::Climate,
        StateCategory::Drive,
        StateCategory::Location,
        StateCategory::Closures,
        StateCategory::ChargeSchedule,
        StateCategory::PreconditioningSchedule,
        StateCategory::TirePressure,
        StateCategory::Media,
        StateCategory::MediaDetail,
        StateCategory::SoftwareUpdate,
        StateCategory::ParentalControls,
    ];
}

/// Build an unauthenticated session-info request for `domain`.
pub fn session_info_request(
    domain: Domain,
    public_key: &[u8],
    routing_address: &RoutingAddress,
    uuid: &RequestUuid,
) -> Vec<u8> {
    RoutableMessage {
        to_destination: Some(Destination::domain(domain)),
        from_destination: Some(Destination::routing_address(routing_address.as_ref())),
        payload: Some(routable_message::Payload::SessionInfoRequest(
            SessionInfoRequest {
                public_key: public_key.to_vec(),
                challenge: uuid.as_ref().to_vec(),
            },
        )),
        uuid: uuid.as_ref().to_vec(),
        ..Default::default()
    }
    .encode_to_vec()
}

/// Decode a routing envelope.
pub fn decode_routable(bytes: &[u8]) -> Result<RoutableMessage, ProtoError> {
    Ok(RoutableMessage::decode(bytes)?)
}

/// Decode and validate vehicle session info.
pub fn decode_session_info(bytes: &[u8]) -> Result<SessionInfo, ProtoError> {
    let info = SessionInfo::decode(bytes)?;
    if info.public_key.len() != PUBLIC_KEY_LEN {
        return Err(ProtoError::InvalidFieldLength {
            field: "session_info.public_key",
            expected: PUBLIC_KEY_LEN,
            actual: info.public_key.len(),
        });
    }
    if info.epoch.len() > MAX_EPOCH_LEN {
        return Err(ProtoError::FieldTooLong {
            field: "session_info.epoch",
            max: MAX_EPOCH_LEN,
            actual: info.epoch.len(),
        });
    }
    Ok(info)
}

/// Extract the 32-byte HMAC tag authenticating a session-info payload.
pub fn session_info_tag(message: &RoutableMessage) -> Result<[u8; 32], ProtoError> {
    let sig = message
        .signature_data
        .as_ref()
        .ok_or(ProtoError::MissingField("signature_data"))?;
    let tag = match sig.sig_type {
        Some(signature_data::SigType::SessionInfoTag(ref tag)) => &tag.tag,
        _ => return Err(ProtoError::MissingField("signature_data.session_info_tag")),
    };
    tag.as_slice()
        .try_into()
        .map_err(|_| ProtoError::InvalidFieldLength {
            field: "session_info_tag.tag",
            expected: 32,
            actual: tag.len(),
        })
}

/// Fields of an encrypted command envelope.
pub struct EncryptedCommand<'a> {
    pub domain: Domain,
    pub routing_address: &'a RoutingAddress,
    pub uuid: &'a RequestUuid,
    /// AES-GCM ciphertext without the tag.
    pub ciphertext: Vec<u8>,
    pub flags: u32,
    pub signer_public_key: &'a [u8],
    pub epoch: &'a [u8],
    pub nonce: [u8; 12],
    pub counter: u32,
    pub expires_at: u32,
    pub tag: [u8; 16],
}

/// Build an AES-GCM-personalized command envelope.
pub fn encrypted_command(cmd: EncryptedCommand<'_>) -> Vec<u8> {
    RoutableMessage {
        to_destination: Some(Destination::domain(cmd.domain)),
        from_destination: Some(Destination::routing_address(cmd.routing_address.as_ref())),
        payload: Some(routable_message::Payload::ProtobufMessageAsBytes(
            cmd.ciphertext,
        )),
        signature_data: Some(SignatureData {
            signer_identity: Some(KeyIdentity::from_public_key(cmd.signer_public_key)),
            sig_type: Some(signature_data::SigType::AesGcmPersonalizedData(
                AesGcmPersonalizedData {
                    epoch: cmd.epoch.to_vec(),
                    nonce: cmd.nonce.to_vec(),
                    counter: cmd.counter,
                    expires_at: cmd.expires_at,
                    tag: cmd.tag.to_vec(),
                },
            )),
        }),
        uuid: cmd.uuid.as_ref().to_vec(),
        flags: cmd.flags,
        ..Default::default()
    }
    .encode_to_vec()
}

/// Build an unauthenticated envelope carrying opaque payload bytes.
///
/// Used for the security-domain enrollment flow, where authorization happens
/// physically on the vehicle rather than cryptographically.
pub fn unsigned_command(
    domain: Domain,
    routing_address: &RoutingAddress,
    uuid: &RequestUuid,
    payload: Vec<u8>,
) -> Vec<u8> {
    RoutableMessage {
        to_destination: Some(Destination::domain(domain)),
        from_destination: Some(Destination::routing_address(routing_address.as_ref())),
        payload: Some(routable_message::Payload::ProtobufMessageAsBytes(payload)),
        uuid: uuid.as_ref().to_vec(),
        ..Default::default()
    }
    .encode_to_vec()
}

/// Build the plaintext data-fetch action for one state category.
pub fn get_vehicle_data(category: StateCategory) -> Vec<u8> {
    let mut data = GetVehicleData::default();
    match category {
        StateCategory::Charge => data.get_charge_state = Some(carserver::GetChargeState {}),
        StateCategory::Climate => data.get_climate_state = Some(carserver::GetClimateState {}),
        StateCategory::Drive => data.get_drive_state = Some(carserver::GetDriveState {}),
        StateCategory::Location => data.get_location_state = Some(carserver::GetLocationState {}),
        StateCategory::Closures => data.get_closures_state = Some(carserver::GetClosuresState {}),
        StateCategory::ChargeSchedule => {
            data.get_charge_schedule_state = Some(carserver::GetChargeScheduleState {});
        }
        StateCategory::PreconditioningSchedule => {
            data.get_preconditioning_schedule_state =
                Some(carserver::GetPreconditioningScheduleState {});
        }
        StateCategory::TirePressure => {
            data.get_tire_pressure_state = Some(carserver::GetTirePressureState {});
        }
        StateCategory::Media => data.get_media_state = Some(carserver::GetMediaState {}),
        StateCategory::MediaDetail => {
            data.get_media_detail_state = Some(carserver::GetMediaDetailState {});
        }
        StateCategory::SoftwareUpdate => {
            data.get_software_update_state = Some(carserver::GetSoftwareUpdateState {});
        }
        StateCategory::ParentalControls => {
            data.get_parental_controls_state = Some(carserver::GetParentalControlsState {});
        }
    }
    Action {
        action_msg: Some(action::ActionMsg::VehicleAction(VehicleAction {
            vehicle_action_msg: Some(vehicle_action::VehicleActionMsg::GetVehicleData(data)),
        })),
    }
    .encode_to_vec()
}

/// Decode an infotainment response.
pub fn decode_carserver_response(bytes: &[u8]) -> Result<Response, ProtoError> {
    Ok(Response::decode(bytes)?)
}

/// The vehicle-reported failure reason, if the response carries one.
///
/// `action_status.result == 1` denotes an error; the reason text falls back
/// to a fixed string when the vehicle omits it.
pub fn response_error(response: &Response) -> Option<String> {
    let status = response.action_status.as_ref()?;
    if status.result != carserver::OperationStatus::Error as i32 {
        return None;
    }
    let reason = status
        .result_reason
        .as_ref()
        .and_then(|reason| match reason.reason {
            Some(result_reason::Reason::PlainText(ref text)) => Some(text.clone()),
            None => None,
        })
        .unwrap_or_else(|| "unspecified vehicle error".to_string());
    Some(reason)
}

/// The decoded vehicle data, if the response carries any.
pub fn response_vehicle_data(response: &Response) -> Option<&carserver::VehicleData> {
    match response.response_msg {
        Some(response::ResponseMsg::VehicleData(ref data)) => Some(data),
        _ => None,
    }
}

/// Build the key-enrollment envelope.
///
/// The envelope carries `signatureType = PRESENT_KEY` and no cryptographic
/// signature; the vehicle accepts it only while awaiting an NFC-tap approval.
pub fn add_key_request(
    public_key_raw: &[u8],
    role: Role,
    form_factor: KeyFormFactor,
) -> Result<Vec<u8>, ProtoError> {
    if public_key_raw.len() != PUBLIC_KEY_LEN {
        return Err(ProtoError::InvalidFieldLength {
            field: "public_key_raw",
            expected: PUBLIC_KEY_LEN,
            actual: public_key_raw.len(),
        });
    }
    let unsigned = UnsignedMessage {
        sub_message: Some(unsigned_message::SubMessage::WhitelistOperation(
            WhitelistOperation {
                sub_message: Some(
                    whitelist_operation::SubMessage::AddKeyToWhitelistAndAddPermissions(
                        PermissionChange {
                            key: Some(vcsec::PublicKey {
                                public_key_raw: public_key_raw.to_vec(),
                            }),
                            seconds_to_be_active: 0,
                            key_role: role as i32,
                        },
                    ),
                ),
                metadata_for_key: Some(KeyMetadata {
                    key_form_factor: form_factor as i32,
                }),
            },
        )),
    };
    Ok(ToVcsecMessage {
        signed_message: Some(SignedMessage {
            protobuf_message_as_bytes: unsigned.encode_to_vec(),
            signature_type: vcsec::SignatureType::PresentKey as i32,
        }),
    }
    .encode_to_vec())
}
