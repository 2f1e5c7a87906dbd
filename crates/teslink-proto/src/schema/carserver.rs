//! Infotainment command surface: `Action`, `GetVehicleData`, `Response`.
//!
//! Only the data-fetch subset of the command grammar is declared; the
//! vehicle-state sub-messages inside [`VehicleData`] are kept as raw encoded
//! bytes (wire-identical to nested messages) since their schemas are large
//! and consumers decode only the categories they care about.

/// Result of an infotainment action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum OperationStatus {
    Ok = 0,
    Error = 1,
}

/// Top-level infotainment request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Action {
    #[prost(oneof = "action::ActionMsg", tags = "2")]
    pub action_msg: Option<action::ActionMsg>,
}

pub mod action {
    use super::VehicleAction;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum ActionMsg {
        #[prost(message, tag = "2")]
        VehicleAction(VehicleAction),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct VehicleAction {
    #[prost(oneof = "vehicle_action::VehicleActionMsg", tags = "1")]
    pub vehicle_action_msg: Option<vehicle_action::VehicleActionMsg>,
}

pub mod vehicle_action {
    use super::GetVehicleData;

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum VehicleActionMsg {
        #[prost(message, tag = "1")]
        GetVehicleData(GetVehicleData),
    }
}

macro_rules! empty_marker_messages {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Clone, PartialEq, prost::Message)]
            pub struct $name {}
        )*
    };
}

empty_marker_messages!(
    GetChargeState,
    GetClimateState,
    GetDriveState,
    GetLocationState,
    GetClosuresState,
    GetChargeScheduleState,
    GetPreconditioningScheduleState,
    GetTirePressureState,
    GetMediaState,
    GetMediaDetailState,
    GetSoftwareUpdateState,
    GetParentalControlsState,
);

/// State-fetch selector: exactly one marker is set per request.
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetVehicleData {
    #[prost(message, optional, tag = "1")]
    pub get_charge_state: Option<GetChargeState>,
    #[prost(message, optional, tag = "2")]
    pub get_climate_state: Option<GetClimateState>,
    #[prost(message, optional, tag = "3")]
    pub get_drive_state: Option<GetDriveState>,
    #[prost(message, optional, tag = "7")]
    pub get_location_state: Option<GetLocationState>,
    #[prost(message, optional, tag = "8")]
    pub get_closures_state: Option<GetClosuresState>,
    #[prost(message, optional, tag = "10")]
    pub get_charge_schedule_state: Option<GetChargeScheduleState>,
    #[prost(message, optional, tag = "11")]
    pub get_preconditioning_schedule_state: Option<GetPreconditioningScheduleState>,
    #[prost(message, optional, tag = "14")]
    pub get_tire_pressure_state: Option<GetTirePressureState>,
    #[prost(message, optional, tag = "15")]
    pub get_media_state: Option<GetMediaState>,
    #[prost(message, optional, tag = "16")]
    pub get_media_detail_state: Option<GetMediaDetailState>,
    #[prost(message, optional, tag = "17")]
    pub get_software_update_state: Option<GetSoftwareUpdateState>,
    #[prost(message, optional, tag = "19")]
    pub get_parental_controls_state: Option<GetParentalControlsState>,
}

/// Human-readable failure reason.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResultReason {
    #[prost(oneof = "result_reason::Reason", tags = "1")]
    pub reason: Option<result_reason::Reason>,
}

pub mod result_reason {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Reason {
        #[prost(string, tag = "1")]
        PlainText(String),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ActionStatus {
    #[prost(enumeration = "OperationStatus", tag = "1")]
    pub result: i32,
    #[prost(message, optional, tag = "2")]
    pub result_reason: Option<ResultReason>,
}

/// Vehicle state payloads, one per category, kept as raw encoded bytes.
#[derive(Clone, PartialEq, prost::Message)]
pub struct VehicleData {
    #[prost(bytes = "vec", optional, tag = "3")]
    pub charge_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "4")]
    pub climate_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub drive_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub location_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "7")]
    pub closures_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "8")]
    pub charge_schedule_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "9")]
    pub preconditioning_schedule_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "10")]
    pub tire_pressure_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "11")]
    pub media_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "12")]
    pub media_detail_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "13")]
    pub software_update_state: Option<Vec<u8>>,
    #[prost(bytes = "vec", optional, tag = "14")]
    pub parental_controls_state: Option<Vec<u8>>,
}

/// Infotainment response envelope.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Response {
    #[prost(message, optional, tag = "1")]
    pub action_status: Option<ActionStatus>,
    #[prost(oneof = "response::ResponseMsg", tags = "2, 9")]
    pub response_msg: Option<response::ResponseMsg>,
}

pub mod response {
    use super::{Ping, VehicleData};

    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum ResponseMsg {
        #[prost(message, tag = "2")]
        VehicleData(VehicleData),
        #[prost(message, tag = "9")]
        Ping(Ping),
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Ping {
    #[prost(int32, tag = "1")]
    pub ping_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_action_roundtrip() {
        let action = Action {
            action_msg: Some(action::ActionMsg::VehicleAction(VehicleAction {
                vehicle_action_msg: Some(vehicle_action::VehicleActionMsg::GetVehicleData(
                    GetVehicleData {
                        get_drive_state: Some(GetDriveState {}),
                        ..Default::default()
                    },
                )),
            })),
        };
        let decoded = Action::decode(action.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, action);
    }

    #[test]
    fn test_error_response_roundtrip() {
        let response = Response {
            action_status: Some(ActionStatus {
                result: OperationStatus::Error as i32,
                result_reason: Some(ResultReason {
                    reason: Some(result_reason::Reason::PlainText(
                        "key not paired".to_string(),
                    )),
                }),
            }),
            response_msg: None,
        };
        let decoded = Response::decode(response.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_vehicle_data_raw_state_bytes_survive() {
        let response = Response {
            action_status: Some(ActionStatus::default()),
            response_msg: Some(response::ResponseMsg::VehicleData(VehicleData {
                drive_state: Some(vec![0x08, 0x2A]),
                ..Default::default()
            })),
        };
        let decoded = Response::decode(response.encode_to_vec().as_slice()).unwrap();
        assert_eq!(decoded, response);
    }
}
