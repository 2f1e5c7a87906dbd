//! Key roles shared between the security domain and the command surface.

/// Privilege level requested for an enrolled key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Role {
    None = 0,
    Service = 1,
    Owner = 2,
    Driver = 3,
    FleetManager = 4,
    VehicleMonitor = 5,
    ChargingManager = 6,
}
