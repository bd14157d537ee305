//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants of the Health Thermometer profile.

use uuid::Uuid;

/// Health Thermometer Service UUID (0x1809).
pub const HEALTH_THERMOMETER_SERVICE_UUID: Uuid =
    Uuid::from_u128(0x0000_1809_0000_1000_8000_00805f9b34fb);
/// Temperature Measurement characteristic UUID (0x2A1C, Indicate).
pub const TEMPERATURE_MEASUREMENT_UUID: Uuid =
    Uuid::from_u128(0x0000_2a1c_0000_1000_8000_00805f9b34fb);

/// A service together with the characteristic a client needs from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceDescriptor {
    /// Service UUID.
    pub service: Uuid,
    /// Characteristic UUID within `service`.
    pub characteristic: Uuid,
}

/// The Health Thermometer service and its Temperature Measurement characteristic.
pub const HEALTH_THERMOMETER: ServiceDescriptor = ServiceDescriptor {
    service: HEALTH_THERMOMETER_SERVICE_UUID,
    characteristic: TEMPERATURE_MEASUREMENT_UUID,
};

/// Check if a service UUID is the Health Thermometer service.
pub fn is_health_thermometer_service(uuid: &Uuid) -> bool {
    *uuid == HEALTH_THERMOMETER_SERVICE_UUID
}
