//! Error types for the health-thermometer-ble crate.

use thiserror::Error;

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// No peripheral advertising the Health Thermometer service was found.
    #[error("No health thermometer found")]
    ThermometerNotFound,

    /// Operation requires a connection but the peripheral is not connected.
    #[error("Peripheral not connected")]
    NotConnected,

    /// An operation did not complete in time.
    #[error("Timed out waiting for {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
    },

    /// The session is not in a state that allows the operation.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The session state at the time.
        state: String,
    },

    /// A measurement payload could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The peripheral does not expose the expected GATT profile.
    #[error(transparent)]
    Binding(#[from] BindingError),

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to decode a single Temperature Measurement indication.
///
/// Decode errors only ever affect the packet they were raised for.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The buffer is shorter than the length implied by its flags byte.
    #[error("Measurement too short: {actual} bytes (need {required})")]
    TooShort {
        /// Bytes required by the flags.
        required: usize,
        /// Bytes actually received.
        actual: usize,
    },

    /// The embedded date/time is outside valid calendar ranges.
    #[error("Invalid timestamp: {year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}")]
    InvalidTimestamp {
        /// Year field.
        year: u16,
        /// Month field.
        month: u8,
        /// Day field.
        day: u8,
        /// Hours field.
        hour: u8,
        /// Minutes field.
        minute: u8,
        /// Seconds field.
        second: u8,
    },

    /// The flags byte carries reserved bits, so the unit cannot be trusted.
    #[error("Invalid flags byte {flags:#04x}")]
    InvalidUnit {
        /// The raw flags byte.
        flags: u8,
    },
}

/// The peripheral does not implement the Health Thermometer profile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The Health Thermometer service was not discovered.
    #[error("Health Thermometer service not found")]
    ServiceMissing,

    /// The service exists but has no Temperature Measurement characteristic.
    #[error("Temperature Measurement characteristic not found")]
    CharacteristicMissing,

    /// No characteristic is bound (not discovered yet, or invalidated).
    #[error("No characteristic bound")]
    NotBound,

    /// The transport refused the request.
    #[error("Transport rejected request: {0}")]
    Transport(#[from] TransportError),
}

/// A request could not be handed to the transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct TransportError {
    /// Description of the failure.
    pub reason: String,
}

impl TransportError {
    /// Create a transport error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Error kinds reported to session consumers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The peer lacks the required service or characteristic. Fatal.
    #[error("Unsupported device: {0}")]
    UnsupportedDevice(BindingError),

    /// Enabling indications failed. The session stays ready for a retry.
    #[error("Subscription failed: {reason}")]
    SubscriptionFailed {
        /// Description of the failure.
        reason: String,
    },

    /// A single indication could not be decoded. The session continues.
    #[error("Malformed payload: {0}")]
    MalformedPayload(DecodeError),

    /// The link reported an error. Fatal.
    #[error("Transport error: {reason}")]
    Transport {
        /// Description of the failure.
        reason: String,
    },
}

impl SessionError {
    /// Whether this error ends the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedDevice(_) | Self::Transport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_error_fatality() {
        assert!(SessionError::UnsupportedDevice(BindingError::ServiceMissing).is_fatal());
        assert!(SessionError::Transport {
            reason: "gatt 133".to_string()
        }
        .is_fatal());
        assert!(!SessionError::MalformedPayload(DecodeError::TooShort {
            required: 5,
            actual: 1
        })
        .is_fatal());
        assert!(!SessionError::SubscriptionFailed {
            reason: "refused".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err = DecodeError::TooShort {
            required: 12,
            actual: 5,
        };
        assert_eq!(err.to_string(), "Measurement too short: 5 bytes (need 12)");

        let err: Error = BindingError::CharacteristicMissing.into();
        assert_eq!(
            err.to_string(),
            "Temperature Measurement characteristic not found"
        );
    }
}
