// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # health-thermometer-ble
//!
//! A Rust client for the Bluetooth Low Energy **Health Thermometer**
//! service (0x1809).
//!
//! The crate handles one peer connection at a time: it finds the
//! Temperature Measurement characteristic, enables indications, decodes
//! every indication into a [`TemperatureMeasurement`] and reports results
//! and failures as [`SessionEvent`]s.
//!
//! ## Layers
//!
//! - [`protocol`]: pure decoding of the Temperature Measurement payload
//!   (IEEE-11073 FLOAT, optional timestamp and body site)
//! - [`ble::binding`]: locating the characteristic and owning its handle
//! - [`session`]: the connection state machine, driven by
//!   [`TransportEvent`]s and usable without any radio
//! - [`ble::connection`]: a tokio task that runs a session over a real
//!   btleplug peripheral
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use health_thermometer_ble::{
//!     ConnectionConfig, PeripheralLink, Result, SessionEvent, ThermometerConnection,
//!     ThermometerScanner,
//! };
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scanner = ThermometerScanner::new().await?;
//!     let peripheral = scanner.find_first(Duration::from_secs(10)).await?;
//!
//!     let (connection, mut events) =
//!         ThermometerConnection::start(PeripheralLink::new(peripheral), ConnectionConfig::default());
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             SessionEvent::MeasurementReceived(m) => println!("{}", m),
//!             SessionEvent::Disconnected => break,
//!             other => println!("{:?}", other),
//!         }
//!     }
//!
//!     connection.wait().await
//! }
//! ```
//!
//! ## Driving a session by hand
//!
//! [`Session`] only needs something implementing [`GattTransport`], so it
//! can sit on top of any BLE stack that delivers events in order.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod protocol;
pub mod session;
pub mod utils;

// Re-exports for convenience
pub use ble::connection::ThermometerConnection;
pub use ble::link::{GattLink, PeripheralLink};
pub use ble::scanner::ThermometerScanner;
pub use ble::transport::{GattTransport, ServiceCatalog, TransportEvent};
pub use ble::{CharacteristicHandle, ServiceBinding};
pub use config::{ConnectionConfig, SessionConfig};
pub use data::{TemperatureMeasurement, TemperatureType, TemperatureUnit};
pub use error::{BindingError, DecodeError, Error, Result, SessionError, TransportError};
pub use session::{Session, SessionEvent, SessionListener, SessionState, TracingListener};
pub use utils::{celsius_to_fahrenheit, convert_temperature, fahrenheit_to_celsius};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that key types are exported
        let _ = std::any::TypeId::of::<ThermometerConnection>();
        let _ = std::any::TypeId::of::<Session<ble::transport::MockGattTransport>>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<TemperatureMeasurement>();
        let _ = std::any::TypeId::of::<SessionEvent>();
        let _ = std::any::TypeId::of::<ServiceBinding>();
    }

    #[test]
    fn test_decode_reexport() {
        let m = protocol::decode(&[0x00, 0x6E, 0x01, 0x00, 0xFF]).unwrap();
        assert_eq!(m.temperature, 36.6);
    }
}
