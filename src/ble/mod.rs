//! BLE communication module.
//!
//! This module provides the GATT plumbing between a Health Thermometer
//! peripheral and a [`Session`](crate::session::Session).

pub mod binding;
pub mod connection;
pub mod link;
pub mod scanner;
pub mod transport;
pub mod uuids;

pub use binding::{CharacteristicHandle, ServiceBinding};
pub use connection::ThermometerConnection;
pub use link::{GattLink, Notification, NotificationStream, PeripheralLink};
pub use scanner::ThermometerScanner;
pub use transport::{GattTransport, RawIndication, ServiceCatalog, TransportEvent};
pub use uuids::*;
