//! Async link to a BLE peripheral.
//!
//! [`GattLink`] is the async surface a [`ThermometerConnection`] drives;
//! [`PeripheralLink`] implements it on top of btleplug.
//!
//! [`ThermometerConnection`]: crate::ble::connection::ThermometerConnection

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::Peripheral;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::ble::transport::ServiceCatalog;
use crate::error::{BindingError, Error, Result};

/// A value pushed by the peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// UUID of the characteristic that sent the value.
    pub characteristic: Uuid,
    /// The value.
    pub value: Bytes,
}

/// Stream of notifications and indications from one peripheral.
pub type NotificationStream = BoxStream<'static, Notification>;

/// Async operations on one peripheral.
#[async_trait]
pub trait GattLink: Send + Sync + 'static {
    /// Identifier used in log lines.
    fn identifier(&self) -> String;

    /// Bring the link up.
    async fn connect(&self) -> Result<()>;

    /// Check whether the link is still up.
    async fn is_connected(&self) -> Result<bool>;

    /// Run service discovery and return what was found.
    async fn discover_services(&self) -> Result<ServiceCatalog>;

    /// Stream of incoming values. Ends when the link goes down.
    async fn notifications(&self) -> Result<NotificationStream>;

    /// Enable notifications/indications on a characteristic.
    async fn subscribe(&self, service: Uuid, characteristic: Uuid) -> Result<()>;

    /// Disable notifications/indications on a characteristic.
    async fn unsubscribe(&self, service: Uuid, characteristic: Uuid) -> Result<()>;

    /// Drop the link.
    async fn disconnect(&self) -> Result<()>;
}

/// [`GattLink`] over a btleplug peripheral.
#[derive(Debug, Clone)]
pub struct PeripheralLink {
    peripheral: Peripheral,
}

impl PeripheralLink {
    /// Wrap a peripheral.
    pub fn new(peripheral: Peripheral) -> Self {
        Self { peripheral }
    }

    /// Get the peripheral.
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    fn find_characteristic(&self, service: Uuid, characteristic: Uuid) -> Result<Characteristic> {
        self.peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.service_uuid == service && c.uuid == characteristic)
            .ok_or(Error::Binding(BindingError::CharacteristicMissing))
    }
}

#[async_trait]
impl GattLink for PeripheralLink {
    fn identifier(&self) -> String {
        format!("{:?}", self.peripheral.id())
    }

    async fn connect(&self) -> Result<()> {
        if self.peripheral.is_connected().await.unwrap_or(false) {
            debug!("Peripheral already connected at BLE level");
            return Ok(());
        }
        self.peripheral.connect().await?;
        Ok(())
    }

    async fn is_connected(&self) -> Result<bool> {
        Ok(self.peripheral.is_connected().await?)
    }

    async fn discover_services(&self) -> Result<ServiceCatalog> {
        self.peripheral.discover_services().await?;

        let services = self.peripheral.services();
        for service in &services {
            for characteristic in &service.characteristics {
                trace!(
                    "Found characteristic: {} in service {}",
                    characteristic.uuid,
                    service.uuid
                );
            }
        }
        debug!("Discovered {} services", services.len());

        Ok(ServiceCatalog::from(&services))
    }

    async fn notifications(&self) -> Result<NotificationStream> {
        let stream = self.peripheral.notifications().await?;
        Ok(stream
            .map(|n| Notification {
                characteristic: n.uuid,
                value: Bytes::from(n.value),
            })
            .boxed())
    }

    async fn subscribe(&self, service: Uuid, characteristic: Uuid) -> Result<()> {
        let characteristic = self.find_characteristic(service, characteristic)?;
        debug!(
            "Subscribing to {}, properties: {:?}",
            characteristic.uuid, characteristic.properties
        );
        self.peripheral.subscribe(&characteristic).await?;
        Ok(())
    }

    async fn unsubscribe(&self, service: Uuid, characteristic: Uuid) -> Result<()> {
        let characteristic = self.find_characteristic(service, characteristic)?;
        self.peripheral.unsubscribe(&characteristic).await?;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await?;
        Ok(())
    }
}
