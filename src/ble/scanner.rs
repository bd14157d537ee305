//! BLE scanning functionality.
//!
//! Finds peripherals advertising the Health Thermometer service.

use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::stream::StreamExt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::ble::uuids::HEALTH_THERMOMETER_SERVICE_UUID;
use crate::error::{Error, Result};

/// BLE scanner for Health Thermometer peripherals.
pub struct ThermometerScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
}

impl ThermometerScanner {
    /// Create a scanner on the first Bluetooth adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new()
            .await
            .map_err(|_e| Error::BluetoothUnavailable)?;

        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::BluetoothUnavailable)?;

        info!(
            "Using Bluetooth adapter: {:?}",
            adapter.adapter_info().await.ok()
        );

        Ok(Self { adapter })
    }

    /// Create a scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Scan until a peripheral advertising the Health Thermometer service
    /// shows up, or `timeout` passes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ThermometerNotFound`] on timeout.
    pub async fn find_first(&self, timeout: Duration) -> Result<Peripheral> {
        let mut events = self.adapter.events().await?;

        info!("Scanning for health thermometers");
        self.adapter
            .start_scan(ScanFilter {
                services: vec![HEALTH_THERMOMETER_SERVICE_UUID],
            })
            .await?;

        let search = async {
            while let Some(event) = events.next().await {
                let id = match event {
                    CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => id,
                    CentralEvent::ServicesAdvertisement { id, services }
                        if services.contains(&HEALTH_THERMOMETER_SERVICE_UUID) =>
                    {
                        id
                    }
                    _ => continue,
                };

                match self.thermometer(&id).await {
                    Ok(Some(peripheral)) => return Ok(peripheral),
                    Ok(None) => {}
                    Err(e) => debug!("Skipping {:?}: {}", id, e),
                }
            }
            Err(Error::ThermometerNotFound)
        };

        let result = tokio::time::timeout(timeout, search)
            .await
            .unwrap_or(Err(Error::ThermometerNotFound));

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        result
    }

    /// The peripheral behind `id`, if it advertises the thermometer service.
    async fn thermometer(&self, id: &PeripheralId) -> Result<Option<Peripheral>> {
        let peripheral = self.adapter.peripheral(id).await?;
        let advertises = peripheral
            .properties()
            .await?
            .map(|p| p.services.contains(&HEALTH_THERMOMETER_SERVICE_UUID))
            .unwrap_or(false);

        if advertises {
            debug!("Found health thermometer {:?}", id);
            Ok(Some(peripheral))
        } else {
            Ok(None)
        }
    }
}

impl std::fmt::Debug for ThermometerScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThermometerScanner").finish_non_exhaustive()
    }
}
