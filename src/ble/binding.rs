//! Health Thermometer service binding.
//!
//! Locates the Temperature Measurement characteristic in a discovered
//! service catalog and owns the reference to it for one connection.

use tracing::debug;
use uuid::Uuid;

use crate::ble::transport::{GattTransport, ServiceCatalog};
use crate::ble::uuids::{ServiceDescriptor, HEALTH_THERMOMETER};
use crate::error::BindingError;

/// Reference to a discovered characteristic.
///
/// Only a [`ServiceBinding`] creates these, and it cannot be cloned, so the
/// binding stays the sole owner. Transports receive it by reference.
#[derive(Debug, PartialEq, Eq)]
pub struct CharacteristicHandle {
    service: Uuid,
    characteristic: Uuid,
}

impl CharacteristicHandle {
    pub(crate) fn new(service: Uuid, characteristic: Uuid) -> Self {
        Self {
            service,
            characteristic,
        }
    }

    /// UUID of the service containing the characteristic.
    pub fn service_uuid(&self) -> Uuid {
        self.service
    }

    /// UUID of the characteristic.
    pub fn uuid(&self) -> Uuid {
        self.characteristic
    }
}

/// Binds one connection to the Health Thermometer service.
#[derive(Debug)]
pub struct ServiceBinding {
    descriptor: ServiceDescriptor,
    handle: Option<CharacteristicHandle>,
}

impl Default for ServiceBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBinding {
    /// Create an unbound binding for the Health Thermometer service.
    pub fn new() -> Self {
        Self::with_descriptor(HEALTH_THERMOMETER)
    }

    /// Create an unbound binding for another service/characteristic pair.
    pub fn with_descriptor(descriptor: ServiceDescriptor) -> Self {
        Self {
            descriptor,
            handle: None,
        }
    }

    /// The service/characteristic pair this binding looks for.
    pub fn descriptor(&self) -> ServiceDescriptor {
        self.descriptor
    }

    /// The bound characteristic, if any.
    pub fn handle(&self) -> Option<&CharacteristicHandle> {
        self.handle.as_ref()
    }

    /// Check if a characteristic is bound.
    pub fn is_bound(&self) -> bool {
        self.handle.is_some()
    }

    /// Find the characteristic in `catalog` and bind it.
    pub fn discover(
        &mut self,
        catalog: &ServiceCatalog,
    ) -> Result<&CharacteristicHandle, BindingError> {
        let ServiceDescriptor {
            service,
            characteristic,
        } = self.descriptor;

        let characteristics = catalog.characteristics(&service).ok_or_else(|| {
            debug!("Service {} not among {} discovered", service, catalog.len());
            BindingError::ServiceMissing
        })?;

        if !characteristics.contains(&characteristic) {
            debug!(
                "Characteristic {} not found in service {}",
                characteristic, service
            );
            return Err(BindingError::CharacteristicMissing);
        }

        debug!("Bound characteristic {} in service {}", characteristic, service);

        Ok(&*self
            .handle
            .insert(CharacteristicHandle::new(service, characteristic)))
    }

    /// Request indications on the bound characteristic.
    pub fn subscribe<T>(&self, transport: &mut T) -> Result<(), BindingError>
    where
        T: GattTransport + ?Sized,
    {
        let handle = self.handle.as_ref().ok_or(BindingError::NotBound)?;
        transport.enable_indications(handle)?;
        debug!("Requested indications from {}", handle.uuid());
        Ok(())
    }

    /// Request that indications on the bound characteristic stop.
    pub fn unsubscribe<T>(&self, transport: &mut T) -> Result<(), BindingError>
    where
        T: GattTransport + ?Sized,
    {
        let handle = self.handle.as_ref().ok_or(BindingError::NotBound)?;
        transport.disable_indications(handle)?;
        debug!("Requested indications stop from {}", handle.uuid());
        Ok(())
    }

    /// Drop the bound characteristic. Safe to call repeatedly.
    pub fn invalidate(&mut self) {
        if self.handle.take().is_some() {
            debug!("Characteristic handle invalidated");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::transport::MockGattTransport;
    use crate::ble::uuids::*;
    use crate::error::TransportError;

    fn thermometer_catalog() -> ServiceCatalog {
        ServiceCatalog::new()
            .with_service(HEALTH_THERMOMETER_SERVICE_UUID, [TEMPERATURE_MEASUREMENT_UUID])
    }

    #[test]
    fn test_discover_binds_characteristic() {
        let mut binding = ServiceBinding::new();
        let handle = binding.discover(&thermometer_catalog()).unwrap();
        assert_eq!(handle.uuid(), TEMPERATURE_MEASUREMENT_UUID);
        assert_eq!(handle.service_uuid(), HEALTH_THERMOMETER_SERVICE_UUID);
        assert!(binding.is_bound());
    }

    #[test]
    fn test_discover_service_missing() {
        let mut binding = ServiceBinding::new();
        let battery = Uuid::from_u128(0x0000_180f_0000_1000_8000_00805f9b34fb);
        let catalog = ServiceCatalog::new().with_service(battery, []);
        assert_eq!(
            binding.discover(&catalog).unwrap_err(),
            BindingError::ServiceMissing
        );
        assert!(!binding.is_bound());
    }

    #[test]
    fn test_discover_characteristic_missing() {
        let mut binding = ServiceBinding::new();
        let catalog = ServiceCatalog::new().with_service(HEALTH_THERMOMETER_SERVICE_UUID, []);
        assert_eq!(
            binding.discover(&catalog).unwrap_err(),
            BindingError::CharacteristicMissing
        );
        assert!(binding.handle().is_none());
    }

    #[test]
    fn test_subscribe_requests_indications() {
        let mut binding = ServiceBinding::new();
        binding.discover(&thermometer_catalog()).unwrap();

        let mut transport = MockGattTransport::new();
        transport
            .expect_enable_indications()
            .withf(|handle| handle.uuid() == TEMPERATURE_MEASUREMENT_UUID)
            .times(1)
            .returning(|_| Ok(()));

        binding.subscribe(&mut transport).unwrap();
    }

    #[test]
    fn test_subscribe_unbound() {
        let binding = ServiceBinding::new();
        let mut transport = MockGattTransport::new();
        transport.expect_enable_indications().never();

        assert_eq!(
            binding.subscribe(&mut transport).unwrap_err(),
            BindingError::NotBound
        );
    }

    #[test]
    fn test_subscribe_transport_rejects() {
        let mut binding = ServiceBinding::new();
        binding.discover(&thermometer_catalog()).unwrap();

        let mut transport = MockGattTransport::new();
        transport
            .expect_enable_indications()
            .returning(|_| Err(TransportError::new("busy")));

        assert_eq!(
            binding.subscribe(&mut transport).unwrap_err(),
            BindingError::Transport(TransportError::new("busy"))
        );
    }

    #[test]
    fn test_unsubscribe() {
        let mut binding = ServiceBinding::new();
        binding.discover(&thermometer_catalog()).unwrap();

        let mut transport = MockGattTransport::new();
        transport
            .expect_disable_indications()
            .times(1)
            .returning(|_| Ok(()));

        binding.unsubscribe(&mut transport).unwrap();
    }

    #[test]
    fn test_invalidate_is_idempotent() {
        let mut binding = ServiceBinding::new();
        binding.discover(&thermometer_catalog()).unwrap();

        binding.invalidate();
        assert!(!binding.is_bound());
        binding.invalidate();
        assert!(!binding.is_bound());
    }
}
