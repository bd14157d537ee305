//! Transport-facing types.
//!
//! The transport owns the radio link. This crate only consumes its events
//! and hands it requests; it never waits for a request to complete.

use btleplug::api::Service;
use bytes::Bytes;
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

use crate::ble::binding::CharacteristicHandle;
use crate::error::TransportError;

/// Bytes delivered for one indication.
pub type RawIndication = Bytes;

/// Services and their characteristics, as discovered on a peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceCatalog {
    services: HashMap<Uuid, Vec<Uuid>>,
}

impl ServiceCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service with its characteristics.
    pub fn with_service(
        mut self,
        service: Uuid,
        characteristics: impl IntoIterator<Item = Uuid>,
    ) -> Self {
        self.insert_service(service, characteristics);
        self
    }

    /// Add a service with its characteristics, merging with any already known.
    pub fn insert_service(
        &mut self,
        service: Uuid,
        characteristics: impl IntoIterator<Item = Uuid>,
    ) {
        self.services
            .entry(service)
            .or_default()
            .extend(characteristics);
    }

    /// Check if a service was discovered.
    pub fn contains_service(&self, service: &Uuid) -> bool {
        self.services.contains_key(service)
    }

    /// Characteristics of a discovered service.
    pub fn characteristics(&self, service: &Uuid) -> Option<&[Uuid]> {
        self.services.get(service).map(Vec::as_slice)
    }

    /// Number of discovered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Check if no services were discovered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl From<&BTreeSet<Service>> for ServiceCatalog {
    fn from(services: &BTreeSet<Service>) -> Self {
        let mut catalog = Self::new();
        for service in services {
            catalog.insert_service(
                service.uuid,
                service.characteristics.iter().map(|c| c.uuid),
            );
        }
        catalog
    }
}

/// Events the transport delivers for one peer connection, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// The link is up.
    Connected,
    /// Service discovery finished.
    ServicesDiscovered(ServiceCatalog),
    /// The peer accepted the indication-enable write.
    SubscribeAcknowledged,
    /// The indication-enable write failed.
    SubscribeFailed {
        /// Description of the failure.
        reason: String,
    },
    /// An indication arrived.
    IndicationReceived(RawIndication),
    /// The link reported an error (e.g. a GATT error code).
    LinkError {
        /// Description of the failure.
        reason: String,
    },
    /// The link is down.
    Disconnected,
}

/// Requests the session hands to the transport.
///
/// Each call only queues a request. Completion is reported later as a
/// [`TransportEvent`].
#[cfg_attr(test, mockall::automock)]
pub trait GattTransport {
    /// Write the client configuration descriptor to enable indications.
    fn enable_indications(
        &mut self,
        characteristic: &CharacteristicHandle,
    ) -> std::result::Result<(), TransportError>;

    /// Write the client configuration descriptor to disable indications.
    fn disable_indications(
        &mut self,
        characteristic: &CharacteristicHandle,
    ) -> std::result::Result<(), TransportError>;

    /// Drop the link.
    fn disconnect(&mut self) -> std::result::Result<(), TransportError>;
}
