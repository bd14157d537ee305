//! Configuration for sessions and connections.

use std::time::Duration;

/// Behavior of a single [`Session`](crate::session::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Ask the transport to drop the link when the peer lacks the
    /// Health Thermometer profile.
    pub disconnect_on_unsupported: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            disconnect_on_unsupported: true,
        }
    }
}

/// Settings for a [`ThermometerConnection`](crate::ble::connection::ThermometerConnection).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionConfig {
    /// Capacity of the session event broadcast channel.
    pub event_capacity: usize,
    /// How long to wait for the link to come up.
    pub connect_timeout: Duration,
    /// How long to wait for service discovery.
    pub discovery_timeout: Duration,
    /// How often to poll the link for a silent disconnection.
    pub link_check_interval: Duration,
    /// Session behavior.
    pub session: SessionConfig,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            event_capacity: 64,
            connect_timeout: Duration::from_secs(10),
            discovery_timeout: Duration::from_secs(10),
            link_check_interval: Duration::from_secs(1),
            session: SessionConfig::default(),
        }
    }
}

impl ConnectionConfig {
    /// Set the event channel capacity (minimum 1).
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the link check interval.
    pub fn with_link_check_interval(mut self, interval: Duration) -> Self {
        self.link_check_interval = interval;
        self
    }

    /// Set whether unsupported peers are disconnected.
    pub fn with_disconnect_on_unsupported(mut self, disconnect: bool) -> Self {
        self.session.disconnect_on_unsupported = disconnect;
        self
    }
}
