//! Health Thermometer session state machine.
//!
//! A [`Session`] follows one peer connection from link-up to link-down.
//! Transport events go in through [`Session::handle_event`]; the resulting
//! [`SessionEvent`]s are returned and also delivered, synchronously and in
//! order, to every registered [`SessionListener`].
//!
//! ```text
//! Idle --connected--> Connected --services discovered--> ServiceReady
//!                         |                                 |    ^
//!                         | (profile missing)   subscribe ack|    |unsubscribe
//!                         v                                 v    |
//!                    Disconnected <----- disconnected ----- Subscribed
//! ```
//!
//! `Disconnected` is terminal. A new connection needs a new session.

use tracing::{debug, info, trace, warn};

use crate::ble::binding::ServiceBinding;
use crate::ble::transport::{GattTransport, TransportEvent};
use crate::config::SessionConfig;
use crate::data::TemperatureMeasurement;
use crate::error::{Error, Result, SessionError};
use crate::protocol::measurement;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SessionState {
    /// Created, link not up yet.
    #[default]
    Idle,
    /// Link up, waiting for service discovery.
    Connected,
    /// Characteristic bound, indications requested or not yet enabled.
    ServiceReady,
    /// Indications enabled; measurements are decoded.
    Subscribed,
    /// Link down. Terminal.
    Disconnected,
}

impl SessionState {
    /// Check if the session has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Check if a characteristic is bound in this state.
    pub fn has_characteristic(&self) -> bool {
        matches!(self, Self::ServiceReady | Self::Subscribed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Connected => write!(f, "Connected"),
            Self::ServiceReady => write!(f, "ServiceReady"),
            Self::Subscribed => write!(f, "Subscribed"),
            Self::Disconnected => write!(f, "Disconnected"),
        }
    }
}

/// Events reported to the consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The link came up.
    Connected,
    /// A measurement was decoded.
    MeasurementReceived(TemperatureMeasurement),
    /// Something went wrong. See [`SessionError::is_fatal`].
    Error(SessionError),
    /// The session ended.
    Disconnected,
}

/// Receives session events.
///
/// Implemented for any `FnMut(&SessionEvent)` closure.
pub trait SessionListener {
    /// Called once per event, in order.
    fn on_event(&mut self, event: &SessionEvent);
}

impl<F> SessionListener for F
where
    F: FnMut(&SessionEvent),
{
    fn on_event(&mut self, event: &SessionEvent) {
        self(event)
    }
}

/// Listener that logs every event through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingListener {
    /// Label identifying the peer in log lines.
    pub peer: String,
}

impl TracingListener {
    /// Create a listener labelled with the peer identifier.
    pub fn new(peer: impl Into<String>) -> Self {
        Self { peer: peer.into() }
    }
}

impl SessionListener for TracingListener {
    fn on_event(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::Connected => info!("[{}] Connected", self.peer),
            SessionEvent::MeasurementReceived(m) => info!("[{}] \"{}\" received", self.peer, m),
            SessionEvent::Error(e) if e.is_fatal() => warn!("[{}] {}", self.peer, e),
            SessionEvent::Error(e) => debug!("[{}] {}", self.peer, e),
            SessionEvent::Disconnected => info!("[{}] Disconnected", self.peer),
        }
    }
}

/// One Health Thermometer session over a transport.
///
/// Indications are decoded only while `Subscribed`. One that arrives in
/// another live state, such as before the subscribe acknowledgement or
/// after [`Session::unsubscribe`], is dropped with a warning. After
/// `Disconnected` they are dropped silently.
pub struct Session<T> {
    state: SessionState,
    binding: ServiceBinding,
    transport: T,
    config: SessionConfig,
    listeners: Vec<Box<dyn SessionListener + Send>>,
}

impl<T: GattTransport> Session<T> {
    /// Create an idle session.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, SessionConfig::default())
    }

    /// Create an idle session with explicit settings.
    pub fn with_config(transport: T, config: SessionConfig) -> Self {
        Self {
            state: SessionState::Idle,
            binding: ServiceBinding::new(),
            transport,
            config,
            listeners: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The service binding (and through it, the characteristic handle).
    pub fn binding(&self) -> &ServiceBinding {
        &self.binding
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Register a listener. Listeners see events in registration order.
    pub fn add_listener<L>(&mut self, listener: L)
    where
        L: SessionListener + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Feed one transport event. Returns the events it produced, which
    /// have already been delivered to the listeners.
    pub fn handle_event(&mut self, event: TransportEvent) -> Vec<SessionEvent> {
        let previous = self.state;
        let events = self.transition(event);

        if self.state != previous {
            debug!("Session state changed: {} -> {}", previous, self.state);
        }

        self.dispatch(&events);
        events
    }

    /// Request indications again after a [`SessionError::SubscriptionFailed`].
    pub fn resubscribe(&mut self) -> Result<()> {
        if self.state != SessionState::ServiceReady {
            return Err(self.invalid_state("resubscribe"));
        }
        self.binding.subscribe(&mut self.transport)?;
        Ok(())
    }

    /// Stop indications. The session returns to `ServiceReady`.
    pub fn unsubscribe(&mut self) -> Result<()> {
        if self.state != SessionState::Subscribed {
            return Err(self.invalid_state("unsubscribe"));
        }
        self.binding.unsubscribe(&mut self.transport)?;
        self.state = SessionState::ServiceReady;
        debug!("Session state changed: Subscribed -> ServiceReady");
        Ok(())
    }

    /// Ask the transport to drop the link. The session ends when the
    /// transport reports `Disconnected`.
    pub fn disconnect(&mut self) -> Result<()> {
        if self.state.is_terminal() {
            return Ok(());
        }
        self.transport
            .disconnect()
            .map_err(|e| Error::Binding(e.into()))
    }

    fn transition(&mut self, event: TransportEvent) -> Vec<SessionEvent> {
        use SessionState as S;
        use TransportEvent as E;

        match (self.state, event) {
            (S::Disconnected, event) => {
                trace!("Ignoring {:?} after disconnection", event);
                Vec::new()
            }

            (_, E::Disconnected) => self.terminate(Vec::new()),

            (_, E::LinkError { reason }) => {
                warn!("Link error: {}", reason);
                self.terminate(vec![SessionEvent::Error(SessionError::Transport { reason })])
            }

            (S::Idle, E::Connected) => {
                self.state = S::Connected;
                vec![SessionEvent::Connected]
            }

            (S::Connected, E::ServicesDiscovered(catalog)) => {
                match self.binding.discover(&catalog).map(|_| ()) {
                    Ok(_) => {
                        self.state = S::ServiceReady;
                        self.request_indications()
                    }
                    Err(e) => {
                        warn!("Peer does not support the Health Thermometer profile: {}", e);
                        if self.config.disconnect_on_unsupported {
                            if let Err(e) = self.transport.disconnect() {
                                warn!("Failed to request disconnection: {}", e);
                            }
                        }
                        self.terminate(vec![SessionEvent::Error(
                            SessionError::UnsupportedDevice(e),
                        )])
                    }
                }
            }

            (S::ServiceReady, E::SubscribeAcknowledged) => {
                self.state = S::Subscribed;
                Vec::new()
            }

            (S::ServiceReady, E::SubscribeFailed { reason }) => {
                warn!("Enabling indications failed: {}", reason);
                vec![SessionEvent::Error(SessionError::SubscriptionFailed {
                    reason,
                })]
            }

            (S::Subscribed, E::IndicationReceived(data)) => match measurement::decode(&data) {
                Ok(m) => {
                    trace!("Decoded {} from {:02X?}", m, &data[..]);
                    vec![SessionEvent::MeasurementReceived(m)]
                }
                Err(e) => {
                    debug!("Dropping malformed indication {:02X?}: {}", &data[..], e);
                    vec![SessionEvent::Error(SessionError::MalformedPayload(e))]
                }
            },

            (state, E::IndicationReceived(data)) => {
                warn!(
                    "Dropping {}-byte indication received while {}",
                    data.len(),
                    state
                );
                Vec::new()
            }

            (state, event) => {
                debug!("Ignoring {:?} in state {}", event, state);
                Vec::new()
            }
        }
    }

    fn request_indications(&mut self) -> Vec<SessionEvent> {
        match self.binding.subscribe(&mut self.transport) {
            Ok(()) => Vec::new(),
            Err(e) => vec![SessionEvent::Error(SessionError::SubscriptionFailed {
                reason: e.to_string(),
            })],
        }
    }

    fn terminate(&mut self, mut events: Vec<SessionEvent>) -> Vec<SessionEvent> {
        self.binding.invalidate();
        self.state = SessionState::Disconnected;
        events.push(SessionEvent::Disconnected);
        events
    }

    fn dispatch(&mut self, events: &[SessionEvent]) {
        for event in events {
            for listener in &mut self.listeners {
                listener.on_event(event);
            }
        }
    }

    fn invalid_state(&self, operation: &'static str) -> Error {
        Error::InvalidState {
            operation,
            state: self.state.to_string(),
        }
    }
}

impl<T> std::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("binding", &self.binding)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
