//! Connection driver.
//!
//! Runs one [`Session`] over a [`GattLink`] on a tokio task. Link activity
//! is turned into [`TransportEvent`]s and fed to the session one at a time;
//! session events are published on a broadcast channel. There is no
//! reconnect: when the session ends the task ends. Dropping the
//! [`ThermometerConnection`] disconnects the link and ends the task.

use futures::stream::StreamExt;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ble::binding::CharacteristicHandle;
use crate::ble::link::{GattLink, NotificationStream};
use crate::ble::transport::{GattTransport, TransportEvent};
use crate::ble::uuids::TEMPERATURE_MEASUREMENT_UUID;
use crate::config::ConnectionConfig;
use crate::error::{Error, Result, TransportError};
use crate::session::{Session, SessionEvent, SessionState, TracingListener};

/// Link operation queued by the session.
#[derive(Debug)]
enum LinkRequest {
    EnableIndications { service: Uuid, characteristic: Uuid },
    DisableIndications { service: Uuid, characteristic: Uuid },
    Disconnect,
}

/// Consumer request forwarded to the session task.
enum Command {
    Resubscribe(oneshot::Sender<Result<()>>),
    Unsubscribe(oneshot::Sender<Result<()>>),
    Disconnect(oneshot::Sender<Result<()>>),
}

/// [`GattTransport`] that queues requests for the session task.
struct QueuedTransport {
    requests: mpsc::UnboundedSender<LinkRequest>,
}

impl QueuedTransport {
    fn queue(&self, request: LinkRequest) -> std::result::Result<(), TransportError> {
        self.requests
            .send(request)
            .map_err(|_| TransportError::new("link task stopped"))
    }
}

impl GattTransport for QueuedTransport {
    fn enable_indications(
        &mut self,
        characteristic: &CharacteristicHandle,
    ) -> std::result::Result<(), TransportError> {
        self.queue(LinkRequest::EnableIndications {
            service: characteristic.service_uuid(),
            characteristic: characteristic.uuid(),
        })
    }

    fn disable_indications(
        &mut self,
        characteristic: &CharacteristicHandle,
    ) -> std::result::Result<(), TransportError> {
        self.queue(LinkRequest::DisableIndications {
            service: characteristic.service_uuid(),
            characteristic: characteristic.uuid(),
        })
    }

    fn disconnect(&mut self) -> std::result::Result<(), TransportError> {
        self.queue(LinkRequest::Disconnect)
    }
}

/// A running Health Thermometer session on one peripheral.
pub struct ThermometerConnection {
    /// Identifier of the peripheral.
    identifier: String,
    /// Latest session state.
    state: Arc<RwLock<SessionState>>,
    /// Channel for session events.
    event_tx: broadcast::Sender<SessionEvent>,
    /// Channel for consumer commands.
    command_tx: mpsc::UnboundedSender<Command>,
    /// Tells the session task to disconnect when the connection is dropped.
    shutdown_tx: Option<oneshot::Sender<()>>,
    /// The session task.
    task: Option<JoinHandle<()>>,
}

impl ThermometerConnection {
    /// Start a session on `link`.
    ///
    /// Returns the connection and a receiver subscribed before the first
    /// event, so no event is missed.
    pub fn start<L: GattLink>(
        link: L,
        config: ConnectionConfig,
    ) -> (Self, broadcast::Receiver<SessionEvent>) {
        let identifier = link.identifier();
        let (event_tx, event_rx) = broadcast::channel(config.event_capacity.max(1));
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let state = Arc::new(RwLock::new(SessionState::Idle));

        let mut session = Session::with_config(
            QueuedTransport {
                requests: request_tx,
            },
            config.session.clone(),
        );
        session.add_listener(TracingListener::new(identifier.clone()));
        let tx = event_tx.clone();
        session.add_listener(move |event: &SessionEvent| {
            let _ = tx.send(event.clone());
        });

        info!("Starting thermometer session on {}", identifier);

        let task = tokio::spawn(SessionTask {
            link,
            config,
            session,
            requests: request_rx,
            commands: command_rx,
            shutdown: shutdown_rx,
            stopping: false,
            state: state.clone(),
        }
        .run());

        (
            Self {
                identifier,
                state,
                event_tx,
                command_tx,
                shutdown_tx: Some(shutdown_tx),
                task: Some(task),
            },
            event_rx,
        )
    }

    /// Get the peripheral identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Get the current session state.
    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    /// Subscribe to session events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Request indications again after a subscription failure.
    pub async fn resubscribe(&self) -> Result<()> {
        self.request(Command::Resubscribe).await
    }

    /// Stop indications without disconnecting.
    pub async fn unsubscribe(&self) -> Result<()> {
        self.request(Command::Unsubscribe).await
    }

    /// Drop the link. The session ends with a `Disconnected` event.
    pub async fn disconnect(&self) -> Result<()> {
        self.request(Command::Disconnect).await
    }

    /// Check if the session task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait for the session to end.
    pub async fn wait(mut self) -> Result<()> {
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| Error::Internal(format!("session task failed: {}", e))),
            None => Ok(()),
        }
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<()>>) -> Command,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .map_err(|_| Error::NotConnected)?;
        reply_rx.await.map_err(|_| Error::NotConnected)?
    }
}

impl Drop for ThermometerConnection {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

impl std::fmt::Debug for ThermometerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThermometerConnection")
            .field("identifier", &self.identifier)
            .field("state", &self.state())
            .finish()
    }
}

/// State owned by the session task.
struct SessionTask<L> {
    link: L,
    config: ConnectionConfig,
    session: Session<QueuedTransport>,
    requests: mpsc::UnboundedReceiver<LinkRequest>,
    commands: mpsc::UnboundedReceiver<Command>,
    shutdown: oneshot::Receiver<()>,
    stopping: bool,
    state: Arc<RwLock<SessionState>>,
}

impl<L: GattLink> SessionTask<L> {
    async fn run(mut self) {
        if let Some(mut notifications) = self.establish().await {
            self.event_loop(&mut notifications).await;
        }

        // Requests queued by the final transition, e.g. the forced
        // disconnect of an unsupported peer.
        while let Ok(request) = self.requests.try_recv() {
            if let LinkRequest::Disconnect = request {
                if let Err(e) = self.link.disconnect().await {
                    warn!("Failed to disconnect: {}", e);
                }
            }
        }

        debug!("Session task for {} ended", self.link.identifier());
    }

    /// Connect, open the notification stream and discover services.
    async fn establish(&mut self) -> Option<NotificationStream> {
        match tokio::time::timeout(self.config.connect_timeout, self.link.connect()).await {
            Ok(Ok(())) => self.feed(TransportEvent::Connected),
            Ok(Err(e)) => {
                self.feed(TransportEvent::LinkError {
                    reason: e.to_string(),
                });
                return None;
            }
            Err(_) => {
                // The platform may still complete the connection
                let timeout = Error::Timeout {
                    operation: "connection".to_string(),
                };
                self.fail(timeout.to_string()).await;
                return None;
            }
        }

        // Open the stream before discovery so no indication is lost
        let notifications = match self.link.notifications().await {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(e.to_string()).await;
                return None;
            }
        };

        let discovery =
            tokio::time::timeout(self.config.discovery_timeout, self.link.discover_services())
                .await;
        match discovery {
            Ok(Ok(catalog)) => self.feed(TransportEvent::ServicesDiscovered(catalog)),
            Ok(Err(e)) => {
                self.fail(e.to_string()).await;
                return None;
            }
            Err(_) => {
                let timeout = Error::Timeout {
                    operation: "service discovery".to_string(),
                };
                self.fail(timeout.to_string()).await;
                return None;
            }
        }

        Some(notifications)
    }

    async fn event_loop(&mut self, notifications: &mut NotificationStream) {
        let period = self
            .config
            .link_check_interval
            .max(std::time::Duration::from_millis(10));
        let mut link_check = tokio::time::interval(period);

        while !self.session.state().is_terminal() {
            tokio::select! {
                biased;

                _ = &mut self.shutdown, if !self.stopping => {
                    debug!("Connection dropped, disconnecting {}", self.link.identifier());
                    self.stopping = true;
                    if let Err(e) = self.session.disconnect() {
                        warn!("Failed to request disconnection: {}", e);
                        self.feed(TransportEvent::Disconnected);
                    }
                }
                Some(request) = self.requests.recv() => {
                    if let Some(event) = Self::perform(&self.link, request).await {
                        self.feed(event);
                    }
                }
                Some(command) = self.commands.recv() => {
                    self.execute(command);
                }
                notification = notifications.next() => match notification {
                    Some(n) if n.characteristic == TEMPERATURE_MEASUREMENT_UUID => {
                        self.feed(TransportEvent::IndicationReceived(n.value));
                    }
                    Some(n) => {
                        trace!("Ignoring notification from {}", n.characteristic);
                    }
                    None => {
                        debug!("Notification stream ended");
                        self.feed(TransportEvent::Disconnected);
                    }
                },
                _ = link_check.tick() => match self.link.is_connected().await {
                    Ok(true) => {}
                    Ok(false) => {
                        debug!("Link check found peripheral disconnected");
                        self.feed(TransportEvent::Disconnected);
                    }
                    Err(e) => warn!("Link check failed: {}", e),
                },
            }
        }
    }

    async fn perform(link: &L, request: LinkRequest) -> Option<TransportEvent> {
        match request {
            LinkRequest::EnableIndications {
                service,
                characteristic,
            } => match link.subscribe(service, characteristic).await {
                Ok(()) => Some(TransportEvent::SubscribeAcknowledged),
                Err(e) => Some(TransportEvent::SubscribeFailed {
                    reason: e.to_string(),
                }),
            },
            LinkRequest::DisableIndications {
                service,
                characteristic,
            } => {
                if let Err(e) = link.unsubscribe(service, characteristic).await {
                    warn!("Failed to disable indications: {}", e);
                }
                None
            }
            LinkRequest::Disconnect => {
                if let Err(e) = link.disconnect().await {
                    warn!("Failed to disconnect: {}", e);
                }
                Some(TransportEvent::Disconnected)
            }
        }
    }

    fn execute(&mut self, command: Command) {
        let (reply, result) = match command {
            Command::Resubscribe(reply) => (reply, self.session.resubscribe()),
            Command::Unsubscribe(reply) => (reply, self.session.unsubscribe()),
            Command::Disconnect(reply) => (reply, self.session.disconnect()),
        };
        *self.state.write() = self.session.state();
        let _ = reply.send(result);
    }

    /// Report a link failure after the link came up, then drop the link.
    async fn fail(&mut self, reason: String) {
        self.feed(TransportEvent::LinkError { reason });
        if let Err(e) = self.link.disconnect().await {
            warn!("Failed to disconnect: {}", e);
        }
    }

    fn feed(&mut self, event: TransportEvent) {
        self.session.handle_event(event);
        *self.state.write() = self.session.state();
    }
}
