//! The realtime event channel.
//!
//! A [`RealtimeChannel`] keeps one logical connection to the server. It
//! authenticates, joins a contest topic, dispatches inbound events to
//! registered handlers and reconnects with bounded linear backoff when the
//! transport drops.
//!
//! Each established connection is owned by a driver task. The driver decodes
//! and dispatches inbound messages one at a time, so handlers for a message
//! finish before the next message is looked at. Outbound requests reach the
//! driver through an unbounded queue.

use crate::config::ChannelConfig;
use crate::metrics;
use crate::reconnect::ReconnectPolicy;
use crate::state::ConnectionState;
use codestorm_core::{Handler, HandlerRegistry};
use codestorm_protocol::{codec, EventKind, OutboundRequest};
use codestorm_transport::{Connection, Connector, TransportError, WebSocketConnector};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// `connect` was called while a connection is active.
    #[error("Channel already active (state: {0})")]
    AlreadyActive(ConnectionState),

    /// `disconnect` was called before the connection was established.
    #[error("Connect cancelled by disconnect")]
    Cancelled,

    /// The transport could not be established.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

enum Command {
    Send(OutboundRequest),
    Close,
}

/// Why the driver stopped pumping a connection.
enum Exit {
    /// Explicit disconnect or stale session.
    Closed,
    /// The transport dropped.
    Lost,
}

struct Session {
    /// Bumped by every `connect` and `disconnect`; drivers from older epochs stop.
    epoch: u64,
    state: ConnectionState,
    user_id: Option<String>,
    topic_id: Option<String>,
    authenticated: bool,
    attempt: u32,
    commands: Option<mpsc::UnboundedSender<Command>>,
}

impl Session {
    fn queue(&self, request: OutboundRequest) -> bool {
        match &self.commands {
            Some(tx) => tx.send(Command::Send(request)).is_ok(),
            None => false,
        }
    }
}

struct Shared {
    endpoint: String,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    session: Mutex<Session>,
    state_tx: watch::Sender<ConnectionState>,
    handlers: HandlerRegistry,
}

impl Shared {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the session if `epoch` is still current.
    fn current(&self, epoch: u64) -> Option<MutexGuard<'_, Session>> {
        let session = self.session();
        (session.epoch == epoch).then_some(session)
    }

    fn transition(&self, session: &mut Session, next: ConnectionState) {
        let previous = session.state;
        session.state = next;

        if next != ConnectionState::Open {
            session.authenticated = false;
            session.topic_id = None;
        }

        if previous != next {
            debug!(from = %previous, to = %next, "Connection state changed");
        }
        self.state_tx.send_replace(next);
        metrics::set_connection_state(next);
    }

    /// Decode and dispatch one inbound message.
    ///
    /// Returns `false` if the session moved on and the driver should stop.
    fn handle_inbound(&self, epoch: u64, text: &str) -> bool {
        let event = match codec::decode(text) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Dropping malformed message");
                metrics::record_malformed();
                return true;
            }
        };

        {
            let Some(mut session) = self.current(epoch) else {
                return false;
            };
            match event.kind {
                EventKind::Authenticated => {
                    session.authenticated = true;
                    info!(user = ?session.user_id, "Authenticated");
                }
                EventKind::AuthenticationFailed => {
                    session.authenticated = false;
                    session.topic_id = None;
                    warn!(user = ?session.user_id, payload = %event.payload, "Authentication failed");
                }
                _ => {}
            }
        }

        metrics::record_event(event.kind);
        self.handlers.dispatch(&event);
        true
    }

    /// Pump one open connection until it closes or drops.
    async fn pump(
        &self,
        epoch: u64,
        conn: &mut dyn Connection,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Exit {
        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Send(request)) => {
                        let text = match codec::encode(&request) {
                            Ok(text) => text,
                            Err(e) => {
                                error!(request = request.kind(), error = %e, "Failed to encode request");
                                continue;
                            }
                        };
                        if let Err(e) = conn.send(text).await {
                            warn!(connection = %conn.id(), error = %e, "Send failed");
                            return Exit::Lost;
                        }
                        metrics::record_outbound(request.kind());
                        debug!(connection = %conn.id(), request = request.kind(), "Request sent");
                    }
                    Some(Command::Close) | None => return Exit::Closed,
                },

                received = conn.recv() => match received {
                    Ok(Some(text)) => {
                        if !self.handle_inbound(epoch, &text) {
                            return Exit::Closed;
                        }
                    }
                    Ok(None) => {
                        info!(connection = %conn.id(), "Connection closed by server");
                        return Exit::Lost;
                    }
                    Err(TransportError::Malformed(reason)) => {
                        warn!(connection = %conn.id(), %reason, "Dropping malformed message");
                        metrics::record_malformed();
                    }
                    Err(e) => {
                        warn!(connection = %conn.id(), error = %e, "Connection error");
                        return Exit::Lost;
                    }
                },
            }
        }
    }

    /// Run the reconnect cycle after a loss.
    ///
    /// Returns the new connection, or `None` if the budget ran out or the
    /// session was cancelled.
    async fn reconnect(
        &self,
        epoch: u64,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> Option<Box<dyn Connection>> {
        {
            let mut session = self.current(epoch)?;
            self.transition(&mut session, ConnectionState::Reconnecting);
        }
        warn!(endpoint = %self.endpoint, "Connection lost, reconnecting");

        loop {
            let (attempt, delay) = {
                let mut session = self.current(epoch)?;
                let next = session.attempt + 1;
                match self.policy.delay_for_attempt(next) {
                    Some(delay) => {
                        session.attempt = next;
                        (next, delay)
                    }
                    None => {
                        let attempts = session.attempt;
                        session.commands = None;
                        self.transition(&mut session, ConnectionState::Failed);
                        error!(endpoint = %self.endpoint, attempts, "Reconnect attempts exhausted");
                        metrics::record_reconnect_exhausted();
                        return None;
                    }
                }
            };

            metrics::record_reconnect_attempt();
            info!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = until_closed(commands) => return None,
            }

            {
                let mut session = self.current(epoch)?;
                self.transition(&mut session, ConnectionState::Connecting);
            }

            let result = tokio::select! {
                result = self.connector.connect(&self.endpoint) => result,
                () = until_closed(commands) => return None,
            };

            match result {
                Ok(conn) => {
                    let mut session = self.current(epoch)?;
                    session.attempt = 0;
                    self.transition(&mut session, ConnectionState::Open);
                    if let Some(user_id) = session.user_id.clone() {
                        session.queue(OutboundRequest::authenticate(user_id));
                    }
                    info!(connection = %conn.id(), attempt, "Reconnected");
                    return Some(conn);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Reconnect attempt failed");
                    let mut session = self.current(epoch)?;
                    self.transition(&mut session, ConnectionState::Reconnecting);
                }
            }
        }
    }
}

/// Wait until the command queue is closed, dropping requests that arrive
/// while no connection is open.
async fn until_closed(commands: &mut mpsc::UnboundedReceiver<Command>) {
    while let Some(command) = commands.recv().await {
        match command {
            Command::Send(request) => {
                debug!(request = request.kind(), "Dropping request while not open");
            }
            Command::Close => return,
        }
    }
}

async fn drive(
    shared: Arc<Shared>,
    epoch: u64,
    mut conn: Box<dyn Connection>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    loop {
        match shared.pump(epoch, &mut *conn, &mut commands).await {
            Exit::Closed => {
                if let Err(e) = conn.close().await {
                    debug!(connection = %conn.id(), error = %e, "Close failed");
                }
                debug!(connection = %conn.id(), "Driver stopped");
                return;
            }
            Exit::Lost => match shared.reconnect(epoch, &mut commands).await {
                Some(next) => conn = next,
                None => return,
            },
        }
    }
}

/// A resilient realtime event channel.
///
/// Cloning yields another handle to the same channel.
#[derive(Clone)]
pub struct RealtimeChannel {
    shared: Arc<Shared>,
}

impl RealtimeChannel {
    /// Create a channel for `endpoint` over the given connector.
    #[must_use]
    pub fn new(
        endpoint: impl Into<String>,
        connector: Arc<dyn Connector>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Idle);
        Self {
            shared: Arc::new(Shared {
                endpoint: endpoint.into(),
                connector,
                policy,
                session: Mutex::new(Session {
                    epoch: 0,
                    state: ConnectionState::Idle,
                    user_id: None,
                    topic_id: None,
                    authenticated: false,
                    attempt: 0,
                    commands: None,
                }),
                state_tx,
                handlers: HandlerRegistry::new(),
            }),
        }
    }

    /// Create a WebSocket channel from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured origin is invalid.
    pub fn from_config(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let endpoint = config.endpoint()?;
        Ok(Self::new(
            endpoint,
            Arc::new(WebSocketConnector::new()),
            config.reconnect_policy(),
        ))
    }

    /// The endpoint URL this channel connects to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Open the connection, authenticating as `identity` if given.
    ///
    /// Resolves once the transport is established; authentication completes
    /// later and is signalled by an [`EventKind::Authenticated`] event.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel is already active, if the transport
    /// cannot be established (the channel returns to `Idle` without
    /// retrying), or if `disconnect` was called meanwhile.
    pub async fn connect(&self, identity: Option<String>) -> Result<(), ChannelError> {
        let epoch = {
            let mut session = self.shared.session();
            if !session.state.can_connect() {
                return Err(ChannelError::AlreadyActive(session.state));
            }
            session.epoch += 1;
            session.attempt = 0;
            session.user_id = identity.clone();
            self.shared.transition(&mut session, ConnectionState::Connecting);
            session.epoch
        };

        info!(endpoint = %self.shared.endpoint, transport = self.shared.connector.name(), "Connecting");

        let mut conn = match self.shared.connector.connect(&self.shared.endpoint).await {
            Ok(conn) => conn,
            Err(e) => {
                if let Some(mut session) = self.shared.current(epoch) {
                    self.shared.transition(&mut session, ConnectionState::Idle);
                }
                warn!(endpoint = %self.shared.endpoint, error = %e, "Connect failed");
                return Err(e.into());
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let registered = match self.shared.current(epoch) {
            Some(mut session) => {
                session.commands = Some(tx);
                self.shared.transition(&mut session, ConnectionState::Open);
                if let Some(user_id) = identity {
                    session.queue(OutboundRequest::authenticate(user_id));
                }
                true
            }
            None => false,
        };
        if !registered {
            let _ = conn.close().await;
            return Err(ChannelError::Cancelled);
        }

        info!(connection = %conn.id(), remote = ?conn.remote_addr(), "Connected");
        tokio::spawn(drive(Arc::clone(&self.shared), epoch, conn, rx));
        Ok(())
    }

    /// Send an authentication request. No-op unless the connection is open.
    pub fn authenticate(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        let mut session = self.shared.session();
        if session.state != ConnectionState::Open {
            debug!(state = %session.state, "Authenticate ignored, connection not open");
            return;
        }
        session.user_id = Some(user_id.clone());
        session.queue(OutboundRequest::authenticate(user_id));
    }

    /// Join a contest topic. Dropped unless open and authenticated.
    pub fn join_topic(&self, topic_id: impl Into<String>) {
        let topic_id = topic_id.into();
        let mut session = self.shared.session();
        if session.state != ConnectionState::Open || !session.authenticated {
            debug!(topic = %topic_id, "Join ignored, not authenticated");
            return;
        }
        if session.queue(OutboundRequest::join_contest(topic_id.clone())) {
            session.topic_id = Some(topic_id);
        }
    }

    /// Leave the current contest topic. Dropped unless open and authenticated.
    pub fn leave_topic(&self) {
        let mut session = self.shared.session();
        if session.state != ConnectionState::Open || !session.authenticated {
            debug!("Leave ignored, not authenticated");
            return;
        }
        if session.queue(OutboundRequest::LeaveContest) {
            session.topic_id = None;
        }
    }

    /// Register a handler for an event kind.
    pub fn on(&self, kind: EventKind, handler: Handler) {
        self.shared.handlers.on(kind, handler);
    }

    /// Remove the first registration of `handler` for `kind`.
    pub fn off(&self, kind: EventKind, handler: &Handler) -> bool {
        self.shared.handlers.off(kind, handler)
    }

    /// Close the connection and reset the channel.
    ///
    /// Clears the identity, topic, retry counter and every handler. The
    /// transport closes in the background.
    pub fn disconnect(&self) {
        let mut session = self.shared.session();
        session.epoch += 1;
        if let Some(tx) = session.commands.take() {
            // The driver may already be gone.
            let _ = tx.send(Command::Close);
        }

        self.shared.transition(&mut session, ConnectionState::Closing);
        session.user_id = None;
        session.attempt = 0;
        self.shared.handlers.clear();
        self.shared.transition(&mut session, ConnectionState::Idle);

        info!(endpoint = %self.shared.endpoint, "Disconnected");
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.session().state
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Whether the server has confirmed authentication on this connection.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.shared.session().authenticated
    }

    /// The identity used for (re)authentication.
    #[must_use]
    pub fn user_id(&self) -> Option<String> {
        self.shared.session().user_id.clone()
    }

    /// The joined contest topic, if any.
    #[must_use]
    pub fn topic_id(&self) -> Option<String> {
        self.shared.session().topic_id.clone()
    }

    /// Current reconnect attempt number (0 while healthy).
    #[must_use]
    pub fn reconnect_attempt(&self) -> u32 {
        self.shared.session().attempt
    }

    /// The handler table.
    #[must_use]
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.shared.handlers
    }
}

impl fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.shared.session();
        f.debug_struct("RealtimeChannel")
            .field("endpoint", &self.shared.endpoint)
            .field("state", &session.state)
            .field("authenticated", &session.authenticated)
            .field("topic_id", &session.topic_id)
            .field("attempt", &session.attempt)
            .finish()
    }
}
