//! Connection state and event loop
//!
//! A [`Connection`] exclusively owns the session backend and all mutable
//! connection state. Every router callback and resize runs on the single
//! task inside [`Connection::run`]; other tasks interact through a
//! [`ConnectionHandle`], which marshals requests as messages instead of
//! sharing state.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info};
use zeroize::{Zeroize, Zeroizing};

use crate::config::Config;
use crate::display::{apply_geometry, WindowTable};
use crate::error::{DisplayError, Result, SessionError, SessionResult, ViewportError};
use crate::proto::{AudioHandle, DisplayGeometry, MouseMode, SessionBackend, SessionEvent};
use crate::session::registry::{ConnectionRegistry, ConnectionTicket};
use crate::session::router;
use crate::session::state::ConnectionPhase;

/// Status label used before the main channel reports a value
const UNKNOWN_LABEL: &str = "?";

/// Password material held for the session
///
/// The buffer is zeroed in place when scrubbed and again on drop, so
/// plaintext never outlives its use.
pub struct Credentials {
    secret: Zeroizing<String>,
}

impl Credentials {
    /// Wraps a password in a zeroizing buffer
    pub fn new(secret: String) -> Self {
        Self {
            secret: Zeroizing::new(secret),
        }
    }

    /// Zeroes the buffer in place
    pub fn scrub(&mut self) {
        self.secret.zeroize();
    }

    /// True once the buffer has been zeroed (or was empty to begin with)
    pub fn is_scrubbed(&self) -> bool {
        self.secret.is_empty()
    }

    /// The password material
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(<redacted>)")
    }
}

/// Mutable state of one connection
#[derive(Debug)]
pub struct ConnectionState {
    windows: WindowTable,
    main_channel: Option<u8>,
    audio: Option<AudioHandle>,
    mouse_state: &'static str,
    agent_state: &'static str,
    phase: ConnectionPhase,
    credentials: Option<Credentials>,
}

impl ConnectionState {
    /// Creates state for a not-yet-connected session
    pub fn new(credentials: Option<Credentials>) -> Self {
        Self {
            windows: WindowTable::new(),
            main_channel: None,
            audio: None,
            mouse_state: UNKNOWN_LABEL,
            agent_state: UNKNOWN_LABEL,
            phase: ConnectionPhase::Idle,
            credentials,
        }
    }

    /// The window table
    pub fn windows(&self) -> &WindowTable {
        &self.windows
    }

    /// The window table, mutably
    pub fn windows_mut(&mut self) -> &mut WindowTable {
        &mut self.windows
    }

    /// Id of the main control channel, once discovered
    pub fn main_channel(&self) -> Option<u8> {
        self.main_channel
    }

    /// Records the discovered main channel
    pub(crate) fn set_main_channel(&mut self, channel_id: u8) {
        self.main_channel = Some(channel_id);
    }

    /// The acquired audio handle, if any
    pub fn audio(&self) -> Option<&AudioHandle> {
        self.audio.as_ref()
    }

    /// Records the acquired audio handle
    pub(crate) fn set_audio(&mut self, audio: Option<AudioHandle>) {
        self.audio = audio;
    }

    /// Current mouse-mode status label
    pub fn mouse_state(&self) -> &'static str {
        self.mouse_state
    }

    /// Projects a reported mouse mode into the status label
    pub(crate) fn set_mouse_mode(&mut self, mode: MouseMode) {
        self.mouse_state = mode.label();
    }

    /// Current agent-presence status label
    pub fn agent_state(&self) -> &'static str {
        self.agent_state
    }

    /// Projects reported agent presence into the status label
    pub(crate) fn set_agent_connected(&mut self, connected: bool) {
        self.agent_state = if connected { "yes" } else { "no" };
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub(crate) fn phase_mut(&mut self) -> &mut ConnectionPhase {
        &mut self.phase
    }

    /// Whether unscrubbed password material is still buffered
    pub fn has_live_credentials(&self) -> bool {
        self.credentials
            .as_ref()
            .map(|credentials| !credentials.is_scrubbed())
            .unwrap_or(false)
    }

    /// The credential buffer, for inspection
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Zeroes any buffered password material in place
    pub(crate) fn scrub_credentials(&mut self) {
        if let Some(credentials) = &mut self.credentials {
            credentials.scrub();
        }
    }
}

/// Tears the session down once, guarding against re-entry
pub(crate) fn disconnect_session(state: &mut ConnectionState, backend: &mut dyn SessionBackend) {
    if state.phase().is_disconnecting() {
        debug!("disconnect already in progress");
        return;
    }

    state.phase_mut().force(ConnectionPhase::Disconnecting);
    backend.disconnect();
    state.phase_mut().force(ConnectionPhase::Disconnected);
    info!("session disconnected");
}

/// Request marshaled into the connection's event loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionCommand {
    /// Resize the active display to the given dimensions
    Resize {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },
    /// Stop the event loop and tear the session down
    Shutdown,
}

/// Cloneable handle for sending requests into a running connection
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<ConnectionCommand>,
}

impl ConnectionHandle {
    /// Requests a resize of the active display
    pub fn request_resize(&self, width: u32, height: u32) -> SessionResult<()> {
        self.commands
            .send(ConnectionCommand::Resize { width, height })
            .map_err(|_| SessionError::ChannelClosed)
    }

    /// Requests loop shutdown and session teardown
    pub fn shutdown(&self) -> SessionResult<()> {
        self.commands
            .send(ConnectionCommand::Shutdown)
            .map_err(|_| SessionError::ChannelClosed)
    }
}

/// One remote-display connection
///
/// Owns the backend session handle exclusively; created once at startup and
/// torn down on fatal disconnect or process exit.
pub struct Connection {
    state: ConnectionState,
    backend: Box<dyn SessionBackend>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    commands_tx: mpsc::UnboundedSender<ConnectionCommand>,
    commands_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    default_geometry: DisplayGeometry,
    resize_interval: Option<Duration>,
    _ticket: ConnectionTicket,
}

impl Connection {
    /// Creates a connection over a backend, configured from `config`
    pub fn new(
        registry: &ConnectionRegistry,
        mut backend: Box<dyn SessionBackend>,
        config: &Config,
    ) -> Self {
        backend.configure_target(&config.connection.host, config.connection.port);

        let credentials = config
            .connection
            .password
            .clone()
            .map(Credentials::new);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let ticket = registry.register();
        debug!("connection created ({} active)", registry.active_connections());

        Self {
            state: ConnectionState::new(credentials),
            backend,
            events: None,
            commands_tx,
            commands_rx,
            default_geometry: DisplayGeometry::at_origin(
                config.display.default_width,
                config.display.default_height,
            ),
            resize_interval: config
                .display
                .auto_resize
                .then(|| Duration::from_secs(config.display.resize_interval_secs)),
            _ticket: ticket,
        }
    }

    /// The connection state, for inspection
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Returns a handle for marshaling requests into the running loop
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            commands: self.commands_tx.clone(),
        }
    }

    /// Opens the session
    ///
    /// # Errors
    ///
    /// Returns `ConnectFailed` if the backend refuses the connection; the
    /// connection is terminal afterwards.
    pub fn connect(&mut self) -> SessionResult<()> {
        self.state.phase_mut().advance(ConnectionPhase::Connecting)?;

        if let Err(err) = self.backend.connect() {
            self.state.phase_mut().force(ConnectionPhase::Disconnected);
            return Err(err);
        }

        self.events = Some(self.backend.take_events()?);
        self.state.phase_mut().advance(ConnectionPhase::Connected)?;
        info!("session connected");
        Ok(())
    }

    /// Resizes the active display directly, outside the event loop
    ///
    /// Callers that own the connection may invoke this instead of going
    /// through a [`ConnectionHandle`].
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` before connect or after teardown has started,
    /// `NoActiveDisplay`/`NoMainChannel` when nothing can be resized, or a
    /// session error from the backend.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        if self.state.phase() != ConnectionPhase::Connected {
            return Err(SessionError::NotConnected.into());
        }

        apply_geometry(
            &self.state.windows,
            self.state.main_channel,
            self.backend.as_mut(),
            DisplayGeometry::at_origin(width, height),
        )
    }

    /// Runs the event loop until the session ends
    ///
    /// Consumes session events, the resize timer, and marshaled commands on
    /// one task. Returns when the session disconnects, the event stream
    /// ends, or a shutdown command arrives.
    ///
    /// # Errors
    ///
    /// Returns `NotConnected` if called before [`connect`](Self::connect),
    /// or a table contract violation surfaced by the router.
    pub async fn run(&mut self) -> Result<()> {
        let mut events = self.events.take().ok_or(SessionError::NotConnected)?;

        let mut resize_timer = self.resize_interval.map(|period| {
            tokio::time::interval_at(tokio::time::Instant::now() + period, period)
        });
        let auto_resize = resize_timer.is_some();

        loop {
            // Pending session events drain before commands and timer ticks
            tokio::select! {
                biased;

                maybe_event = events.recv() => match maybe_event {
                    Some(event) => {
                        router::handle_event(&mut self.state, self.backend.as_mut(), event)?;
                        if self.state.phase().is_disconnecting() {
                            break;
                        }
                    }
                    None => {
                        info!("session event stream ended");
                        disconnect_session(&mut self.state, self.backend.as_mut());
                        break;
                    }
                },
                maybe_command = self.commands_rx.recv() => match maybe_command {
                    Some(ConnectionCommand::Resize { width, height }) => {
                        self.apply_requested_geometry(DisplayGeometry::at_origin(width, height));
                    }
                    Some(ConnectionCommand::Shutdown) => {
                        disconnect_session(&mut self.state, self.backend.as_mut());
                        break;
                    }
                    None => break,
                },
                _ = wait_tick(&mut resize_timer), if auto_resize => {
                    self.apply_requested_geometry(self.default_geometry);
                }
            }
        }

        Ok(())
    }

    /// Applies a geometry from the timer or a marshaled command
    ///
    /// Ticks legitimately race channel discovery and teardown, so missing
    /// displays are reported at debug level rather than escalated.
    fn apply_requested_geometry(&mut self, geometry: DisplayGeometry) {
        if self.state.phase().is_disconnecting() {
            debug!("skipping resize: teardown in progress");
            return;
        }

        match apply_geometry(
            &self.state.windows,
            self.state.main_channel,
            self.backend.as_mut(),
            geometry,
        ) {
            Ok(()) => {}
            Err(ViewportError::Display(DisplayError::NoActiveDisplay))
            | Err(ViewportError::Display(DisplayError::NoMainChannel)) => {
                debug!("no display to resize yet");
            }
            Err(err) => {
                error!("resize failed: {}", err);
            }
        }
    }

    /// Tears the session down
    pub fn disconnect(&mut self) {
        disconnect_session(&mut self.state, self.backend.as_mut());
    }
}

/// Waits for the next resize tick; pends forever when the timer is disabled
async fn wait_tick(timer: &mut Option<tokio::time::Interval>) {
    match timer {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::loopback::create_loopback_session;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.connection.password = Some("swordfish".to_string());
        config
    }

    #[test]
    fn test_credentials_scrub_zeroes_buffer() {
        let mut credentials = Credentials::new("swordfish".to_string());
        assert!(!credentials.is_scrubbed());
        assert_eq!(credentials.secret(), "swordfish");

        credentials.scrub();

        assert!(credentials.is_scrubbed());
        assert!(credentials.secret().is_empty());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials::new("swordfish".to_string());
        assert_eq!(format!("{:?}", credentials), "Credentials(<redacted>)");
    }

    #[test]
    fn test_state_scrub_without_credentials_is_noop() {
        let mut state = ConnectionState::new(None);
        state.scrub_credentials();
        assert!(!state.has_live_credentials());
    }

    #[test]
    fn test_initial_status_labels() {
        let state = ConnectionState::new(None);
        assert_eq!(state.mouse_state(), "?");
        assert_eq!(state.agent_state(), "?");
        assert_eq!(state.phase(), ConnectionPhase::Idle);
        assert!(state.windows().is_empty());
    }

    #[test]
    fn test_connect_failure_is_terminal() {
        let registry = ConnectionRegistry::new();
        let (backend, peer) = create_loopback_session();
        peer.refuse_next_connect("connection refused");

        let mut connection = Connection::new(&registry, Box::new(backend), &test_config());
        let result = connection.connect();

        assert!(matches!(result, Err(SessionError::ConnectFailed(_))));
        assert!(connection.state().phase().is_terminal());
    }

    #[test]
    fn test_registry_counts_connections() {
        let registry = ConnectionRegistry::new();
        let (backend, _peer) = create_loopback_session();

        let connection = Connection::new(&registry, Box::new(backend), &test_config());
        assert_eq!(registry.active_connections(), 1);

        drop(connection);
        assert_eq!(registry.active_connections(), 0);
    }

    #[test]
    fn test_direct_resize_requires_connection() {
        let registry = ConnectionRegistry::new();
        let (backend, _peer) = create_loopback_session();

        let mut connection = Connection::new(&registry, Box::new(backend), &test_config());
        let result = connection.resize(1024, 768);

        assert!(matches!(
            result,
            Err(ViewportError::Session(SessionError::NotConnected))
        ));
    }

    #[test]
    fn test_disconnect_is_reentrant_safe() {
        let registry = ConnectionRegistry::new();
        let (backend, _peer) = create_loopback_session();

        let mut connection = Connection::new(&registry, Box::new(backend), &test_config());
        connection.connect().unwrap();

        connection.disconnect();
        assert!(connection.state().phase().is_terminal());

        // A second teardown must not trip phase validation
        connection.disconnect();
        assert!(connection.state().phase().is_terminal());
    }
}
