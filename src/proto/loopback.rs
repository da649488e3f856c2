//! In-process loopback session backend
//!
//! Provides a [`SessionBackend`] whose remote peer lives in the same
//! process: the peer injects session events and records every outbound
//! control command in order. The demo binary drives it with a small script,
//! and integration tests use it to observe the exact command sequences the
//! glue layer produces.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{SessionError, SessionResult};

use super::{
    AudioHandle, ChannelKind, DisplayGeometry, LifecycleEvent, MonitorInfo, MouseMode,
    SessionBackend, SessionEvent,
};

/// Control command observed by the loopback peer, in issue order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCommand {
    /// A discovered channel was asked to connect
    ChannelConnect {
        /// Channel id
        channel_id: u8,
        /// Capability type
        kind: ChannelKind,
    },
    /// Display enable/disable request
    EnableDisplay {
        /// Logical display index
        display_index: u8,
        /// Requested enabled state
        enabled: bool,
        /// Apply immediately
        immediate: bool,
    },
    /// Display geometry request
    SetGeometry {
        /// Logical display index
        display_index: u8,
        /// Requested geometry
        geometry: DisplayGeometry,
        /// Apply immediately
        immediate: bool,
    },
    /// Monitor configuration commit
    CommitConfig,
    /// Session teardown
    Disconnect,
}

/// State shared between the backend and its peer
#[derive(Debug)]
struct SharedState {
    connected: bool,
    refuse_connect: Option<String>,
    mouse_mode: MouseMode,
    agent_connected: bool,
    error_details: HashMap<u8, String>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            connected: false,
            refuse_connect: None,
            mouse_mode: MouseMode::Server,
            agent_connected: false,
            error_details: HashMap::new(),
        }
    }
}

/// Loopback implementation of [`SessionBackend`]
pub struct LoopbackBackend {
    shared: Arc<Mutex<SharedState>>,
    target: Option<(String, u16)>,
    events: Option<mpsc::UnboundedReceiver<SessionEvent>>,
    commands: mpsc::UnboundedSender<DisplayCommand>,
    next_audio_token: u32,
}

/// The in-process peer driving a [`LoopbackBackend`]
pub struct LoopbackPeer {
    shared: Arc<Mutex<SharedState>>,
    events: mpsc::UnboundedSender<SessionEvent>,
    commands: mpsc::UnboundedReceiver<DisplayCommand>,
}

/// Creates a connected loopback backend/peer pair
pub fn create_loopback_session() -> (LoopbackBackend, LoopbackPeer) {
    let shared = Arc::new(Mutex::new(SharedState::default()));
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    let backend = LoopbackBackend {
        shared: Arc::clone(&shared),
        target: None,
        events: Some(events_rx),
        commands: commands_tx,
        next_audio_token: 1,
    };

    let peer = LoopbackPeer {
        shared,
        events: events_tx,
        commands: commands_rx,
    };

    (backend, peer)
}

impl LoopbackBackend {
    fn record(&self, command: DisplayCommand) -> SessionResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::ChannelClosed)
    }

    fn ensure_connected(&self) -> SessionResult<()> {
        if self.shared.lock().expect("shared state poisoned").connected {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }
}

impl SessionBackend for LoopbackBackend {
    fn configure_target(&mut self, host: &str, port: u16) {
        self.target = Some((host.to_string(), port));
    }

    fn connect(&mut self) -> SessionResult<()> {
        let (host, port) = self
            .target
            .as_ref()
            .ok_or_else(|| SessionError::ConnectFailed("no target configured".to_string()))?;

        let mut shared = self.shared.lock().expect("shared state poisoned");
        if let Some(reason) = shared.refuse_connect.take() {
            return Err(SessionError::ConnectFailed(reason));
        }

        debug!("loopback session connected to {}:{}", host, port);
        shared.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        let mut shared = self.shared.lock().expect("shared state poisoned");
        if !shared.connected {
            return;
        }
        shared.connected = false;
        drop(shared);

        let _ = self.commands.send(DisplayCommand::Disconnect);
        debug!("loopback session disconnected");
    }

    fn take_events(&mut self) -> SessionResult<mpsc::UnboundedReceiver<SessionEvent>> {
        self.events.take().ok_or(SessionError::EventStreamTaken)
    }

    fn request_channel_connect(&mut self, channel_id: u8, kind: ChannelKind) -> SessionResult<()> {
        self.ensure_connected()?;
        self.record(DisplayCommand::ChannelConnect { channel_id, kind })
    }

    fn acquire_audio(&mut self) -> Option<AudioHandle> {
        let handle = AudioHandle::new(self.next_audio_token);
        self.next_audio_token += 1;
        Some(handle)
    }

    fn mouse_mode(&self) -> MouseMode {
        self.shared.lock().expect("shared state poisoned").mouse_mode
    }

    fn agent_connected(&self) -> bool {
        self.shared
            .lock()
            .expect("shared state poisoned")
            .agent_connected
    }

    fn error_detail(&self, channel_id: u8) -> Option<String> {
        self.shared
            .lock()
            .expect("shared state poisoned")
            .error_details
            .get(&channel_id)
            .cloned()
    }

    fn enable_display(
        &mut self,
        display_index: u8,
        enabled: bool,
        immediate: bool,
    ) -> SessionResult<()> {
        self.ensure_connected()?;
        self.record(DisplayCommand::EnableDisplay {
            display_index,
            enabled,
            immediate,
        })
    }

    fn set_display_geometry(
        &mut self,
        display_index: u8,
        geometry: DisplayGeometry,
        immediate: bool,
    ) -> SessionResult<()> {
        self.ensure_connected()?;
        self.record(DisplayCommand::SetGeometry {
            display_index,
            geometry,
            immediate,
        })
    }

    fn commit_monitor_config(&mut self) -> SessionResult<()> {
        self.ensure_connected()?;
        self.record(DisplayCommand::CommitConfig)
    }
}

impl LoopbackPeer {
    /// Makes the next connect attempt fail with the given reason
    pub fn refuse_next_connect(&self, reason: &str) {
        self.shared
            .lock()
            .expect("shared state poisoned")
            .refuse_connect = Some(reason.to_string());
    }

    /// Announces a newly discovered channel to the client
    pub fn announce_channel(&self, channel_id: u8, kind: ChannelKind) {
        let _ = self
            .events
            .send(SessionEvent::ChannelNew { channel_id, kind });
    }

    /// Emits a connection-lifecycle event for a channel
    pub fn emit_lifecycle(&self, channel_id: u8, kind: ChannelKind, event: LifecycleEvent) {
        let _ = self.events.send(SessionEvent::ChannelLifecycle {
            channel_id,
            kind,
            event,
        });
    }

    /// Reports a display channel's current monitor list
    pub fn report_monitors(&self, channel_id: u8, monitors: Vec<MonitorInfo>) {
        let _ = self.events.send(SessionEvent::MonitorsChanged {
            channel_id,
            monitors,
        });
    }

    /// Changes the mouse mode and notifies the client
    pub fn set_mouse_mode(&self, mode: MouseMode) {
        self.shared.lock().expect("shared state poisoned").mouse_mode = mode;
        let _ = self.events.send(SessionEvent::MouseModeChanged { mode });
    }

    /// Changes agent presence and notifies the client
    pub fn set_agent_connected(&self, connected: bool) {
        self.shared
            .lock()
            .expect("shared state poisoned")
            .agent_connected = connected;
        let _ = self
            .events
            .send(SessionEvent::AgentPresenceChanged { connected });
    }

    /// Records an error detail the client can query for a channel
    pub fn set_error_detail(&self, channel_id: u8, detail: &str) {
        self.shared
            .lock()
            .expect("shared state poisoned")
            .error_details
            .insert(channel_id, detail.to_string());
    }

    /// Waits for the next command issued by the client
    pub async fn recv_command(&mut self) -> Option<DisplayCommand> {
        self.commands.recv().await
    }

    /// Drains all commands issued so far without waiting
    pub fn try_drain_commands(&mut self) -> Vec<DisplayCommand> {
        let mut drained = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            drained.push(command);
        }
        drained
    }

    /// Whether the backend currently considers itself connected
    pub fn is_client_connected(&self) -> bool {
        self.shared.lock().expect("shared state poisoned").connected
    }
}
