//! Session backend surface consumed by the glue layer
//!
//! The remote-display protocol stack (negotiation, channel multiplexing,
//! framing, auth, encryption) lives in an external client library. This
//! module defines the narrow surface this crate consumes from it: a typed
//! event stream plus a handful of fire-and-forget control calls. Completion
//! or failure of a control call arrives later as another event, never as a
//! blocking return.
//!
//! The [`loopback`] submodule provides an in-process implementation used by
//! the demo binary and the test suite.

pub mod loopback;

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;

use crate::error::SessionResult;

/// Capability type of a session channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    /// Main control channel (display enable/geometry/commit commands)
    Main,
    /// Display channel reporting a monitor list
    Display,
    /// Keyboard/mouse input channel
    Inputs,
    /// Audio playback channel
    Playback,
    /// USB redirection channel
    UsbRedirect,
    /// Generic port channel
    Port,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Main => write!(f, "main"),
            ChannelKind::Display => write!(f, "display"),
            ChannelKind::Inputs => write!(f, "inputs"),
            ChannelKind::Playback => write!(f, "playback"),
            ChannelKind::UsbRedirect => write!(f, "usbredir"),
            ChannelKind::Port => write!(f, "port"),
        }
    }
}

/// Connection-lifecycle event reported for a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// Channel successfully opened
    Opened,
    /// Server is switching hosts
    Switching,
    /// Channel closed after a successful open
    Closed,
    /// I/O failure on the channel
    ErrorIo,
    /// TLS negotiation failure
    ErrorTls,
    /// Link-level failure
    ErrorLink,
    /// Connection failure
    ErrorConnect,
    /// Authentication failure
    ErrorAuth,
    /// Event code this client does not recognize
    Unknown(u32),
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Opened => write!(f, "opened"),
            LifecycleEvent::Switching => write!(f, "switching host"),
            LifecycleEvent::Closed => write!(f, "closed"),
            LifecycleEvent::ErrorIo => write!(f, "io error"),
            LifecycleEvent::ErrorTls => write!(f, "tls error"),
            LifecycleEvent::ErrorLink => write!(f, "link error"),
            LifecycleEvent::ErrorConnect => write!(f, "connect error"),
            LifecycleEvent::ErrorAuth => write!(f, "auth error"),
            LifecycleEvent::Unknown(code) => write!(f, "unknown event {}", code),
        }
    }
}

/// Mouse pointer mode reported by the main channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseMode {
    /// Server-side pointer
    Server,
    /// Client-side pointer
    Client,
    /// Mode not reported or not recognized
    Unknown,
}

impl MouseMode {
    /// Status label for this mode
    pub fn label(&self) -> &'static str {
        match self {
            MouseMode::Server => "server",
            MouseMode::Client => "client",
            MouseMode::Unknown => "?",
        }
    }
}

/// One logical display surface reported by a display channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorInfo {
    /// Monitor index within the reporting channel
    pub id: u8,
    /// Horizontal position
    pub x: i32,
    /// Vertical position
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl MonitorInfo {
    /// Creates a monitor description
    pub fn new(id: u8, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            id,
            x,
            y,
            width,
            height,
        }
    }
}

/// Requested geometry for a logical display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayGeometry {
    /// Horizontal origin
    pub x: i32,
    /// Vertical origin
    pub y: i32,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl DisplayGeometry {
    /// Creates a geometry request
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a geometry request at origin (0, 0)
    pub fn at_origin(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// Opaque handle to the session's audio sink
///
/// Holders keep this only as a liveness token; the audio pipeline itself is
/// driven by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioHandle {
    token: u32,
}

impl AudioHandle {
    /// Creates a handle with a backend-assigned token
    pub fn new(token: u32) -> Self {
        Self { token }
    }

    /// Backend-assigned token identifying the audio sink
    pub fn token(&self) -> u32 {
        self.token
    }
}

/// Notification delivered on the session event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new channel was discovered on the session
    ChannelNew {
        /// Channel id within its kind
        channel_id: u8,
        /// Capability type of the channel
        kind: ChannelKind,
    },
    /// A connection-lifecycle event occurred on a channel
    ChannelLifecycle {
        /// Reporting channel id
        channel_id: u8,
        /// Capability type of the reporting channel
        kind: ChannelKind,
        /// The lifecycle event
        event: LifecycleEvent,
    },
    /// A display channel's monitor list changed
    MonitorsChanged {
        /// Reporting display channel id
        channel_id: u8,
        /// Current monitor list
        monitors: Vec<MonitorInfo>,
    },
    /// The main channel's mouse mode changed
    MouseModeChanged {
        /// New mouse mode
        mode: MouseMode,
    },
    /// The agent's presence on the server changed
    AgentPresenceChanged {
        /// Whether the agent is connected
        connected: bool,
    },
}

/// Surface of the external remote-display client library
///
/// All control calls are fire-and-forget from the caller's perspective:
/// completion or failure arrives later as a [`SessionEvent`]. An `Err`
/// return reports only local failures (not connected, channel closed),
/// never a remote outcome.
pub trait SessionBackend: Send {
    /// Sets the remote target. Must be called before [`connect`](Self::connect).
    fn configure_target(&mut self, host: &str, port: u16);

    /// Opens the session
    fn connect(&mut self) -> SessionResult<()>;

    /// Tears the session down. Idempotent.
    fn disconnect(&mut self);

    /// Takes the session event stream. May be called once per session.
    fn take_events(&mut self) -> SessionResult<mpsc::UnboundedReceiver<SessionEvent>>;

    /// Requests that a discovered channel connect
    fn request_channel_connect(&mut self, channel_id: u8, kind: ChannelKind) -> SessionResult<()>;

    /// Acquires the session's audio sink, if the backend provides one
    fn acquire_audio(&mut self) -> Option<AudioHandle>;

    /// Current mouse mode reported by the main channel
    fn mouse_mode(&self) -> MouseMode;

    /// Whether the server-side agent is connected
    fn agent_connected(&self) -> bool;

    /// Underlying error detail for a channel, if the backend recorded one
    fn error_detail(&self, channel_id: u8) -> Option<String>;

    /// Enables or disables a logical display on the main channel
    fn enable_display(&mut self, display_index: u8, enabled: bool, immediate: bool)
        -> SessionResult<()>;

    /// Sets the geometry of a logical display on the main channel
    fn set_display_geometry(
        &mut self,
        display_index: u8,
        geometry: DisplayGeometry,
        immediate: bool,
    ) -> SessionResult<()>;

    /// Commits the pending monitor configuration
    fn commit_monitor_config(&mut self) -> SessionResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_mode_labels() {
        assert_eq!(MouseMode::Server.label(), "server");
        assert_eq!(MouseMode::Client.label(), "client");
        assert_eq!(MouseMode::Unknown.label(), "?");
    }

    #[test]
    fn test_geometry_at_origin() {
        let geometry = DisplayGeometry::at_origin(1400, 800);
        assert_eq!(geometry.x, 0);
        assert_eq!(geometry.y, 0);
        assert_eq!(geometry.width, 1400);
        assert_eq!(geometry.height, 800);
    }

    #[test]
    fn test_lifecycle_event_display() {
        assert_eq!(LifecycleEvent::Opened.to_string(), "opened");
        assert_eq!(LifecycleEvent::Unknown(42).to_string(), "unknown event 42");
    }
}
