//! Channel event router
//!
//! Consumes session events and wires each channel kind to its follow-up
//! action: the main channel feeds status and lifecycle handling, display
//! channels populate the window table as they report monitors, and the
//! remaining kinds either connect immediately or stay inert hooks.

use tracing::{debug, info, warn};

use crate::display::table::{WindowRecord, CHANNEL_MAX, MONITOR_MAX};
use crate::error::Result;
use crate::proto::{ChannelKind, LifecycleEvent, MonitorInfo, SessionBackend, SessionEvent};
use crate::session::connection::{disconnect_session, ConnectionState};

/// Dispatches one session event
///
/// # Errors
///
/// Propagates window table contract violations; those are local logic
/// errors and fail loudly rather than being swallowed.
pub(crate) fn handle_event(
    state: &mut ConnectionState,
    backend: &mut dyn SessionBackend,
    event: SessionEvent,
) -> Result<()> {
    match event {
        SessionEvent::ChannelNew { channel_id, kind } => {
            handle_channel_new(state, backend, channel_id, kind)
        }
        SessionEvent::ChannelLifecycle {
            channel_id,
            kind,
            event,
        } => {
            handle_lifecycle(state, backend, channel_id, kind, event);
            Ok(())
        }
        SessionEvent::MonitorsChanged {
            channel_id,
            monitors,
        } => reconcile_monitors(state, backend, channel_id, &monitors),
        SessionEvent::MouseModeChanged { mode } => {
            state.set_mouse_mode(mode);
            debug!("mouse mode: {}", state.mouse_state());
            Ok(())
        }
        SessionEvent::AgentPresenceChanged { connected } => {
            state.set_agent_connected(connected);
            debug!("agent connected: {}", state.agent_state());
            Ok(())
        }
    }
}

/// Reacts to a newly discovered channel according to its kind
fn handle_channel_new(
    state: &mut ConnectionState,
    backend: &mut dyn SessionBackend,
    channel_id: u8,
    kind: ChannelKind,
) -> Result<()> {
    debug!("new {} channel (#{})", kind, channel_id);

    match kind {
        ChannelKind::Main => {
            if state.main_channel().is_some() {
                warn!("replacing main channel with #{}", channel_id);
            }
            state.set_main_channel(channel_id);

            // Pull current status once; later changes arrive as events
            state.set_mouse_mode(backend.mouse_mode());
            state.set_agent_connected(backend.agent_connected());
        }
        ChannelKind::Display => {
            if channel_id as usize >= CHANNEL_MAX {
                debug!("ignoring display channel #{} beyond capacity", channel_id);
                return Ok(());
            }
            if state.windows().get(channel_id, 0)?.is_some() {
                debug!("display channel #{} already connected", channel_id);
                return Ok(());
            }
            backend.request_channel_connect(channel_id, kind)?;
        }
        ChannelKind::Inputs | ChannelKind::UsbRedirect => {
            // Reserved hooks; nothing to wire up yet
        }
        ChannelKind::Playback => {
            state.set_audio(backend.acquire_audio());
        }
        ChannelKind::Port => {
            backend.request_channel_connect(channel_id, kind)?;
        }
    }

    Ok(())
}

/// Handles a connection-lifecycle event
///
/// Only main-channel events drive the connection; other channels are
/// logged and left alone. Unrecognized event codes are explicitly
/// non-fatal.
fn handle_lifecycle(
    state: &mut ConnectionState,
    backend: &mut dyn SessionBackend,
    channel_id: u8,
    kind: ChannelKind,
    event: LifecycleEvent,
) {
    if kind != ChannelKind::Main {
        debug!("{} channel #{}: {}", kind, channel_id, event);
        return;
    }

    match event {
        LifecycleEvent::Opened => {
            info!("main channel: opened");
        }
        LifecycleEvent::Switching => {
            info!("main channel: switching host");
        }
        LifecycleEvent::Closed => {
            // Only sent if the channel opened successfully before
            info!("main channel: closed");
            disconnect_session(state, backend);
        }
        LifecycleEvent::ErrorIo => {
            warn!("main channel: io error");
            disconnect_session(state, backend);
        }
        LifecycleEvent::ErrorTls | LifecycleEvent::ErrorLink | LifecycleEvent::ErrorConnect => {
            info!("main channel: failed to connect");
            if let Some(detail) = backend.error_detail(channel_id) {
                info!("channel error: {}", detail);
            }
        }
        LifecycleEvent::ErrorAuth => {
            warn!("main channel: auth failure (wrong password?)");
            state.scrub_credentials();
        }
        LifecycleEvent::Unknown(code) => {
            warn!("unknown main channel event: {}", code);
        }
    }
}

/// Reconciles the window table against a display channel's monitor report
///
/// Ensures a record exists for every reported monitor and evicts records
/// for monitors no longer present, disabling the corresponding logical
/// display.
fn reconcile_monitors(
    state: &mut ConnectionState,
    backend: &mut dyn SessionBackend,
    channel_id: u8,
    monitors: &[MonitorInfo],
) -> Result<()> {
    if channel_id as usize >= CHANNEL_MAX {
        warn!("monitor report from channel #{} beyond capacity", channel_id);
        return Ok(());
    }

    let reported = monitors.len().min(MONITOR_MAX);
    if reported < monitors.len() {
        warn!(
            "channel #{} reported {} monitors, tracking first {}",
            channel_id,
            monitors.len(),
            MONITOR_MAX
        );
    }

    for monitor_id in 0..reported as u8 {
        if state.windows().get(channel_id, monitor_id)?.is_none() {
            debug!("add display monitor {}:{}", channel_id, monitor_id);
            state
                .windows_mut()
                .add(WindowRecord::new(channel_id, monitor_id, channel_id))?;
        }
    }

    for monitor_id in reported as u8..MONITOR_MAX as u8 {
        drop_window(state, backend, channel_id, monitor_id)?;
    }

    Ok(())
}

/// Evicts a window slot and disables its logical display
///
/// No-op for an absent slot. The display index follows the original
/// convention: the channel id when it is nonzero, the monitor id otherwise.
fn drop_window(
    state: &mut ConnectionState,
    backend: &mut dyn SessionBackend,
    channel_id: u8,
    monitor_id: u8,
) -> Result<()> {
    let Some(record) = state.windows_mut().remove(channel_id, monitor_id)? else {
        return Ok(());
    };

    debug!("del display monitor {}:{}", channel_id, monitor_id);

    let display_index = if record.channel_id() > 0 {
        record.channel_id()
    } else {
        record.monitor_id()
    };

    if state.main_channel().is_some() {
        backend.enable_display(display_index, false, true)?;
        backend.commit_monitor_config()?;
    } else {
        debug!(
            "no main channel yet, skipping disable of display {}",
            display_index
        );
    }

    Ok(())
}
