//! Integration tests for the loopback session pipeline
//!
//! These tests drive a full connection through the in-process backend:
//! channel discovery, monitor reporting, resize orchestration, and
//! teardown, observing the exact command sequences at the peer.

use remote_viewport::config::Config;
use remote_viewport::error::SessionError;
use remote_viewport::proto::loopback::{create_loopback_session, DisplayCommand};
use remote_viewport::proto::{ChannelKind, DisplayGeometry, LifecycleEvent, MonitorInfo};
use remote_viewport::session::{Connection, ConnectionRegistry};

fn manual_config() -> Config {
    let mut config = Config::default();
    config.display.auto_resize = false;
    config
}

/// Discovery, monitor reporting, an explicit resize, and shutdown produce
/// the expected command sequence in order.
#[tokio::test]
async fn test_full_session_resize_flow() {
    let registry = ConnectionRegistry::new();
    let (backend, mut peer) = create_loopback_session();

    let mut connection = Connection::new(&registry, Box::new(backend), &manual_config());
    connection.connect().unwrap();
    let handle = connection.handle();

    // Queue the whole server script; events drain before commands
    peer.announce_channel(0, ChannelKind::Main);
    peer.emit_lifecycle(0, ChannelKind::Main, LifecycleEvent::Opened);
    peer.announce_channel(1, ChannelKind::Display);
    peer.report_monitors(1, vec![MonitorInfo::new(0, 0, 0, 1280, 720)]);

    handle.request_resize(1024, 768).unwrap();
    handle.shutdown().unwrap();

    connection.run().await.unwrap();

    assert!(connection.state().phase().is_terminal());
    assert_eq!(connection.state().main_channel(), Some(0));

    let commands = peer.try_drain_commands();
    assert_eq!(
        commands,
        vec![
            DisplayCommand::ChannelConnect {
                channel_id: 1,
                kind: ChannelKind::Display,
            },
            DisplayCommand::EnableDisplay {
                display_index: 1,
                enabled: true,
                immediate: false,
            },
            DisplayCommand::SetGeometry {
                display_index: 1,
                geometry: DisplayGeometry::at_origin(1024, 768),
                immediate: true,
            },
            DisplayCommand::CommitConfig,
            DisplayCommand::Disconnect,
        ]
    );
}

/// Two identical resize requests produce two identical command sequences.
#[tokio::test]
async fn test_repeated_resize_is_idempotent() {
    let registry = ConnectionRegistry::new();
    let (backend, mut peer) = create_loopback_session();

    let mut connection = Connection::new(&registry, Box::new(backend), &manual_config());
    connection.connect().unwrap();
    let handle = connection.handle();

    peer.announce_channel(0, ChannelKind::Main);
    peer.announce_channel(1, ChannelKind::Display);
    peer.report_monitors(1, vec![MonitorInfo::new(0, 0, 0, 1280, 720)]);

    handle.request_resize(800, 600).unwrap();
    handle.request_resize(800, 600).unwrap();
    handle.shutdown().unwrap();

    connection.run().await.unwrap();

    let commands = peer.try_drain_commands();
    // ChannelConnect, then two identical triples, then Disconnect
    assert_eq!(commands.len(), 8);
    assert_eq!(commands[1..4], commands[4..7]);
    assert_eq!(
        commands[2],
        DisplayCommand::SetGeometry {
            display_index: 1,
            geometry: DisplayGeometry::at_origin(800, 600),
            immediate: true,
        }
    );
}

/// A refused connect surfaces as ConnectFailed and the connection is
/// terminal; the binary maps this to exit code 1.
#[tokio::test]
async fn test_refused_connect_is_fatal() {
    let registry = ConnectionRegistry::new();
    let (backend, peer) = create_loopback_session();
    peer.refuse_next_connect("connection refused");

    let mut connection = Connection::new(&registry, Box::new(backend), &manual_config());
    let result = connection.connect();

    assert!(matches!(result, Err(SessionError::ConnectFailed(_))));
    assert!(connection.state().phase().is_terminal());
}

/// A Closed event on the main channel tears the session down and ends the
/// event loop.
#[tokio::test]
async fn test_main_channel_closed_ends_loop() {
    let registry = ConnectionRegistry::new();
    let (backend, mut peer) = create_loopback_session();

    let mut connection = Connection::new(&registry, Box::new(backend), &manual_config());
    connection.connect().unwrap();

    peer.announce_channel(0, ChannelKind::Main);
    peer.emit_lifecycle(0, ChannelKind::Main, LifecycleEvent::Opened);
    peer.emit_lifecycle(0, ChannelKind::Main, LifecycleEvent::Closed);

    connection.run().await.unwrap();

    assert!(connection.state().phase().is_terminal());
    assert!(!peer.is_client_connected());
    assert_eq!(peer.try_drain_commands(), vec![DisplayCommand::Disconnect]);
}

/// Unknown lifecycle events do not end the loop or touch the table.
#[tokio::test]
async fn test_unknown_event_keeps_session_running() {
    let registry = ConnectionRegistry::new();
    let (backend, mut peer) = create_loopback_session();

    let mut connection = Connection::new(&registry, Box::new(backend), &manual_config());
    connection.connect().unwrap();
    let handle = connection.handle();

    peer.announce_channel(0, ChannelKind::Main);
    peer.announce_channel(1, ChannelKind::Display);
    peer.report_monitors(1, vec![MonitorInfo::new(0, 0, 0, 1280, 720)]);
    peer.emit_lifecycle(0, ChannelKind::Main, LifecycleEvent::Unknown(99));

    handle.shutdown().unwrap();
    connection.run().await.unwrap();

    // The loop ended because of the shutdown command, not the unknown event
    assert_eq!(connection.state().windows().len(), 1);
    let commands = peer.try_drain_commands();
    assert_eq!(
        commands,
        vec![
            DisplayCommand::ChannelConnect {
                channel_id: 1,
                kind: ChannelKind::Display,
            },
            DisplayCommand::Disconnect,
        ]
    );
}

/// The periodic timer applies the configured default geometry to the first
/// occupied slot.
#[tokio::test(start_paused = true)]
async fn test_auto_resize_applies_default_geometry() {
    let registry = ConnectionRegistry::new();
    let (backend, mut peer) = create_loopback_session();
    let config = Config::default();

    let mut connection = Connection::new(&registry, Box::new(backend), &config);
    connection.connect().unwrap();
    let handle = connection.handle();

    peer.announce_channel(0, ChannelKind::Main);
    peer.announce_channel(1, ChannelKind::Display);
    peer.report_monitors(1, vec![MonitorInfo::new(0, 0, 0, 1280, 720)]);

    let loop_task = tokio::spawn(async move {
        connection.run().await.unwrap();
        connection
    });

    assert_eq!(
        peer.recv_command().await.unwrap(),
        DisplayCommand::ChannelConnect {
            channel_id: 1,
            kind: ChannelKind::Display,
        }
    );

    // First tick fires after the configured interval elapses
    assert_eq!(
        peer.recv_command().await.unwrap(),
        DisplayCommand::EnableDisplay {
            display_index: 1,
            enabled: true,
            immediate: false,
        }
    );
    assert_eq!(
        peer.recv_command().await.unwrap(),
        DisplayCommand::SetGeometry {
            display_index: 1,
            geometry: DisplayGeometry::at_origin(1400, 800),
            immediate: true,
        }
    );
    assert_eq!(
        peer.recv_command().await.unwrap(),
        DisplayCommand::CommitConfig
    );

    handle.shutdown().unwrap();
    let connection = loop_task.await.unwrap();
    assert!(connection.state().phase().is_terminal());
}

/// Monitor shrink reports evict the vanished slot and disable its display
/// while the surviving slots stay untouched.
#[tokio::test]
async fn test_monitor_shrink_through_event_loop() {
    let registry = ConnectionRegistry::new();
    let (backend, mut peer) = create_loopback_session();

    let mut connection = Connection::new(&registry, Box::new(backend), &manual_config());
    connection.connect().unwrap();
    let handle = connection.handle();

    let three = vec![
        MonitorInfo::new(0, 0, 0, 1280, 720),
        MonitorInfo::new(1, 1280, 0, 1280, 720),
        MonitorInfo::new(2, 2560, 0, 1280, 720),
    ];
    let two = three[..2].to_vec();

    peer.announce_channel(0, ChannelKind::Main);
    peer.announce_channel(1, ChannelKind::Display);
    peer.report_monitors(1, three);
    peer.report_monitors(1, two);

    handle.shutdown().unwrap();
    connection.run().await.unwrap();

    assert_eq!(connection.state().windows().len(), 2);
    assert!(connection.state().windows().get(1, 0).unwrap().is_some());
    assert!(connection.state().windows().get(1, 1).unwrap().is_some());
    assert!(connection.state().windows().get(1, 2).unwrap().is_none());

    let commands = peer.try_drain_commands();
    assert_eq!(
        commands,
        vec![
            DisplayCommand::ChannelConnect {
                channel_id: 1,
                kind: ChannelKind::Display,
            },
            DisplayCommand::EnableDisplay {
                display_index: 1,
                enabled: false,
                immediate: true,
            },
            DisplayCommand::CommitConfig,
            DisplayCommand::Disconnect,
        ]
    );
}
