//! RemoteViewport - Lightweight remote-display client
//!
//! This is the main entry point for the RemoteViewport binary. It connects
//! a session over the in-process loopback backend, routes channel events,
//! and resizes the active display on a periodic timer.

use anyhow::Context;
use remote_viewport::config::{Config, ConfigManager};
use remote_viewport::logging::{init_logging, LogLevel};
use remote_viewport::proto::loopback::{create_loopback_session, DisplayCommand, LoopbackPeer};
use remote_viewport::proto::{ChannelKind, LifecycleEvent, MonitorInfo};
use remote_viewport::session::{Connection, ConnectionRegistry};
use tracing::{error, info};

/// Application state
struct App {
    config: Config,
}

impl App {
    /// Initializes the application
    ///
    /// # Errors
    ///
    /// Returns error if initialization fails
    fn initialize() -> anyhow::Result<Self> {
        info!("Initializing RemoteViewport...");

        let config_manager =
            ConfigManager::new().context("could not locate configuration directory")?;
        let config = config_manager
            .load_or_create_default()
            .context("could not load configuration")?;

        info!(
            "Configuration loaded from: {:?}",
            config_manager.config_directory()
        );
        info!(
            "Connection - Target: {}:{}",
            config.connection.host, config.connection.port
        );
        info!(
            "Display - Default geometry: {}x{}",
            config.display.default_width, config.display.default_height
        );
        if config.display.auto_resize {
            info!(
                "Display - Auto resize every {}s",
                config.display.resize_interval_secs
            );
        } else {
            info!("Display - Auto resize: DISABLED");
        }

        Ok(Self { config })
    }

    /// Runs the application
    ///
    /// # Errors
    ///
    /// Returns error if the event loop encounters a fatal error
    async fn run(&self) -> anyhow::Result<()> {
        let registry = ConnectionRegistry::new();
        let (backend, peer) = create_loopback_session();
        let peer_driver = tokio::spawn(drive_demo_peer(peer));

        let mut connection = Connection::new(&registry, Box::new(backend), &self.config);

        if let Err(e) = connection.connect() {
            error!("session connect failed: {}", e);
            std::process::exit(1);
        }
        info!("session connect OK");

        // Ctrl+C marshals a shutdown command into the event loop
        let handle = connection.handle();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
                let _ = handle.shutdown();
            }
        });

        connection.run().await.context("event loop failed")?;

        let _ = peer_driver.await;
        Ok(())
    }
}

/// Drives the loopback peer like a small scripted server
///
/// Announces a main channel and one display channel, reports a single
/// monitor once the client asks the display channel to connect, and logs
/// every display command the client issues.
async fn drive_demo_peer(mut peer: LoopbackPeer) {
    peer.announce_channel(0, ChannelKind::Main);
    peer.emit_lifecycle(0, ChannelKind::Main, LifecycleEvent::Opened);
    peer.announce_channel(0, ChannelKind::Display);
    peer.announce_channel(0, ChannelKind::Inputs);
    peer.announce_channel(0, ChannelKind::Playback);
    peer.set_agent_connected(true);

    while let Some(command) = peer.recv_command().await {
        match command {
            DisplayCommand::ChannelConnect {
                channel_id,
                kind: ChannelKind::Display,
            } => {
                info!("server: display channel #{} connected", channel_id);
                peer.report_monitors(channel_id, vec![MonitorInfo::new(0, 0, 0, 1280, 720)]);
            }
            DisplayCommand::Disconnect => {
                info!("server: client disconnected");
                break;
            }
            other => {
                info!("server: {:?}", other);
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Check for debug mode via environment variable
    let log_level = if std::env::var("RUST_LOG").is_ok() {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    init_logging(log_level);

    info!("Starting RemoteViewport v{}", env!("CARGO_PKG_VERSION"));

    match App::initialize() {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("Application error: {}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    }

    info!("RemoteViewport stopped.");
}
