//! RemoteViewport - A lightweight remote-display client glue layer
//!
//! This library provides the session glue for a remote-display client:
//! - Fixed-capacity tracking of (channel, monitor) display windows
//! - Typed routing of session and channel events
//! - Orchestration of display enable/geometry/commit commands
//! - Configuration and logging infrastructure
//!
//! The remote-display protocol stack itself is consumed through the
//! [`proto::SessionBackend`] trait; an in-process loopback backend is
//! provided for demos and tests.
//!
//! # Examples
//!
//! ```no_run
//! use remote_viewport::config::Config;
//! use remote_viewport::proto::loopback::create_loopback_session;
//! use remote_viewport::session::{Connection, ConnectionRegistry};
//!
//! # async fn demo() {
//! let registry = ConnectionRegistry::new();
//! let (backend, _peer) = create_loopback_session();
//!
//! let mut connection = Connection::new(&registry, Box::new(backend), &Config::default());
//! connection.connect().unwrap();
//! connection.run().await.unwrap();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod proto;
pub mod session;

// Re-export commonly used types at crate root
pub use error::{Result, ViewportError};
