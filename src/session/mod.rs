//! Session management
//!
//! Connection ownership, lifecycle phases, channel event routing, and the
//! registry of live connections.

pub mod connection;
pub mod registry;
mod router;
pub mod state;

pub use connection::{
    Connection, ConnectionCommand, ConnectionHandle, ConnectionState, Credentials,
};
pub use registry::ConnectionRegistry;
pub use state::ConnectionPhase;
