//! Error types for RemoteViewport
//!
//! This module defines all error types used throughout the application.
//! Single source of truth for errors, with one category enum per subsystem
//! and a top-level error that aggregates them.

use std::io;
use thiserror::Error;

/// Main error type for the RemoteViewport application
#[derive(Error, Debug)]
pub enum ViewportError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Session-related errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Window table contract violations
    #[error("Window table error: {0}")]
    Table(#[from] TableError),

    /// Display control errors
    #[error("Display error: {0}")]
    Display(#[from] DisplayError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Configuration directory not found: {0}")]
    DirectoryNotFound(String),

    #[error("Failed to create configuration directory: {0}")]
    DirectoryCreationFailed(String),
}

/// Session-related errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to connect session: {0}")]
    ConnectFailed(String),

    #[error("Session is not connected")]
    NotConnected,

    #[error("Session event stream already taken")]
    EventStreamTaken,

    #[error("Session channel closed")]
    ChannelClosed,

    #[error("Invalid phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },
}

/// Window table contract violations
///
/// These indicate programming errors in table access and are surfaced
/// immediately to the caller rather than silently ignored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("Window index out of bounds: channel {channel_id}, monitor {monitor_id}")]
    InvalidIndex { channel_id: u8, monitor_id: u8 },

    #[error("Window slot already occupied: channel {channel_id}, monitor {monitor_id}")]
    SlotOccupied { channel_id: u8, monitor_id: u8 },
}

/// Display control errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    #[error("No active display window to resize")]
    NoActiveDisplay,

    #[error("No main control channel discovered yet")]
    NoMainChannel,
}

/// Type alias for Results using ViewportError
pub type Result<T> = std::result::Result<T, ViewportError>;

/// Type alias for Config Results
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Type alias for Session Results
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Type alias for Table Results
pub type TableResult<T> = std::result::Result<T, TableError>;

/// Type alias for Display Results
pub type DisplayResult<T> = std::result::Result<T, DisplayError>;

impl From<toml::de::Error> for ViewportError {
    fn from(err: toml::de::Error) -> Self {
        ViewportError::Config(ConfigError::LoadFailed(err.to_string()))
    }
}

impl From<toml::ser::Error> for ViewportError {
    fn from(err: toml::ser::Error) -> Self {
        ViewportError::Config(ConfigError::SaveFailed(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = TableError::InvalidIndex {
            channel_id: 7,
            monitor_id: 1,
        };
        assert_eq!(
            error.to_string(),
            "Window index out of bounds: channel 7, monitor 1"
        );

        let error = DisplayError::NoActiveDisplay;
        assert_eq!(error.to_string(), "No active display window to resize");
    }

    #[test]
    fn test_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let viewport_error: ViewportError = io_error.into();
        assert!(matches!(viewport_error, ViewportError::Io(_)));

        let table_error = TableError::SlotOccupied {
            channel_id: 1,
            monitor_id: 2,
        };
        let viewport_error: ViewportError = table_error.into();
        assert!(matches!(viewport_error, ViewportError::Table(_)));
    }
}
