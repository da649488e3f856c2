//! Logging infrastructure for RemoteViewport
//!
//! Sets up structured logging using the tracing crate. The default filter
//! can be overridden with the RUST_LOG environment variable.

use tracing_subscriber::{fmt, EnvFilter};

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Trace level - very verbose
    Trace,
    /// Debug level - detailed information
    Debug,
    /// Info level - general information
    Info,
    /// Warn level - warnings
    Warn,
    /// Error level - errors only
    Error,
}

impl LogLevel {
    /// Converts LogLevel to a tracing level filter string
    fn as_filter_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

/// Initializes the logging system
///
/// Sets up a tracing subscriber with the specified default level. The
/// RUST_LOG environment variable takes precedence when set. Repeated calls
/// are harmless: only the first subscriber installation wins, so tests may
/// initialize logging without coordinating.
pub fn init_logging(level: LogLevel) {
    let default_filter = format!("remote_viewport={}", level.as_filter_str());

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .try_init();
}

/// Initializes logging with default settings
pub fn init_default_logging() {
    init_logging(LogLevel::default());
}
