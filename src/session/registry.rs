//! Connection registry
//!
//! Owns the count of live connections. Constructors take a registry instead
//! of bumping a process-global counter; the ticket decrements the count when
//! the connection is dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Registry tracking live connections
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    active: Arc<AtomicUsize>,
}

impl ConnectionRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live connections
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Registers a new connection, returning its ticket
    pub(crate) fn register(&self) -> ConnectionTicket {
        self.active.fetch_add(1, Ordering::SeqCst);
        ConnectionTicket {
            active: Arc::clone(&self.active),
        }
    }
}

/// Membership ticket held by a live connection
#[derive(Debug)]
pub(crate) struct ConnectionTicket {
    active: Arc<AtomicUsize>,
}

impl Drop for ConnectionTicket {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_drop() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.active_connections(), 0);

        let first = registry.register();
        let second = registry.register();
        assert_eq!(registry.active_connections(), 2);

        drop(first);
        assert_eq!(registry.active_connections(), 1);

        drop(second);
        assert_eq!(registry.active_connections(), 0);
    }

    #[test]
    fn test_clones_share_the_count() {
        let registry = ConnectionRegistry::new();
        let alias = registry.clone();

        let _ticket = registry.register();
        assert_eq!(alias.active_connections(), 1);
    }
}
