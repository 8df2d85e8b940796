//! Core domain types

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Identity of a peer connection, used as its key in the pool
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerIdentity(pub String);

impl PeerIdentity {
    /// Create a new peer identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the identity of an accepted connection
    ///
    /// Client sockets are usually unbound, so every peer would report the
    /// same (empty) address. The accept sequence number keeps them apart.
    pub fn for_accepted(sequence: u64, peer_path: Option<&std::path::Path>) -> Self {
        match peer_path {
            Some(path) => Self(format!("{}#{}", path.display(), sequence)),
            None => Self(format!("peer-{}", sequence)),
        }
    }

    /// Get the raw identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for PeerIdentity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PeerIdentity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of a server listener or client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum LinkState {
    /// Created, not yet listening/connected
    Idle = 0,
    /// Listening (server) or connected (client)
    Open = 1,
    /// Shutdown or disconnect in progress
    Closing = 2,
    /// Fully stopped
    Closed = 3,
}

impl LinkState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Idle,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkState::Idle => write!(f, "idle"),
            LinkState::Open => write!(f, "open"),
            LinkState::Closing => write!(f, "closing"),
            LinkState::Closed => write!(f, "closed"),
        }
    }
}

/// Atomically updated [`LinkState`]
///
/// Every transition is a compare-and-swap, so two racing callers (say an
/// explicit shutdown and a failing accept loop) cannot both win.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    /// Create a cell in the `Idle` state
    pub fn new() -> Self {
        Self(AtomicU8::new(LinkState::Idle as u8))
    }

    /// Current state
    pub fn get(&self) -> LinkState {
        LinkState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`; returns false if the state was not `from`
    pub fn transition(&self, from: LinkState, to: LinkState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditionally set the state
    pub fn set(&self, state: LinkState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Whether the link is open
    pub fn is_open(&self) -> bool {
        self.get() == LinkState::Open
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_identity_for_unnamed_peer() {
        let id = PeerIdentity::for_accepted(3, None);
        assert_eq!(id.as_str(), "peer-3");
    }

    #[test]
    fn test_identity_for_named_peer() {
        let id = PeerIdentity::for_accepted(4, Some(Path::new("/tmp/client.sock")));
        assert_eq!(format!("{}", id), "/tmp/client.sock#4");
    }

    #[test]
    fn test_state_transitions() {
        let cell = StateCell::new();
        assert_eq!(cell.get(), LinkState::Idle);

        assert!(cell.transition(LinkState::Idle, LinkState::Open));
        assert!(cell.is_open());

        // Losing side of a race observes the failed CAS
        assert!(cell.transition(LinkState::Open, LinkState::Closing));
        assert!(!cell.transition(LinkState::Open, LinkState::Closing));

        cell.set(LinkState::Closed);
        assert_eq!(cell.get(), LinkState::Closed);
    }

    #[test]
    fn test_link_state_display() {
        assert_eq!(format!("{}", LinkState::Open), "open");
        assert_eq!(format!("{}", LinkState::Closing), "closing");
    }
}
