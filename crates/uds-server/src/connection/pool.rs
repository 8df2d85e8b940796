//! Connection pool implementation
//!
//! A bounded, ordered registry of live peers. Every operation takes the same
//! mutex, and callers that need to iterate get a copied [`snapshot`] rather
//! than the backing storage, so a broadcast never races an `add`/`remove`.
//!
//! The lock is a plain `std::sync::Mutex`: no operation awaits while holding
//! it, and lookups are linear scans over at most `max_size` entries.
//!
//! [`snapshot`]: ConnectionPool::snapshot

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uds_core::{Connection, PeerIdentity, PoolError};

/// Pool size meaning "no limit"
pub const POOL_SIZE_UNLIMITED: usize = 0;

/// Pool of active peer connections
pub struct ConnectionPool<C: ?Sized> {
    /// Connections in registration order (until a removal swaps one in)
    connections: Mutex<Vec<Arc<C>>>,
    /// Maximum number of entries, or `POOL_SIZE_UNLIMITED`
    max_size: usize,
}

impl<C: Connection + ?Sized> ConnectionPool<C> {
    /// Create a new empty connection pool
    pub fn new(max_size: usize) -> Self {
        Self {
            connections: Mutex::new(Vec::new()),
            max_size,
        }
    }

    /// Create a pool without a size limit
    pub fn unbounded() -> Self {
        Self::new(POOL_SIZE_UNLIMITED)
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Arc<C>>> {
        // Entries stay consistent even if a holder panicked; every critical
        // section is a single push, swap_remove or clone.
        self.connections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a connection
    pub fn add(&self, conn: Arc<C>) -> Result<(), PoolError> {
        let mut entries = self.entries();

        if self.max_size != POOL_SIZE_UNLIMITED && entries.len() >= self.max_size {
            return Err(PoolError::CapacityExceeded { max: self.max_size });
        }

        if entries.iter().any(|c| c.identity() == conn.identity()) {
            return Err(PoolError::DuplicateIdentity(conn.identity().clone()));
        }

        entries.push(conn);
        Ok(())
    }

    /// Remove a connection, matched by identity
    pub fn remove(&self, conn: &C) -> Result<Arc<C>, PoolError> {
        self.remove_by_identity(conn.identity())
    }

    /// Remove the connection with the given identity
    pub fn remove_by_identity(&self, identity: &PeerIdentity) -> Result<Arc<C>, PoolError> {
        let mut entries = self.entries();

        let index = entries
            .iter()
            .position(|c| c.identity() == identity)
            .ok_or_else(|| PoolError::NotFound(identity.clone()))?;

        // Not order sensitive
        Ok(entries.swap_remove(index))
    }

    /// Get a connection by identity
    pub fn get(&self, identity: &PeerIdentity) -> Result<Arc<C>, PoolError> {
        self.entries()
            .iter()
            .find(|c| c.identity() == identity)
            .map(Arc::clone)
            .ok_or_else(|| PoolError::NotFound(identity.clone()))
    }

    /// Point-in-time copy of every registered connection
    pub fn snapshot(&self) -> Vec<Arc<C>> {
        self.entries().clone()
    }

    /// Take every registered connection, leaving the pool empty
    pub fn drain(&self) -> Vec<Arc<C>> {
        std::mem::take(&mut *self.entries())
    }

    /// Identities of every registered connection
    pub fn identities(&self) -> Vec<PeerIdentity> {
        self.entries()
            .iter()
            .map(|c| c.identity().clone())
            .collect()
    }

    /// Number of active connections
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Check if pool is empty
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Configured limit (`POOL_SIZE_UNLIMITED` for none)
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}
