//! Concurrent mapping from session identifier to transport handle.

use std::sync::Arc;

use dashmap::DashMap;

use crate::session::{SessionHandle, SessionId};

/// Registry of open SSE sessions.
///
/// A handle is present exactly while its connection is open or closing but
/// not yet deregistered. Entries are inserted only by the connection
/// endpoint; they are removed by the session's disconnect guard or by the
/// lifecycle coordinator during shutdown, whichever fires first. Every
/// operation is synchronous: no mutation spans a suspension point.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<SessionHandle>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Inserts a handle under its own identifier, replacing any previous
    /// entry. Identifiers are generated per connection, so a replacement is
    /// not expected in practice.
    pub fn put(&self, handle: Arc<SessionHandle>) {
        self.sessions.insert(handle.id().clone(), handle);
    }

    /// Looks up a handle without side effects.
    pub fn get(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Removes an entry if present. Removing an absent identifier is a
    /// no-op, which lets the disconnect guard and shutdown race safely.
    pub fn remove(&self, id: &SessionId) -> Option<Arc<SessionHandle>> {
        self.sessions.remove(id).map(|(_, handle)| handle)
    }

    /// Clones the current set of handles. The snapshot is unaffected by
    /// concurrent insertion or removal, which makes it the safe iteration
    /// base for shutdown draining.
    pub fn snapshot(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.sessions.clear();
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
