//! In-memory session state.
//!
//! The session holds the master key unlocked by the last successful
//! authentication. It lives for the process lifetime at most, is never
//! persisted, and never appears in logs.

use crate::crypto::key::MasterKey;

/// Per-process session: the currently unlocked master key, or none.
#[derive(Default)]
pub struct Session {
    active_key: Option<MasterKey>,
}

impl Session {
    /// Create a locked session.
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff a master key is currently unlocked.
    pub fn authenticated(&self) -> bool {
        self.active_key.is_some()
    }

    /// Install `key` as the active session key.
    pub fn unlock(&mut self, key: MasterKey) {
        self.active_key = Some(key);
    }

    /// Clear the active key. The `MasterKey` zeroizes itself on drop.
    pub fn lock(&mut self) {
        self.active_key = None;
    }

    /// Clone the active key so one cipher operation can work on a stable
    /// key even if a concurrent rotation swaps the session out underneath.
    pub fn key_snapshot(&self) -> Option<MasterKey> {
        self.active_key.clone()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.authenticated())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::key::derive_key;

    fn test_key() -> MasterKey {
        derive_key("session-test-password", b"session-salt-1234567890").unwrap()
    }

    #[test]
    fn test_starts_locked() {
        let session = Session::new();
        assert!(!session.authenticated());
        assert!(session.key_snapshot().is_none());
    }

    #[test]
    fn test_unlock_then_lock() {
        let mut session = Session::new();
        session.unlock(test_key());
        assert!(session.authenticated());
        assert!(session.key_snapshot().is_some());

        session.lock();
        assert!(!session.authenticated());
        assert!(session.key_snapshot().is_none());
    }

    #[test]
    fn test_snapshot_survives_lock() {
        let mut session = Session::new();
        session.unlock(test_key());

        let snapshot = session.key_snapshot().unwrap();
        session.lock();

        // The snapshot is an independent clone
        assert_eq!(snapshot.as_bytes(), test_key().as_bytes());
    }

    #[test]
    fn test_debug_never_shows_key() {
        let mut session = Session::new();
        session.unlock(test_key());

        let output = format!("{:?}", session);
        assert!(output.contains("authenticated"));
        let key_hex = hex::encode(&test_key().as_bytes()[..4]);
        assert!(!output.contains(&key_hex));
    }
}
