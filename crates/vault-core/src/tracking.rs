//! Authentication tracking.
//!
//! A small record persisted to `keys/auth.json`, separate from the
//! keystore so a corrupted or rotated keystore does not erase auth
//! history. `auth_count` increases by exactly one per successful
//! authentication and never decreases; it survives key rotation.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fs::write_atomic_owner_only;

/// Persisted authentication history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthTracking {
    /// Timestamp of the most recent successful authentication
    pub last_auth: Option<DateTime<Utc>>,

    /// Number of successful authentications, monotonically increasing
    pub auth_count: u64,

    /// Whether first-time setup has completed
    pub setup_complete: bool,
}

impl AuthTracking {
    /// Record one successful authentication at `now`.
    pub fn record_auth(&mut self, now: DateTime<Utc>) {
        self.auth_count += 1;
        self.last_auth = Some(now);
    }

    /// Load tracking from `path`, or the zeroed default when the file is
    /// missing or unreadable. Tracking is diagnostic, never authoritative.
    pub fn load_or_default(path: &Path) -> Self {
        std::fs::read(path)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    /// Persist tracking to `path` atomically with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic_owner_only(path, &bytes)?;
        Ok(())
    }
}
