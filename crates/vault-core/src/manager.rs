//! Key management orchestration.
//!
//! [`KeyManager`] composes key derivation, the authenticated cipher, the
//! persisted keystore, and auth tracking behind the small collaborator
//! surface the rest of the system is allowed to call: setup,
//! authenticate, encrypt, decrypt, rotate, and status. No cryptographic
//! primitive or key material crosses this boundary.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::crypto::cipher;
use crate::crypto::key::derive_key;
use crate::crypto::password::validate_password;
use crate::error::{Result, VaultError};
use crate::fs::ensure_owner_only_dir;
use crate::keystore::{KeyStore, SALT_LENGTH};
use crate::session::Session;
use crate::tracking::AuthTracking;

/// Diagnostic, non-authoritative view of the vault's security state.
///
/// Produced by [`KeyManager::get_security_status`], which never fails:
/// missing or unreadable files are reflected as defaults.
#[derive(Debug, Clone, Serialize)]
pub struct SecurityStatus {
    /// Whether this process currently holds an unlocked session key
    pub authenticated: bool,

    /// Whether first-time setup has completed
    pub setup_complete: bool,

    /// Timestamp of the most recent successful authentication
    pub last_auth: Option<DateTime<Utc>>,

    /// Number of successful authentications so far
    pub auth_count: u64,

    /// When key rotation becomes due, if a keystore exists
    pub key_rotation_due: Option<DateTime<Utc>>,

    /// Whole days until rotation is due (negative when overdue)
    pub days_until_rotation: Option<i64>,
}

/// Orchestrates all key management for one data directory.
///
/// One `KeyManager` instance guards all access to the keystore and auth
/// tracking files for its directory. The session key is interior state
/// behind a mutex, so `&self` methods are safe to call from multiple
/// threads; cipher operations take a snapshot of the key and never hold
/// the lock across an encryption call.
///
/// Multi-process coordination is out of scope: two processes running
/// setup or rotation against the same directory race each other.
pub struct KeyManager {
    keys_dir: PathBuf,
    master_key_file: PathBuf,
    auth_file: PathBuf,
    session: Mutex<Session>,
}

impl KeyManager {
    /// Create a manager for `data_dir`. Key files live under
    /// `<data_dir>/keys/`; nothing is touched until setup or
    /// authentication runs.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let keys_dir = data_dir.as_ref().join("keys");
        Self {
            master_key_file: keys_dir.join("master.key"),
            auth_file: keys_dir.join("auth.json"),
            keys_dir,
            session: Mutex::new(Session::new()),
        }
    }

    /// First-time setup: generate salt and keypair, provision the
    /// keystore, and leave the session authenticated.
    ///
    /// Returns `false` instead of an error on any I/O or crypto failure
    /// so callers can present a clean "setup failed" message; the
    /// underlying cause is logged for operators.
    pub fn setup_first_time(&self, password: &str) -> bool {
        match self.try_setup(password) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "vault setup failed");
                false
            }
        }
    }

    /// Verify `password` against the stored keystore and unlock the
    /// session on success.
    ///
    /// If no keystore exists yet this delegates to setup as a first-run
    /// convenience. A wrong password returns `false` with no state
    /// mutated; so does any I/O failure.
    pub fn authenticate(&self, password: &str) -> bool {
        match self.try_authenticate(password) {
            Ok(()) => true,
            Err(VaultError::Authentication) => {
                tracing::warn!("authentication rejected: wrong password or corrupt keystore");
                false
            }
            Err(err) => {
                tracing::warn!(error = %err, "authentication failed");
                false
            }
        }
    }

    /// Encrypt a structured value under the session key, returning the
    /// envelope as storage-safe base64 text.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::NotAuthenticated` when no session key is
    /// unlocked.
    pub fn encrypt_data(&self, value: &serde_json::Value) -> Result<String> {
        let key = self
            .session()
            .key_snapshot()
            .ok_or(VaultError::NotAuthenticated)?;
        let plaintext = serde_json::to_vec(value)?;
        let envelope = cipher::seal(&key, &plaintext)?;
        Ok(STANDARD.encode(envelope))
    }

    /// Decrypt an envelope produced by [`encrypt_data`](Self::encrypt_data).
    ///
    /// # Errors
    ///
    /// Returns `VaultError::NotAuthenticated` when the session is locked,
    /// `VaultError::DecryptionFailed` for a tampered, truncated, or
    /// foreign-key envelope. Corrupted plaintext is never returned.
    pub fn decrypt_data(&self, envelope: &str) -> Result<serde_json::Value> {
        let key = self
            .session()
            .key_snapshot()
            .ok_or(VaultError::NotAuthenticated)?;
        let bytes = STANDARD.decode(envelope.trim()).map_err(|e| {
            VaultError::DecryptionFailed(format!("Envelope is not valid base64: {}", e))
        })?;
        let plaintext = cipher::open(&key, &bytes)
            .map_err(|_| VaultError::DecryptionFailed("Envelope failed authentication".to_string()))?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            VaultError::DecryptionFailed(format!("Decrypted payload is not valid JSON: {}", e))
        })
    }

    /// Rotate the vault's key material: re-authenticate with
    /// `current_password`, back up the keystore, then re-provision under
    /// `new_password` (or the current one if none is given).
    ///
    /// The backup is taken before any mutation, so a failed rotation
    /// leaves the pre-rotation keystore intact on disk.
    ///
    /// Rotation protects future writes only: envelopes encrypted before
    /// rotation stay bound to the pre-rotation salt and password and can
    /// only be recovered through the backup keystore. Returns `false` on
    /// any failure, with the cause logged.
    pub fn rotate_keys(&self, current_password: &str, new_password: Option<&str>) -> bool {
        match self.try_rotate(current_password, new_password) {
            Ok(backup_path) => {
                tracing::info!(
                    backup = %backup_path.display(),
                    "key rotation complete; previous keystore backed up"
                );
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "key rotation failed");
                false
            }
        }
    }

    /// Report the current security state. Pure read; tolerant of missing
    /// files; never fails.
    pub fn get_security_status(&self) -> SecurityStatus {
        let now = Utc::now();
        let tracking = AuthTracking::load_or_default(&self.auth_file);
        let keystore = KeyStore::load(&self.master_key_file).ok();

        SecurityStatus {
            authenticated: self.session().authenticated(),
            setup_complete: tracking.setup_complete,
            last_auth: tracking.last_auth,
            auth_count: tracking.auth_count,
            key_rotation_due: keystore.as_ref().map(|ks| ks.key_rotation_due),
            days_until_rotation: keystore.as_ref().map(|ks| ks.days_until_rotation(now)),
        }
    }

    /// Explicitly clear the session key. Subsequent encrypt/decrypt calls
    /// fail with `NotAuthenticated` until the next authenticate.
    pub fn lock(&self) {
        self.session().lock();
    }

    /// Path of the persisted keystore file (`keys/master.key`).
    pub fn master_key_path(&self) -> &Path {
        &self.master_key_file
    }

    /// Path of the persisted auth tracking file (`keys/auth.json`).
    pub fn auth_path(&self) -> &Path {
        &self.auth_file
    }

    /// Directory holding key material and backups.
    pub fn keys_dir(&self) -> &Path {
        &self.keys_dir
    }

    fn try_setup(&self, password: &str) -> Result<()> {
        self.provision(password, Utc::now()).map_err(|err| match err {
            VaultError::InvalidInput(_) => err,
            other => VaultError::Setup(other.to_string()),
        })
    }

    /// Generate fresh salt and keypair, write both records, and unlock
    /// the session. Existing auth history is preserved so the counter
    /// survives rotation.
    fn provision(&self, password: &str, now: DateTime<Utc>) -> Result<()> {
        validate_password(password)?;
        ensure_owner_only_dir(&self.keys_dir)?;

        let mut salt = [0u8; SALT_LENGTH];
        getrandom::getrandom(&mut salt)
            .map_err(|e| VaultError::Crypto(format!("Failed to generate salt: {}", e)))?;

        let master_key = derive_key(password, &salt)?;
        let keystore = KeyStore::generate(&master_key, &salt, now)?;
        keystore.save(&self.master_key_file)?;

        let mut tracking = AuthTracking::load_or_default(&self.auth_file);
        tracking.setup_complete = true;
        tracking.record_auth(now);
        tracking.save(&self.auth_file)?;

        self.session().unlock(master_key);
        Ok(())
    }

    fn try_authenticate(&self, password: &str) -> Result<()> {
        if !self.master_key_file.exists() {
            // First-run convenience: provision on the spot.
            tracing::info!("no keystore present; provisioning vault");
            return self.try_setup(password);
        }

        let keystore = KeyStore::load(&self.master_key_file)?;
        let salt = keystore.salt_bytes()?;
        let master_key = derive_key(password, &salt)?;
        keystore.verify_password(&master_key)?;

        let now = Utc::now();
        let mut tracking = AuthTracking::load_or_default(&self.auth_file);
        tracking.setup_complete = true;
        tracking.record_auth(now);
        tracking.save(&self.auth_file)?;

        if keystore.rotation_due(now) {
            tracing::warn!(
                due = %keystore.key_rotation_due,
                "key rotation recommended: keys are over 30 days old"
            );
        }

        self.session().unlock(master_key);
        Ok(())
    }

    fn try_rotate(&self, current_password: &str, new_password: Option<&str>) -> Result<PathBuf> {
        if !self.master_key_file.exists() {
            return Err(VaultError::Rotation("No keystore to rotate".to_string()));
        }

        // Fail fast with no state change on a wrong current password.
        self.try_authenticate(current_password)
            .map_err(|_| VaultError::Rotation("Current password rejected".to_string()))?;

        let next_password = new_password.unwrap_or(current_password);
        validate_password(next_password)
            .map_err(|err| VaultError::Rotation(err.to_string()))?;

        let backup_path = KeyStore::backup(&self.master_key_file, &self.keys_dir, Utc::now())
            .map_err(|err| VaultError::Rotation(format!("Backup failed: {}", err)))?;

        self.provision(next_password, Utc::now())
            .map_err(|err| VaultError::Rotation(err.to_string()))?;

        Ok(backup_path)
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
