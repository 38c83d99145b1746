//! Keystore record and persistence.
//!
//! One keystore exists per installation, persisted as JSON at
//! `keys/master.key`. It holds the derivation salt, an x25519 keypair
//! whose private half is encrypted under the password-derived master key,
//! and the rotation timestamps.
//!
//! The encrypted private key doubles as the password-verification oracle:
//! it decrypts successfully under the key derived from the stored salt and
//! the correct password, and fails authentication under any other password.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::crypto::cipher;
use crate::crypto::key::MasterKey;
use crate::error::{Result, VaultError};
use crate::fs::{set_owner_only_file, write_atomic_owner_only};

/// Salt length in bytes for password derivation.
pub const SALT_LENGTH: usize = 32;

/// Fixed rotation policy: keys are due for rotation 30 days after creation.
const ROTATION_PERIOD_DAYS: i64 = 30;

/// The persisted keystore record.
///
/// Binary fields are base64-encoded; timestamps serialize as ISO-8601.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyStore {
    /// Derivation salt (base64, 32 random bytes)
    pub salt: String,

    /// Cipher envelope of the x25519 private key under the master key (base64)
    pub encrypted_private_key: String,

    /// The corresponding x25519 public key, stored in clear (base64)
    pub public_key: String,

    /// When this keystore was created
    pub created_at: DateTime<Utc>,

    /// When key rotation becomes due (`created_at` + 30 days)
    pub key_rotation_due: DateTime<Utc>,
}

impl KeyStore {
    /// Build a fresh keystore: generate an x25519 keypair and encrypt the
    /// private half under `master_key`.
    ///
    /// The private key is a latent secondary key; the record encryption
    /// path never exercises it. Its job is password verification.
    pub fn generate(master_key: &MasterKey, salt: &[u8], now: DateTime<Utc>) -> Result<Self> {
        let mut seed = [0u8; 32];
        getrandom::getrandom(&mut seed)
            .map_err(|e| VaultError::Crypto(format!("Failed to generate keypair seed: {}", e)))?;
        let secret = StaticSecret::from(seed);
        seed.zeroize();
        let public = PublicKey::from(&secret);

        let mut secret_bytes = secret.to_bytes();
        let envelope = cipher::seal(master_key, &secret_bytes)?;
        secret_bytes.zeroize();

        Ok(Self {
            salt: STANDARD.encode(salt),
            encrypted_private_key: STANDARD.encode(envelope),
            public_key: STANDARD.encode(public.as_bytes()),
            created_at: now,
            key_rotation_due: now + Duration::days(ROTATION_PERIOD_DAYS),
        })
    }

    /// Decode the stored derivation salt.
    pub fn salt_bytes(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(&self.salt)
            .map_err(|e| VaultError::InvalidInput(format!("Keystore salt is not valid base64: {}", e)))
    }

    /// Check whether `master_key` is the key this keystore was provisioned
    /// with, by attempting to decrypt the stored private-key envelope.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::Authentication` for a wrong key or a corrupted
    /// envelope alike.
    pub fn verify_password(&self, master_key: &MasterKey) -> Result<()> {
        let envelope = STANDARD
            .decode(&self.encrypted_private_key)
            .map_err(|_| VaultError::Authentication)?;
        let mut private_key = cipher::open(master_key, &envelope)?;
        private_key.zeroize();
        Ok(())
    }

    /// True when rotation is due at `now`.
    pub fn rotation_due(&self, now: DateTime<Utc>) -> bool {
        now > self.key_rotation_due
    }

    /// Whole days remaining until rotation is due (negative when overdue).
    pub fn days_until_rotation(&self, now: DateTime<Utc>) -> i64 {
        self.key_rotation_due.signed_duration_since(now).num_days()
    }

    /// Load the keystore from `path`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::KeystoreNotFound` when the file does not exist,
    /// `VaultError::Json` when it cannot be parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::KeystoreNotFound)
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Persist the keystore to `path` atomically with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic_owner_only(path, &bytes)?;
        Ok(())
    }

    /// Copy the current keystore file byte-for-byte to a timestamped backup
    /// in `keys_dir`, with owner-only permissions.
    ///
    /// This is the rollback point taken immediately before rotation
    /// mutates anything: a failed rotation cannot strand the user without
    /// access to the pre-rotation keys.
    pub fn backup(path: &Path, keys_dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
        if !path.exists() {
            return Err(VaultError::KeystoreNotFound);
        }

        let stamp = now.format("%Y%m%d_%H%M%S");
        let mut backup_path = keys_dir.join(format!("backup_{}.key", stamp));
        // Two rotations in the same second get distinct backups
        let mut counter = 1u32;
        while backup_path.exists() {
            backup_path = keys_dir.join(format!("backup_{}_{}.key", stamp, counter));
            counter += 1;
        }

        std::fs::copy(path, &backup_path)?;
        set_owner_only_file(&backup_path)?;
        Ok(backup_path)
    }
}
