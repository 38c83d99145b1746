//! Master key derivation using Argon2id.
//!
//! This module derives the symmetric master key from the user's password
//! using the Argon2id algorithm, which is memory-hard and resistant to
//! GPU-based attacks.

use argon2::Argon2;
use zeroize::ZeroizeOnDrop;

use crate::error::{Result, VaultError};

/// Argon2id parameters.
///
/// These values balance security and usability:
/// - Memory: 64 MB (64 * 1024 KB)
/// - Iterations: 3
/// - Parallelism: 1 (single-threaded for simplicity)
///
/// Derivation lands in the tens-to-hundreds of milliseconds range, so
/// offline password guessing is expensive while interactive unlock stays
/// tolerable. Callers should treat derivation as a blocking operation.
const ARGON2_MEMORY_KB: u32 = 64 * 1024;
const ARGON2_ITERATIONS: u32 = 3;
const ARGON2_PARALLELISM: u32 = 1;

/// Length of the derived key in bytes (32 bytes = 256 bits).
pub const KEY_LENGTH: usize = 32;

/// Minimum salt length in bytes.
const MIN_SALT_LENGTH: usize = 16;

/// The symmetric master key derived from the user's password.
///
/// This type ensures that key material is securely zeroized from memory
/// when dropped, reducing the window of exposure. Cloning is allowed so
/// a cipher operation can work on a stable snapshot of the session key.
#[derive(Clone, ZeroizeOnDrop)]
pub struct MasterKey {
    /// The raw key bytes (zeroized on drop)
    key: [u8; KEY_LENGTH],
}

impl MasterKey {
    /// Create a new MasterKey from raw bytes.
    ///
    /// # Security
    ///
    /// The caller is responsible for ensuring the bytes come from a secure source.
    pub(crate) fn from_bytes(bytes: [u8; KEY_LENGTH]) -> Self {
        Self { key: bytes }
    }

    /// Get a reference to the raw key bytes.
    ///
    /// # Security
    ///
    /// Avoid storing or logging this value. Use only for immediate cipher operations.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Derive the master key from a password using Argon2id.
///
/// Deterministic: the same password and salt always produce the same key,
/// which is what makes the stored keystore envelope usable as a password
/// verification oracle.
///
/// # Errors
///
/// Returns `VaultError::InvalidInput` for an empty password or a salt
/// shorter than 16 bytes; `VaultError::Crypto` if derivation itself fails.
pub fn derive_key(password: &str, salt: &[u8]) -> Result<MasterKey> {
    if password.is_empty() {
        return Err(VaultError::InvalidInput(
            "Password cannot be empty".to_string(),
        ));
    }

    if salt.len() < MIN_SALT_LENGTH {
        return Err(VaultError::InvalidInput(format!(
            "Salt must be at least {} bytes",
            MIN_SALT_LENGTH
        )));
    }

    let params = argon2::Params::new(
        ARGON2_MEMORY_KB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(KEY_LENGTH),
    )
    .map_err(|e| VaultError::Crypto(format!("Failed to create Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let mut key_bytes = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key_bytes)
        .map_err(|e| VaultError::Crypto(format!("Key derivation failed: {}", e)))?;

    Ok(MasterKey::from_bytes(key_bytes))
}
