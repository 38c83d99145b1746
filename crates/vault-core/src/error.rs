//! Error types for vault core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; callers map these to
//! user-friendly messages.

use thiserror::Error;

/// Result type alias for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Core error type for vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Wrong key or tampered envelope.
    ///
    /// This is deliberately a single error class: a caller must not be
    /// able to distinguish a wrong password from corrupted ciphertext.
    #[error("Authentication failed")]
    Authentication,

    /// First-time provisioning failed (I/O or key generation)
    #[error("Setup failed: {0}")]
    Setup(String),

    /// Operation attempted before a successful authenticate
    #[error("Not authenticated - call authenticate() first")]
    NotAuthenticated,

    /// Tampered or foreign-key envelope passed to decrypt_data
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Key rotation failed; the pre-rotation keystore is left intact
    #[error("Key rotation failed: {0}")]
    Rotation(String),

    /// Keystore file not found
    #[error("Keystore not found")]
    KeystoreNotFound,

    /// Invalid user input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Key generation or cipher error
    #[error("Crypto error: {0}")]
    Crypto(String),

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}
