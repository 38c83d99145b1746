//! # Vault Core
//!
//! Core library for Vault - password-derived key management and
//! authenticated encryption for a user's private notes.
//!
//! The user's password is the only way in: a slow, salted derivation
//! turns it into the symmetric master key, a stored keystore envelope
//! verifies it, and every record payload is sealed under the unlocked
//! session key.
//!
//! ## Architecture
//!
//! - **crypto**: Key derivation (Argon2id), authenticated cipher
//!   (XChaCha20-Poly1305), password validation
//! - **keystore**: The persisted `master.key` record and its backups
//! - **tracking**: Persisted auth history (`auth.json`)
//! - **session**: The in-memory unlocked key, never persisted
//! - **manager**: The `KeyManager` orchestrator and its collaborator
//!   surface (setup, authenticate, encrypt, decrypt, rotate, status)

pub mod crypto;
pub mod error;
pub mod fs;
pub mod keystore;
pub mod manager;
pub mod session;
pub mod tracking;

pub use error::{Result, VaultError};
pub use manager::{KeyManager, SecurityStatus};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
