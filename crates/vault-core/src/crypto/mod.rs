//! Cryptographic operations for the vault.
//!
//! This module provides key derivation and authenticated encryption
//! using well-audited libraries:
//! - **Argon2id**: Memory-hard key derivation from the master password
//! - **XChaCha20-Poly1305**: Authenticated encryption with random nonces
//!
//! ## Security Model
//!
//! - All key material is derived from a password the user alone controls
//! - Derived keys are zeroized from memory on drop
//! - No plaintext passwords or keys are stored or logged
//!
//! ## Threat Model
//!
//! We defend against:
//! - Theft of the encrypted keystore and record ciphertext
//! - Offline brute-force attacks on the password
//! - Tampering with stored ciphertext (authenticated encryption)
//!
//! We do NOT defend against:
//! - Compromised OS / keylogger
//! - Access to an unlocked session / process memory

pub mod cipher;
pub mod key;
pub mod password;

pub use cipher::{open, seal};
pub use key::{derive_key, MasterKey};
pub use password::validate_password;
