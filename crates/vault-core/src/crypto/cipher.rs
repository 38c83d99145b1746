//! Authenticated encryption envelopes using XChaCha20-Poly1305.
//!
//! Every envelope is self-contained: a fresh 24-byte random nonce followed
//! by the ciphertext and its 16-byte Poly1305 tag. Nothing outside the
//! envelope is needed to decrypt it except the right key, and encrypting
//! the same plaintext twice yields different envelopes.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};

use crate::crypto::key::MasterKey;
use crate::error::{Result, VaultError};

/// XChaCha20 nonce size (24 bytes, safe for random generation).
const NONCE_LENGTH: usize = 24;

/// Poly1305 tag size (16 bytes, regardless of the message or key size).
const TAG_LENGTH: usize = 16;

/// Encrypt a payload into a self-contained envelope.
///
/// A fresh random nonce is generated per call, so encryption is
/// non-deterministic. This is load-bearing: password verification relies
/// on re-decrypting a stored envelope, and a deterministic scheme would
/// leak information across rotations.
///
/// # Errors
///
/// Returns `VaultError::Crypto` if nonce generation or encryption fails.
pub fn seal(key: &MasterKey, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LENGTH];
    getrandom::getrandom(&mut nonce)
        .map_err(|e| VaultError::Crypto(format!("Failed to generate nonce: {}", e)))?;

    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    let ciphertext = cipher
        .encrypt(XNonce::from_slice(&nonce), plaintext)
        .map_err(|_| VaultError::Crypto("Encryption failed".to_string()))?;

    let mut envelope = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(envelope)
}

/// Decrypt an envelope produced by [`seal`].
///
/// # Errors
///
/// Returns `VaultError::Authentication` when the key is wrong, the
/// envelope is truncated, or the ciphertext has been tampered with.
/// All three cases surface as the same error so callers cannot be used
/// as an oracle distinguishing them.
pub fn open(key: &MasterKey, envelope: &[u8]) -> Result<Vec<u8>> {
    if envelope.len() < NONCE_LENGTH + TAG_LENGTH {
        return Err(VaultError::Authentication);
    }

    let (nonce, ciphertext) = envelope.split_at(NONCE_LENGTH);
    let cipher = XChaCha20Poly1305::new(key.as_bytes().into());
    cipher
        .decrypt(XNonce::from_slice(nonce), ciphertext)
        .map_err(|_| VaultError::Authentication)
}
