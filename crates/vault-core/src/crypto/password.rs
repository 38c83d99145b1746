//! Password validation.
//!
//! Enforces minimum security requirements for master passwords. Applied
//! at setup and rotation only; authenticate accepts whatever password the
//! vault was provisioned with.

use crate::error::{Result, VaultError};

/// Minimum password length in characters.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Validate a password meets minimum security requirements.
///
/// # Requirements
///
/// - At least 8 characters long
/// - Not empty or only whitespace
///
/// # Returns
///
/// Returns `Ok(())` if valid, or `VaultError::InvalidInput` with explanation.
pub fn validate_password(password: &str) -> Result<()> {
    if password.trim().is_empty() {
        return Err(VaultError::InvalidInput(
            "Password cannot be empty".to_string(),
        ));
    }

    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(VaultError::InvalidInput(format!(
            "Password must be at least {} characters (got {})",
            MIN_PASSWORD_LENGTH,
            password.len()
        )));
    }

    Ok(())
}
