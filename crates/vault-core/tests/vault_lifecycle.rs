//! End-to-end lifecycle tests: setup, authenticate, encrypt/decrypt,
//! rotation with backup, and the status view.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use vault_core::{KeyManager, VaultError};

use tempfile::{tempdir, TempDir};

const PASSWORD: &str = "correctpw123";
const WRONG_PASSWORD: &str = "wrongpw-456";

fn setup_vault() -> (TempDir, KeyManager) {
    let dir = tempdir().expect("tempdir should be available");
    let manager = KeyManager::new(dir.path());
    assert!(manager.setup_first_time(PASSWORD));
    (dir, manager)
}

fn backup_files(keys_dir: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(keys_dir)
        .expect("keys dir should exist")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|name| name.to_string_lossy().starts_with("backup_"))
                .unwrap_or(false)
        })
        .collect()
}

#[test]
fn test_setup_then_authenticate() {
    let (_dir, manager) = setup_vault();

    let status = manager.get_security_status();
    assert!(status.authenticated);
    assert!(status.setup_complete);
    assert_eq!(status.auth_count, 1);
    let days = status.days_until_rotation.expect("keystore exists");
    assert!((29..=30).contains(&days), "expected ~30 days, got {}", days);

    assert!(!manager.authenticate(WRONG_PASSWORD));
    assert_eq!(manager.get_security_status().auth_count, 1);

    assert!(manager.authenticate(PASSWORD));
    assert_eq!(manager.get_security_status().auth_count, 2);
}

#[test]
fn test_authenticate_fresh_process_after_setup() {
    let (dir, manager) = setup_vault();
    drop(manager);

    // A new manager over the same directory starts locked
    let manager = KeyManager::new(dir.path());
    assert!(!manager.get_security_status().authenticated);
    assert!(manager.get_security_status().setup_complete);

    assert!(!manager.authenticate(WRONG_PASSWORD));
    assert!(!manager.get_security_status().authenticated);

    assert!(manager.authenticate(PASSWORD));
    assert!(manager.get_security_status().authenticated);
}

#[test]
fn test_authenticate_without_keystore_provisions() {
    let dir = tempdir().unwrap();
    let manager = KeyManager::new(dir.path());

    assert!(manager.authenticate("freshpw12345"));
    assert!(manager.master_key_path().exists());
    let status = manager.get_security_status();
    assert!(status.setup_complete);
    assert_eq!(status.auth_count, 1);
}

#[test]
fn test_encrypt_decrypt_round_trip() {
    let (_dir, manager) = setup_vault();

    let value = serde_json::json!({"note": "hello"});
    let envelope = manager.encrypt_data(&value).unwrap();
    let decrypted = manager.decrypt_data(&envelope).unwrap();

    assert_eq!(decrypted, value);
}

#[test]
fn test_encrypting_twice_yields_different_envelopes() {
    let (_dir, manager) = setup_vault();

    let value = serde_json::json!({"note": "same plaintext"});
    let envelope1 = manager.encrypt_data(&value).unwrap();
    let envelope2 = manager.encrypt_data(&value).unwrap();

    assert_ne!(envelope1, envelope2);
    assert_eq!(manager.decrypt_data(&envelope1).unwrap(), value);
    assert_eq!(manager.decrypt_data(&envelope2).unwrap(), value);
}

#[test]
fn test_bit_flipped_envelope_fails_decryption() {
    let (_dir, manager) = setup_vault();

    let envelope = manager
        .encrypt_data(&serde_json::json!({"note": "hello"}))
        .unwrap();

    let mut raw = STANDARD.decode(&envelope).unwrap();
    let index = raw.len() / 2;
    raw[index] ^= 0x01;
    let tampered = STANDARD.encode(raw);

    let result = manager.decrypt_data(&tampered);
    assert!(matches!(result, Err(VaultError::DecryptionFailed(_))));
}

#[test]
fn test_garbage_envelope_fails_decryption() {
    let (_dir, manager) = setup_vault();

    assert!(matches!(
        manager.decrypt_data("not base64 at all!"),
        Err(VaultError::DecryptionFailed(_))
    ));
    assert!(matches!(
        manager.decrypt_data(&STANDARD.encode(b"too short")),
        Err(VaultError::DecryptionFailed(_))
    ));
}

#[test]
fn test_auth_count_unaffected_by_failed_attempts() {
    let (_dir, manager) = setup_vault();

    for _ in 0..3 {
        assert!(!manager.authenticate(WRONG_PASSWORD));
    }
    assert_eq!(manager.get_security_status().auth_count, 1);

    assert!(manager.authenticate(PASSWORD));
    assert!(manager.authenticate(PASSWORD));
    assert_eq!(manager.get_security_status().auth_count, 3);
}

#[test]
fn test_rotation_replaces_keystore_and_backs_up() {
    let (_dir, manager) = setup_vault();

    let before_bytes = fs::read(manager.master_key_path()).unwrap();
    let before: serde_json::Value = serde_json::from_slice(&before_bytes).unwrap();

    assert!(manager.rotate_keys(PASSWORD, None));

    let after_bytes = fs::read(manager.master_key_path()).unwrap();
    let after: serde_json::Value = serde_json::from_slice(&after_bytes).unwrap();
    assert_ne!(before["salt"], after["salt"]);
    assert_ne!(
        before["encrypted_private_key"],
        after["encrypted_private_key"]
    );

    // Exactly one backup, byte-for-byte identical to the pre-rotation keystore
    let backups = backup_files(manager.keys_dir());
    assert_eq!(backups.len(), 1);
    assert_eq!(fs::read(&backups[0]).unwrap(), before_bytes);

    // Same password still works after rotation without a new password
    assert!(manager.authenticate(PASSWORD));
}

#[test]
fn test_rotation_with_wrong_password_is_a_noop() {
    let (_dir, manager) = setup_vault();

    let before = fs::read(manager.master_key_path()).unwrap();

    assert!(!manager.rotate_keys(WRONG_PASSWORD, None));

    assert_eq!(fs::read(manager.master_key_path()).unwrap(), before);
    assert!(backup_files(manager.keys_dir()).is_empty());
    assert_eq!(manager.get_security_status().auth_count, 1);
}

#[test]
fn test_rotation_to_new_password() {
    let (_dir, manager) = setup_vault();

    assert!(manager.rotate_keys(PASSWORD, Some("brand-new-pw-789")));

    assert!(!manager.authenticate(PASSWORD));
    assert!(manager.authenticate("brand-new-pw-789"));

    // Encryption works under the rotated key
    let value = serde_json::json!({"note": "post-rotation"});
    let envelope = manager.encrypt_data(&value).unwrap();
    assert_eq!(manager.decrypt_data(&envelope).unwrap(), value);
}

#[test]
fn test_rotation_rejects_weak_new_password() {
    let (_dir, manager) = setup_vault();

    let before = fs::read(manager.master_key_path()).unwrap();

    assert!(!manager.rotate_keys(PASSWORD, Some("weak")));

    assert_eq!(fs::read(manager.master_key_path()).unwrap(), before);
    assert!(backup_files(manager.keys_dir()).is_empty());
    assert!(manager.authenticate(PASSWORD));
}

#[test]
fn test_old_envelopes_unreadable_after_password_rotation() {
    // Rotation protects future writes only; pre-rotation envelopes stay
    // bound to the old salt and password.
    let (_dir, manager) = setup_vault();

    let old_envelope = manager
        .encrypt_data(&serde_json::json!({"note": "before rotation"}))
        .unwrap();

    assert!(manager.rotate_keys(PASSWORD, Some("brand-new-pw-789")));
    assert!(manager.authenticate("brand-new-pw-789"));

    let result = manager.decrypt_data(&old_envelope);
    assert!(matches!(result, Err(VaultError::DecryptionFailed(_))));
}

#[test]
fn test_auth_count_survives_rotation() {
    let (_dir, manager) = setup_vault();
    assert!(manager.authenticate(PASSWORD));
    let count_before = manager.get_security_status().auth_count;

    assert!(manager.rotate_keys(PASSWORD, None));

    let count_after = manager.get_security_status().auth_count;
    assert!(
        count_after > count_before,
        "count went {} -> {}",
        count_before,
        count_after
    );
}

#[test]
fn test_keystore_does_not_contain_plaintext_key_material() {
    let (_dir, manager) = setup_vault();

    let on_disk = fs::read_to_string(manager.master_key_path()).unwrap();
    assert!(!on_disk.contains(PASSWORD));
}

#[cfg(unix)]
#[test]
fn test_persisted_files_are_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, manager) = setup_vault();
    assert!(manager.rotate_keys(PASSWORD, None));

    let mode = |path: &Path| fs::metadata(path).unwrap().permissions().mode() & 0o777;

    assert_eq!(mode(manager.keys_dir()), 0o700);
    assert_eq!(mode(manager.master_key_path()), 0o600);
    assert_eq!(mode(manager.auth_path()), 0o600);
    for backup in backup_files(manager.keys_dir()) {
        assert_eq!(mode(&backup), 0o600);
    }
}
