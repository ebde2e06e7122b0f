//! Password-based symmetric encryption for framed payloads.
//!
//! - PBKDF2-HMAC-SHA256 (100 000 rounds) derives a 256-bit key from the
//!   password and a fresh 16-byte salt per embed operation
//! - ChaCha20-Poly1305 provides authenticated encryption
//!
//! Output format: salt (16) || nonce (12) || ciphertext (includes 16-byte tag)

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

/// Salt size for key derivation.
pub const SALT_LEN: usize = 16;

/// Nonce size for ChaCha20Poly1305.
pub const NONCE_LEN: usize = 12;

/// Poly1305 authentication tag size.
pub const TAG_LEN: usize = 16;

/// Derived key size.
pub const KEY_LEN: usize = 32;

/// PBKDF2 iteration count.
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Bytes added to a plaintext by [`encrypt_symmetric`].
pub const ENCRYPTION_OVERHEAD: usize = SALT_LEN + NONCE_LEN + TAG_LEN;

/// Errors that can occur during symmetric encryption.
#[derive(Error, Debug)]
pub enum SymmetricError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Invalid ciphertext: too short")]
    CiphertextTooShort,
}

/// Derives a 256-bit key from a password and salt.
fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ROUNDS, &mut *key);
    key
}

/// Encrypts data with a password.
///
/// A fresh salt and nonce are drawn from the OS RNG on every call, so the
/// same plaintext never produces the same output twice.
pub fn encrypt_symmetric(plaintext: &[u8], password: &str) -> Result<Vec<u8>, SymmetricError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(password, &salt);
    let cipher = ChaCha20Poly1305::new_from_slice(&*key)
        .map_err(|e| SymmetricError::EncryptionFailed(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|e| SymmetricError::EncryptionFailed(e.to_string()))?;

    let mut result = Vec::with_capacity(ENCRYPTION_OVERHEAD + plaintext.len());
    result.extend_from_slice(&salt);
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypts data produced by [`encrypt_symmetric`].
pub fn decrypt_symmetric(data: &[u8], password: &str) -> Result<Vec<u8>, SymmetricError> {
    if data.len() < ENCRYPTION_OVERHEAD {
        return Err(SymmetricError::CiphertextTooShort);
    }

    let (salt, rest) = data.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(password, salt);
    let cipher =
        ChaCha20Poly1305::new_from_slice(&*key).map_err(|_| SymmetricError::DecryptionFailed)?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| SymmetricError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let plaintext = b"Hello, stegosaurus!";
        let password = "correct horse";

        let encrypted = encrypt_symmetric(plaintext, password).unwrap();
        assert_eq!(encrypted.len(), plaintext.len() + ENCRYPTION_OVERHEAD);

        let decrypted = decrypt_symmetric(&encrypted, password).unwrap();
        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_wrong_password_fails() {
        let encrypted = encrypt_symmetric(b"Secret data", "correct").unwrap();
        let result = decrypt_symmetric(&encrypted, "wrong");

        assert!(matches!(result, Err(SymmetricError::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let mut encrypted = encrypt_symmetric(b"Secret data", "pw").unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0x01;

        assert!(decrypt_symmetric(&encrypted, "pw").is_err());
    }

    #[test]
    fn test_salt_is_fresh_per_call() {
        let a = encrypt_symmetric(b"same", "pw").unwrap();
        let b = encrypt_symmetric(b"same", "pw").unwrap();

        assert_ne!(a[..SALT_LEN], b[..SALT_LEN]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_empty_plaintext() {
        let encrypted = encrypt_symmetric(b"", "pw").unwrap();
        let decrypted = decrypt_symmetric(&encrypted, "pw").unwrap();

        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_ciphertext_too_short() {
        let result = decrypt_symmetric(&[0u8; 10], "pw");
        assert!(matches!(result, Err(SymmetricError::CiphertextTooShort)));
    }

    #[test]
    fn test_key_derivation_is_deterministic_per_salt() {
        let salt = [7u8; SALT_LEN];
        assert_eq!(*derive_key("pw", &salt), *derive_key("pw", &salt));
        assert_ne!(*derive_key("pw", &salt), *derive_key("pw", &[8u8; SALT_LEN]));
    }
}
