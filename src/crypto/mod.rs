//! Cryptographic layer of the framed stream.
//!
//! This module provides:
//! - Password-based symmetric encryption (PBKDF2-SHA256 + ChaCha20Poly1305)
//! - Payload compression (DEFLATE with stored fallback)

pub mod compression;
pub mod symmetric;

pub use compression::{compress, decompress, CompressionError, COMPRESSION_OVERHEAD};
pub use symmetric::{
    decrypt_symmetric, encrypt_symmetric, SymmetricError, ENCRYPTION_OVERHEAD, NONCE_LEN,
    PBKDF2_ROUNDS, SALT_LEN, TAG_LEN,
};
