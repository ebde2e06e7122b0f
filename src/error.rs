//! Error taxonomy shared by the framing layer and both carrier codecs.

use thiserror::Error;

use crate::crypto::{CompressionError, SymmetricError};

/// Errors that can occur while hiding or extracting a payload.
#[derive(Error, Debug)]
pub enum StegoError {
    /// Bad path, extension, size or parameter, detected before any transform.
    #[error("Invalid carrier: {0}")]
    Validation(String),

    /// The framed stream does not fit in the carrier.
    #[error("Carrier too small: need {needed} bytes, have room for {available}")]
    Capacity { needed: usize, available: usize },

    /// Echo hiding would audibly degrade the carrier.
    #[error("Audio quality below threshold: {psnr:.2} dB < {threshold:.2} dB")]
    Quality { psnr: f64, threshold: f64 },

    /// The carrier was written but would not read back as the framed stream.
    #[error("Embedding failed: {0}")]
    Embedding(String),

    /// CRC32 over the extracted body does not match the embedded one.
    #[error("Checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Integrity { expected: u32, actual: u32 },

    /// Wrong password or tampered ciphertext.
    #[error("Decryption failed: wrong password or corrupted data")]
    Authentication,

    /// Malformed frame header, truncated data or undecodable carrier.
    #[error("Malformed hidden data: {0}")]
    Format(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StegoError>;

impl From<SymmetricError> for StegoError {
    fn from(err: SymmetricError) -> Self {
        match err {
            SymmetricError::EncryptionFailed(msg) => {
                StegoError::Io(std::io::Error::other(format!("encryption failed: {msg}")))
            }
            SymmetricError::DecryptionFailed | SymmetricError::CiphertextTooShort => {
                StegoError::Authentication
            }
        }
    }
}

impl From<CompressionError> for StegoError {
    fn from(err: CompressionError) -> Self {
        StegoError::Format(err.to_string())
    }
}

impl From<serde_json::Error> for StegoError {
    fn from(err: serde_json::Error) -> Self {
        StegoError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decryption_errors_map_to_authentication() {
        let err: StegoError = SymmetricError::DecryptionFailed.into();
        assert!(matches!(err, StegoError::Authentication));

        let err: StegoError = SymmetricError::CiphertextTooShort.into();
        assert!(matches!(err, StegoError::Authentication));
    }

    #[test]
    fn test_compression_errors_map_to_format() {
        let err: StegoError = CompressionError::DecompressionFailed("bad".into()).into();
        assert!(matches!(err, StegoError::Format(_)));
    }

    #[test]
    fn test_display_messages() {
        let err = StegoError::Capacity {
            needed: 1025,
            available: 1024,
        };
        assert_eq!(
            err.to_string(),
            "Carrier too small: need 1025 bytes, have room for 1024"
        );

        let err = StegoError::Integrity {
            expected: 0xdeadbeef,
            actual: 0x1,
        };
        assert_eq!(
            err.to_string(),
            "Checksum mismatch: expected 0xdeadbeef, got 0x00000001"
        );
    }
}
