//! Payload framing.
//!
//! The framed stream is what the carrier codecs actually embed:
//!
//! ```text
//! [4 bytes ] body length N (big-endian u32)
//! [4 bytes ] CRC-32 of the body (audio layout only)
//! [N bytes ] body
//! ```
//!
//! Without a password the body is the raw payload. With a password the body
//! is `salt || nonce || ciphertext`, where the plaintext is first compressed
//! in the image layout. Decoding reads exactly `N` body bytes and ignores
//! whatever trails them (unused blocks or bit-slots of the carrier).

use log::debug;

use crate::crypto::{
    compress, decompress, decrypt_symmetric, encrypt_symmetric, COMPRESSION_OVERHEAD,
    ENCRYPTION_OVERHEAD,
};
use crate::error::{Result, StegoError};

/// Size of the big-endian length header.
pub const LENGTH_HEADER_LEN: usize = 4;

/// Size of the CRC-32 field.
pub const CHECKSUM_LEN: usize = 4;

/// How a carrier family lays out its framed stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Compress the payload before encrypting it.
    pub compress: bool,
    /// Store a CRC-32 of the body after the length header.
    pub checksum: bool,
}

impl FrameLayout {
    /// Image carriers: compress+encrypt with a password, raw bytes otherwise.
    pub const IMAGE: Self = Self {
        compress: true,
        checksum: false,
    };

    /// Audio carriers: encrypt only, always checksummed.
    pub const AUDIO: Self = Self {
        compress: false,
        checksum: true,
    };

    /// Bytes in front of the body.
    pub fn header_len(&self) -> usize {
        LENGTH_HEADER_LEN + if self.checksum { CHECKSUM_LEN } else { 0 }
    }

    /// Fixed bytes a frame adds on top of the payload in the worst case.
    pub fn overhead(&self, encrypted: bool) -> usize {
        let mut overhead = self.header_len();
        if encrypted {
            overhead += ENCRYPTION_OVERHEAD;
            if self.compress {
                overhead += COMPRESSION_OVERHEAD;
            }
        }
        overhead
    }
}

/// Builds the framed stream for a payload.
pub fn frame(payload: &[u8], password: Option<&str>, layout: FrameLayout) -> Result<Vec<u8>> {
    let body = match password {
        None => payload.to_vec(),
        Some(password) => {
            let plaintext = if layout.compress {
                compress(payload)?
            } else {
                payload.to_vec()
            };
            encrypt_symmetric(&plaintext, password)?
        }
    };

    let body_len = u32::try_from(body.len()).map_err(|_| StegoError::Capacity {
        needed: body.len(),
        available: u32::MAX as usize,
    })?;

    let mut stream = Vec::with_capacity(layout.header_len() + body.len());
    stream.extend_from_slice(&body_len.to_be_bytes());
    if layout.checksum {
        stream.extend_from_slice(&crc32fast::hash(&body).to_be_bytes());
    }
    stream.extend_from_slice(&body);

    debug!(
        "Framed {} payload bytes into {} bytes (encrypted: {})",
        payload.len(),
        stream.len(),
        password.is_some()
    );

    Ok(stream)
}

/// Reads the declared body length from the front of a stream.
pub fn declared_len(stream: &[u8]) -> Result<usize> {
    let header: [u8; LENGTH_HEADER_LEN] = stream
        .get(..LENGTH_HEADER_LEN)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or_else(|| {
            StegoError::Format(format!(
                "stream of {} bytes is shorter than the length header",
                stream.len()
            ))
        })?;
    Ok(u32::from_be_bytes(header) as usize)
}

/// Parses a framed stream back into the payload.
pub fn unframe(stream: &[u8], password: Option<&str>, layout: FrameLayout) -> Result<Vec<u8>> {
    let body_len = declared_len(stream)?;
    let header_len = layout.header_len();

    if stream.len() < header_len {
        return Err(StegoError::Format(format!(
            "stream of {} bytes is shorter than the {}-byte header",
            stream.len(),
            header_len
        )));
    }

    let available = stream.len() - header_len;
    if body_len > available {
        return Err(StegoError::Format(format!(
            "declared length {} exceeds the {} bytes available",
            body_len, available
        )));
    }

    let body = &stream[header_len..header_len + body_len];

    if layout.checksum {
        let mut stored = [0u8; CHECKSUM_LEN];
        stored.copy_from_slice(&stream[LENGTH_HEADER_LEN..header_len]);
        let expected = u32::from_be_bytes(stored);
        let actual = crc32fast::hash(body);
        if expected != actual {
            return Err(StegoError::Integrity { expected, actual });
        }
    }

    match password {
        None => Ok(body.to_vec()),
        Some(password) => {
            let plaintext = decrypt_symmetric(body, password)?;
            if layout.compress {
                Ok(decompress(&plaintext)?)
            } else {
                Ok(plaintext)
            }
        }
    }
}
