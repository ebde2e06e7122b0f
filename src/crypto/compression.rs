//! Payload compression for the image framing layout.
//!
//! Uses DEFLATE at the best level. The first byte is a marker so data that
//! does not shrink is stored verbatim, which bounds the growth to one byte.

use flate2::read::{DeflateDecoder, DeflateEncoder};
use flate2::Compression;
use std::io::Read;
use thiserror::Error;

/// Marker: body stored verbatim.
const MARKER_STORED: u8 = 0;

/// Marker: body is a raw DEFLATE stream.
const MARKER_DEFLATE: u8 = 1;

/// Worst-case growth of [`compress`] over its input.
pub const COMPRESSION_OVERHEAD: usize = 1;

/// Compression errors.
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Decompression failed: {0}")]
    DecompressionFailed(String),
}

/// Compresses data using DEFLATE.
///
/// Falls back to a stored body when compression does not reduce the size.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    if data.is_empty() {
        return Ok(vec![MARKER_STORED]);
    }

    let mut encoder = DeflateEncoder::new(data, Compression::best());
    let mut compressed = Vec::new();

    encoder
        .read_to_end(&mut compressed)
        .map_err(|e| CompressionError::CompressionFailed(e.to_string()))?;

    let (marker, body) = if compressed.len() < data.len() {
        (MARKER_DEFLATE, compressed.as_slice())
    } else {
        (MARKER_STORED, data)
    };

    let mut result = Vec::with_capacity(body.len() + 1);
    result.push(marker);
    result.extend_from_slice(body);
    Ok(result)
}

/// Decompresses data produced by [`compress`].
pub fn decompress(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let (&marker, payload) = data
        .split_first()
        .ok_or_else(|| CompressionError::DecompressionFailed("Empty data".to_string()))?;

    match marker {
        MARKER_STORED => Ok(payload.to_vec()),
        MARKER_DEFLATE => {
            let mut decoder = DeflateDecoder::new(payload);
            let mut decompressed = Vec::new();

            decoder
                .read_to_end(&mut decompressed)
                .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;

            Ok(decompressed)
        }
        other => Err(CompressionError::DecompressionFailed(format!(
            "Invalid marker byte: {}",
            other
        ))),
    }
}
