//! Embedding configuration.
//!
//! None of these parameters are stored in the carrier, so extraction must use
//! the same values that were used to hide the payload.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StegoError};

/// Default echo delay in samples (one bit-slot is twice this long).
pub const DEFAULT_DELAY: usize = 64;

/// Default upper bound for the echo gain.
pub const DEFAULT_ECHO_GAIN: f64 = 0.5;

/// Speech band for band-pass embedding (Hz). Off unless configured.
pub const SPEECH_BAND: (f64, f64) = (1000.0, 4000.0);

/// Default minimum PSNR for the mixed audio (dB).
pub const DEFAULT_QUALITY_THRESHOLD: f64 = 15.0;

/// Default size limit for audio carriers (bytes).
pub const DEFAULT_MAX_AUDIO_FILE_SIZE: u64 = 100_000_000;

/// Default analysis segment length for adaptive gain (ms).
pub const DEFAULT_SEGMENT_MS: u32 = 100;

/// Zigzag position used by default: the first AC coefficient.
pub const DEFAULT_ZIGZAG_INDEX: usize = 1;

/// Parameters for the block-DCT image codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Position in the 8×8 zigzag scan whose coefficient carries the byte.
    pub zigzag_index: usize,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            zigzag_index: DEFAULT_ZIGZAG_INDEX,
        }
    }
}

impl ImageConfig {
    /// Returns an error if the zigzag position is outside the block.
    pub fn validate(&self) -> Result<()> {
        if self.zigzag_index >= 64 {
            return Err(StegoError::Config(format!(
                "zigzag_index must be below 64, got {}",
                self.zigzag_index
            )));
        }
        Ok(())
    }
}

/// Parameters for the echo-hiding audio codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Echo delay in samples.
    pub delay: usize,
    /// Maximum echo gain; also scales the extraction threshold.
    pub echo_gain: f64,
    /// Band-pass edges in Hz, or `None` to embed in the full band.
    pub frequency_band: Option<(f64, f64)>,
    /// Minimum PSNR in dB; embedding fails below it.
    pub quality_threshold: f64,
    /// Number of parallel chunks (0 = one per worker thread).
    pub threads: usize,
    /// Largest carrier file accepted, in bytes.
    pub max_file_size: u64,
    /// Length of the RMS analysis segments, in milliseconds.
    pub segment_ms: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            echo_gain: DEFAULT_ECHO_GAIN,
            frequency_band: None,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            threads: 0,
            max_file_size: DEFAULT_MAX_AUDIO_FILE_SIZE,
            segment_ms: DEFAULT_SEGMENT_MS,
        }
    }
}

impl AudioConfig {
    /// Samples in one bit-slot.
    pub fn slot_len(&self) -> usize {
        self.delay * 2
    }

    /// Checks delay, gain, segment length and band edges.
    pub fn validate(&self) -> Result<()> {
        if self.delay == 0 {
            return Err(StegoError::Config("delay must be positive".to_string()));
        }
        if !(self.echo_gain > 0.0 && self.echo_gain <= 1.0) {
            return Err(StegoError::Config(format!(
                "echo_gain must be in (0, 1], got {}",
                self.echo_gain
            )));
        }
        if self.segment_ms == 0 {
            return Err(StegoError::Config("segment_ms must be positive".to_string()));
        }
        if let Some((low, high)) = self.frequency_band {
            if !(low > 0.0 && low < high) {
                return Err(StegoError::Config(format!(
                    "frequency_band must satisfy 0 < low < high, got ({low}, {high})"
                )));
            }
        }
        Ok(())
    }
}

/// Complete codec configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StegoConfig {
    pub image: ImageConfig,
    pub audio: AudioConfig,
}

impl StegoConfig {
    /// Loads a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            StegoError::Config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Parses a configuration from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates both codec sections.
    pub fn validate(&self) -> Result<()> {
        self.image.validate()?;
        self.audio.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StegoConfig::default();
        assert_eq!(config.image.zigzag_index, 1);
        assert_eq!(config.audio.delay, 64);
        assert_eq!(config.audio.slot_len(), 128);
        assert_eq!(config.audio.frequency_band, None);
        assert_eq!(config.audio.quality_threshold, 15.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config =
            StegoConfig::from_json_str(r#"{ "audio": { "delay": 32, "frequency_band": [1000, 4000] } }"#)
                .unwrap();

        assert_eq!(config.audio.delay, 32);
        assert_eq!(config.audio.frequency_band, Some(SPEECH_BAND));
        assert_eq!(config.audio.echo_gain, DEFAULT_ECHO_GAIN);
        assert_eq!(config.image, ImageConfig::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = StegoConfig::default();
        config.audio.threads = 3;
        let json = serde_json::to_string(&config).unwrap();

        assert_eq!(StegoConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            StegoConfig::from_json_str(r#"{ "audio": { "delay": 0 } }"#),
            Err(StegoError::Config(_))
        ));
        assert!(matches!(
            StegoConfig::from_json_str(r#"{ "audio": { "echo_gain": 1.5 } }"#),
            Err(StegoError::Config(_))
        ));
        assert!(matches!(
            StegoConfig::from_json_str(r#"{ "audio": { "frequency_band": [4000.0, 1000.0] } }"#),
            Err(StegoError::Config(_))
        ));
        assert!(matches!(
            StegoConfig::from_json_str(r#"{ "image": { "zigzag_index": 64 } }"#),
            Err(StegoError::Config(_))
        ));
        assert!(matches!(
            StegoConfig::from_json_str("not json"),
            Err(StegoError::Config(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = StegoConfig::from_json_file("/definitely/not/here.json");
        assert!(matches!(result, Err(StegoError::Config(_))));
    }
}
