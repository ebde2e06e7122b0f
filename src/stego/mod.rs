//! Steganography module for hiding data in image and audio carriers.
//!
//! Supports:
//! - Block-DCT embedding in images (PNG, JPEG, BMP in; PNG out)
//! - Echo hiding in audio (WAV)
//!
//! [`Stego`] is the caller-facing entry point: it validates the carrier,
//! dispatches on its kind, and writes the result to a fresh file only after
//! every check has passed.

pub mod audio;
pub mod capacity;
pub mod dct;
pub mod filter;
pub mod image;
pub mod validate;

pub use audio::AudioStego;
pub use self::image::ImageStego;
pub use validate::{fresh_output_path, CarrierKind};

use std::path::{Path, PathBuf};

use log::info;

use crate::config::StegoConfig;
use crate::error::{Result, StegoError};
use crate::scheduler::{Progress, ProgressSink, WorkerPool};
use validate::{ensure_distinct_output, validate_carrier};

/// Hides and extracts payloads with one configuration and one worker pool.
pub struct Stego {
    config: StegoConfig,
    pool: WorkerPool,
}

impl Stego {
    /// Creates a codec with a pool sized to the available CPUs.
    pub fn new(config: StegoConfig) -> Result<Self> {
        Self::with_pool(config, WorkerPool::with_available_parallelism()?)
    }

    /// Creates a codec that runs on the given pool.
    pub fn with_pool(config: StegoConfig, pool: WorkerPool) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, pool })
    }

    /// Returns the embedding configuration.
    pub fn config(&self) -> &StegoConfig {
        &self.config
    }

    /// Returns the worker pool.
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Hides `payload` in `carrier` and writes the result next to it as
    /// `<stem>_hidden.<ext>`. Returns the path written.
    pub fn hide(
        &self,
        carrier: &Path,
        payload: &[u8],
        password: Option<&str>,
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<PathBuf> {
        let kind = CarrierKind::from_path(carrier)?;
        let output = fresh_output_path(carrier, kind.output_extension());
        self.hide_to(carrier, &output, payload, password, progress)
    }

    /// Hides `payload` in `carrier` and writes the result to `output`.
    pub fn hide_to(
        &self,
        carrier: &Path,
        output: &Path,
        payload: &[u8],
        password: Option<&str>,
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<PathBuf> {
        let kind = self.validate(carrier)?;
        ensure_distinct_output(carrier, output)?;
        if !kind.is_output_path(output) {
            return Err(StegoError::Validation(format!(
                "output {} must be a .{} file",
                output.display(),
                kind.output_extension()
            )));
        }

        let progress = Progress::new(progress);
        let bytes = match kind {
            CarrierKind::Image => ImageStego::from_file(carrier)?
                .hide(payload, password, &self.config.image, &self.pool, &progress)?
                .to_png_bytes()?,
            CarrierKind::Audio => AudioStego::from_file(carrier)?
                .hide(payload, password, &self.config.audio, &self.pool, &progress)?
                .to_wav_bytes()?,
        };

        std::fs::write(output, bytes)?;
        progress.finish();

        info!(
            "Hid {} bytes in {} (encrypted: {})",
            payload.len(),
            output.display(),
            password.is_some()
        );
        Ok(output.to_path_buf())
    }

    /// Recovers the payload hidden in `carrier`.
    pub fn extract(
        &self,
        carrier: &Path,
        password: Option<&str>,
        progress: Option<&ProgressSink<'_>>,
    ) -> Result<Vec<u8>> {
        let kind = self.validate(carrier)?;

        let progress = Progress::new(progress);
        let payload = match kind {
            CarrierKind::Image => ImageStego::from_file(carrier)?.extract(
                password,
                &self.config.image,
                &self.pool,
                &progress,
            )?,
            CarrierKind::Audio => AudioStego::from_file(carrier)?.extract(
                password,
                &self.config.audio,
                &self.pool,
                &progress,
            )?,
        };
        progress.finish();

        info!("Extracted {} bytes from {}", payload.len(), carrier.display());
        Ok(payload)
    }

    /// Largest payload `carrier` can hold.
    pub fn capacity(&self, carrier: &Path, encrypted: bool) -> Result<usize> {
        match self.validate(carrier)? {
            CarrierKind::Image => Ok(ImageStego::from_file(carrier)?.capacity(encrypted)),
            CarrierKind::Audio => {
                Ok(AudioStego::from_file(carrier)?.capacity(&self.config.audio, encrypted))
            }
        }
    }

    fn validate(&self, carrier: &Path) -> Result<CarrierKind> {
        let kind = CarrierKind::from_path(carrier)?;
        let max_size = match kind {
            CarrierKind::Image => None,
            CarrierKind::Audio => Some(self.config.audio.max_file_size),
        };
        validate_carrier(carrier, kind, max_size)?;
        Ok(kind)
    }
}

/// Hides `payload` with the default configuration. Returns the output path.
pub fn hide<P: AsRef<Path>>(carrier: P, payload: &[u8], password: Option<&str>) -> Result<PathBuf> {
    Stego::new(StegoConfig::default())?.hide(carrier.as_ref(), payload, password, None)
}

/// Extracts a payload with the default configuration.
pub fn extract<P: AsRef<Path>>(carrier: P, password: Option<&str>) -> Result<Vec<u8>> {
    Stego::new(StegoConfig::default())?.extract(carrier.as_ref(), password, None)
}
