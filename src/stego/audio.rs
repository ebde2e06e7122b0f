//! Echo-hiding steganography for audio files.
//!
//! The signal is cut into bit-slots of `2 × delay` samples. For a 1 bit the
//! first half of the slot, scaled by an adaptive gain, is added to the second
//! half as an echo; a 0 bit adds nothing. Extraction correlates the two
//! halves of each slot against a threshold derived from the first half's
//! energy.
//!
//! Multi-channel input is reduced to a channel-mean mono signal; the mixed
//! mono is written back to every channel with the original sample rate, bit
//! depth and sample format.

use std::io::{Cursor, Read, Seek, Write};
use std::ops::Range;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::config::AudioConfig;
use crate::error::{Result, StegoError};
use crate::frame::{frame, unframe, FrameLayout};
use crate::scheduler::{Progress, WorkerPool};
use crate::stego::capacity::{audio_capacity, audio_slots};
use crate::stego::filter::BandPass;

/// Gain is lowered in segments whose RMS exceeds this share of full scale.
const LOUDNESS_CEILING: f64 = 0.8;

/// Keeps the gain finite on silent segments.
const RMS_EPSILON: f64 = 1e-6;

/// Share of the first-half energy a slot's correlation must exceed for a 1.
const DETECTION_RATIO: f64 = 0.5;

/// Audio steganography handler.
#[derive(Clone)]
pub struct AudioStego {
    /// Audio specification (sample rate, channels, etc.)
    spec: WavSpec,
    /// Interleaved samples normalised to [-1, 1]
    samples: Vec<f64>,
}

impl AudioStego {
    /// Creates a new AudioStego from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = WavReader::open(path.as_ref()).map_err(|e| {
            StegoError::Format(format!("cannot decode {}: {}", path.as_ref().display(), e))
        })?;

        Self::from_reader(reader)
    }

    /// Creates a new AudioStego from WAV bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let reader = WavReader::new(Cursor::new(bytes))
            .map_err(|e| StegoError::Format(format!("cannot decode WAV: {e}")))?;

        Self::from_reader(reader)
    }

    /// Creates AudioStego from a WavReader.
    fn from_reader<R: Read + Seek>(reader: WavReader<R>) -> Result<Self> {
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(StegoError::Format("WAV declares zero channels".to_string()));
        }

        let samples = match spec.sample_format {
            SampleFormat::Int => {
                if !(1..=32).contains(&spec.bits_per_sample) {
                    return Err(StegoError::Format(format!(
                        "unsupported bit depth: {}",
                        spec.bits_per_sample
                    )));
                }
                let scale = int_scale(spec.bits_per_sample);
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f64 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .map(|s| s.map(f64::from))
                .collect::<std::result::Result<Vec<_>, _>>(),
        }
        .map_err(|e| StegoError::Format(format!("truncated or corrupt WAV data: {e}")))?;

        Ok(Self { spec, samples })
    }

    /// Returns the number of interleaved channels.
    pub fn channels(&self) -> usize {
        self.spec.channels as usize
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels().max(1)
    }

    /// Returns the duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.spec.sample_rate as f64
    }

    /// Channel-mean mono signal.
    pub fn mono(&self) -> Vec<f64> {
        let channels = self.channels().max(1);
        self.samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f64>() / channels as f64)
            .collect()
    }

    /// Number of bit-slots for the configured delay.
    pub fn slots(&self, config: &AudioConfig) -> usize {
        audio_slots(self.frames(), config.delay)
    }

    /// Largest payload that always fits, in bytes.
    pub fn capacity(&self, config: &AudioConfig, encrypted: bool) -> usize {
        audio_capacity(self.frames(), config.delay, encrypted)
    }

    /// Frames `payload` and embeds it.
    pub fn hide(
        &self,
        payload: &[u8],
        password: Option<&str>,
        config: &AudioConfig,
        pool: &WorkerPool,
        progress: &Progress<'_>,
    ) -> Result<Self> {
        let stream = frame(payload, password, FrameLayout::AUDIO)?;
        self.embed(&stream, config, pool, progress)
    }

    /// Extracts and unframes the hidden payload.
    pub fn extract(
        &self,
        password: Option<&str>,
        config: &AudioConfig,
        pool: &WorkerPool,
        progress: &Progress<'_>,
    ) -> Result<Vec<u8>> {
        let stream = self.read_stream(config, pool, progress)?;
        unframe(&stream, password, FrameLayout::AUDIO)
    }

    /// Embeds an already framed stream, one bit per slot.
    pub fn embed(
        &self,
        stream: &[u8],
        config: &AudioConfig,
        pool: &WorkerPool,
        progress: &Progress<'_>,
    ) -> Result<Self> {
        config.validate()?;
        let slots = self.slots(config);
        if stream.len() * 8 > slots {
            return Err(StegoError::Capacity {
                needed: stream.len(),
                available: slots / 8,
            });
        }

        let mono = self.mono();
        let working = self.working_signal(&mono, config)?;
        let segment_len = self.segment_len(config);
        let gains = segment_gains(&working, segment_len, config.echo_gain);
        let bits = to_bits(stream);

        let chunks = slot_chunks(slots, self.chunk_count(config, pool));
        progress.set_total(chunks.len());

        let shape = EchoShape {
            delay: config.delay,
            segment_len,
        };
        let echoes = pool.map_ordered(chunks, progress, |range| {
            echo_for_chunk(&working, &gains, &bits, range, shape)
        });

        let mut mixed = mono.clone();
        for (sample, echo) in mixed.iter_mut().zip(echoes.into_iter().flatten()) {
            *sample += echo;
        }

        let loudest = peak(&mixed);
        if loudest > 1.0 {
            debug!("Mixed signal peaks at {loudest:.3}, scaling down");
            for sample in mixed.iter_mut() {
                *sample /= loudest;
            }
        }

        let quality = psnr(&mono, &mixed);
        if quality < config.quality_threshold {
            return Err(StegoError::Quality {
                psnr: quality,
                threshold: config.quality_threshold,
            });
        }

        let readback = self.working_signal(&mixed, config)?;
        let misread = self
            .detect_bits(&readback, config, pool, &Progress::silent())
            .iter()
            .zip(&bits)
            .filter(|(read, written)| read != written)
            .count();
        if misread > 0 {
            return Err(StegoError::Embedding(format!(
                "{misread} of {} bits would not read back from this carrier",
                bits.len()
            )));
        }
        debug!(
            "Embedded {} bytes into {} slots, PSNR {:.2} dB",
            stream.len(),
            slots,
            quality
        );

        let channels = self.channels();
        let samples = mixed
            .iter()
            .flat_map(|&s| std::iter::repeat(s).take(channels))
            .collect();

        Ok(Self {
            spec: self.spec,
            samples,
        })
    }

    /// Decodes one bit from every whole slot and packs them MSB-first.
    pub fn read_stream(
        &self,
        config: &AudioConfig,
        pool: &WorkerPool,
        progress: &Progress<'_>,
    ) -> Result<Vec<u8>> {
        config.validate()?;
        let working = self.working_signal(&self.mono(), config)?;
        let bits = self.detect_bits(&working, config, pool, progress);

        debug!("Read {} bits from audio", bits.len());
        Ok(pack_bits(&bits))
    }

    /// One bit per whole slot of `working`, in slot order.
    fn detect_bits(
        &self,
        working: &[f64],
        config: &AudioConfig,
        pool: &WorkerPool,
        progress: &Progress<'_>,
    ) -> Vec<bool> {
        let slots = audio_slots(working.len(), config.delay);
        let chunks = slot_chunks(slots, self.chunk_count(config, pool));
        progress.set_total(chunks.len());

        let delay = config.delay;
        let echo_gain = config.echo_gain;
        pool.map_ordered(chunks, progress, |range| {
            detect_chunk(working, range, delay, echo_gain)
        })
        .into_iter()
        .flatten()
        .collect()
    }

    /// The signal echoes are built from and detected in.
    fn working_signal(&self, mono: &[f64], config: &AudioConfig) -> Result<Vec<f64>> {
        match config.frequency_band {
            Some((low, high)) => Ok(BandPass::new(low, high, self.spec.sample_rate)?.apply(mono)),
            None => Ok(mono.to_vec()),
        }
    }

    fn segment_len(&self, config: &AudioConfig) -> usize {
        let len = self.spec.sample_rate as u64 * config.segment_ms as u64 / 1000;
        (len as usize).max(1)
    }

    fn chunk_count(&self, config: &AudioConfig, pool: &WorkerPool) -> usize {
        if config.threads > 0 {
            config.threads
        } else {
            pool.threads()
        }
    }

    /// Saves the audio to a WAV file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_wav_bytes()?)?;
        Ok(())
    }

    /// Returns the audio as WAV bytes in the original sample format.
    pub fn to_wav_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        {
            let mut writer = WavWriter::new(Cursor::new(&mut bytes), self.spec).map_err(wav_error)?;
            self.write_samples(&mut writer)?;
            writer.finalize().map_err(wav_error)?;
        }
        Ok(bytes)
    }

    fn write_samples<W: Write + Seek>(&self, writer: &mut WavWriter<W>) -> Result<()> {
        match self.spec.sample_format {
            SampleFormat::Int => {
                let scale = int_scale(self.spec.bits_per_sample);
                for &sample in &self.samples {
                    let value = (sample * scale).round().clamp(-scale, scale - 1.0) as i32;
                    writer.write_sample(value).map_err(wav_error)?;
                }
            }
            SampleFormat::Float => {
                for &sample in &self.samples {
                    writer.write_sample(sample as f32).map_err(wav_error)?;
                }
            }
        }
        Ok(())
    }

    /// Returns the audio specification.
    pub fn spec(&self) -> &WavSpec {
        &self.spec
    }

    /// Returns the normalised interleaved samples.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

fn wav_error(err: hound::Error) -> StegoError {
    StegoError::Io(std::io::Error::other(format!("WAV write failed: {err}")))
}

/// Full-scale magnitude of a signed integer sample.
fn int_scale(bits_per_sample: u16) -> f64 {
    (1u64 << (bits_per_sample.saturating_sub(1))) as f64
}

/// Slot geometry shared by every chunk of one embed.
#[derive(Debug, Clone, Copy)]
struct EchoShape {
    delay: usize,
    segment_len: usize,
}

/// Echo gain per analysis segment: `min(g, 0.8·g / (rms + ε))`.
pub fn segment_gains(signal: &[f64], segment_len: usize, echo_gain: f64) -> Vec<f64> {
    signal
        .chunks(segment_len.max(1))
        .map(|segment| {
            let rms = (segment.iter().map(|s| s * s).sum::<f64>() / segment.len() as f64).sqrt();
            echo_gain.min(LOUDNESS_CEILING * echo_gain / (rms + RMS_EPSILON))
        })
        .collect()
}

/// Splits `slots` into at most `count` contiguous, non-empty ranges.
pub fn slot_chunks(slots: usize, count: usize) -> Vec<Range<usize>> {
    if slots == 0 {
        return Vec::new();
    }
    let count = count.clamp(1, slots);
    let size = slots.div_ceil(count);
    (0..slots)
        .step_by(size)
        .map(|start| start..(start + size).min(slots))
        .collect()
}

/// Echo samples covering the slots in `range`.
fn echo_for_chunk(
    working: &[f64],
    gains: &[f64],
    bits: &[bool],
    range: Range<usize>,
    shape: EchoShape,
) -> Vec<f64> {
    let delay = shape.delay;
    let slot_len = 2 * delay;
    let mut echo = vec![0.0; range.len() * slot_len];

    for (k, slot) in range.enumerate() {
        if !bits.get(slot).copied().unwrap_or(false) {
            continue;
        }
        let start = slot * slot_len;
        let gain = gains.get(start / shape.segment_len).copied().unwrap_or(0.0);
        let target = &mut echo[k * slot_len + delay..(k + 1) * slot_len];
        for (out, source) in target.iter_mut().zip(&working[start..start + delay]) {
            *out = gain * source;
        }
    }
    echo
}

/// One bit per slot in `range`.
fn detect_chunk(working: &[f64], range: Range<usize>, delay: usize, echo_gain: f64) -> Vec<bool> {
    let slot_len = 2 * delay;
    range
        .map(|slot| {
            let start = slot * slot_len;
            let head = &working[start..start + delay];
            let tail = &working[start + delay..start + slot_len];
            let corr: f64 = head.iter().zip(tail).map(|(a, b)| a * b).sum();
            let energy: f64 = head.iter().map(|a| a * a).sum();
            corr > energy * echo_gain * DETECTION_RATIO
        })
        .collect()
}

/// Bytes to bits, most significant first.
fn to_bits(bytes: &[u8]) -> Vec<bool> {
    bytes
        .iter()
        .flat_map(|&byte| (0..8).rev().map(move |i| (byte >> i) & 1 == 1))
        .collect()
}

/// Bits to bytes, most significant first; a trailing partial byte is dropped.
fn pack_bits(bits: &[bool]) -> Vec<u8> {
    bits.chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &bit| (acc << 1) | bit as u8))
        .collect()
}

fn peak(signal: &[f64]) -> f64 {
    signal.iter().fold(0.0f64, |max, s| max.max(s.abs()))
}

/// Peak signal-to-noise ratio of `processed` against `original`, in dB.
pub fn psnr(original: &[f64], processed: &[f64]) -> f64 {
    let n = original.len().min(processed.len());
    if n == 0 {
        return f64::INFINITY;
    }
    let mse = original
        .iter()
        .zip(processed)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        / n as f64;
    if mse == 0.0 {
        return f64::INFINITY;
    }
    20.0 * (peak(&original[..n]) / mse.sqrt()).log10()
}

/// Noise bursts in the first half of every slot, silence in the second.
#[cfg(test)]
fn create_test_audio(frames: usize, channels: u16, sample_format: SampleFormat) -> AudioStego {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let spec = WavSpec {
        channels,
        sample_rate: 44100,
        bits_per_sample: if sample_format == SampleFormat::Float { 32 } else { 16 },
        sample_format,
    };

    let slot_len = crate::config::DEFAULT_DELAY * 2;
    let mut rng = StdRng::seed_from_u64(7);
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let s = if i % slot_len < slot_len / 2 {
            rng.gen_range(-0.4..0.4)
        } else {
            0.0
        };
        for c in 0..channels {
            samples.push(if c == 0 { s } else { 0.5 * s });
        }
    }

    AudioStego { spec, samples }
}

/// Hann-windowed 2450 Hz bursts in the first half of every slot, inside the
/// speech band so band-pass filtering leaves them nearly intact.
#[cfg(test)]
fn create_tone_bursts(frames: usize) -> AudioStego {
    use std::f64::consts::PI;

    let spec = WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let delay = crate::config::DEFAULT_DELAY;
    let samples = (0..frames)
        .map(|i| {
            let k = i % (2 * delay);
            if k >= delay {
                return 0.0;
            }
            let window = (PI * (k as f64 + 0.5) / delay as f64).sin().powi(2);
            0.5 * window * (2.0 * PI * 2450.0 * k as f64 / 44100.0).sin()
        })
        .collect();

    AudioStego { spec, samples }
}
