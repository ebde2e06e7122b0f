//! Zero-phase Butterworth band-pass filter.
//!
//! The band is a 4th-order high-pass at the lower edge cascaded with a
//! 4th-order low-pass at the upper edge, each built from two biquads.
//! The cascade runs forward and then backward over the signal so the
//! result has no phase shift, which keeps bit-slot windows aligned.

use crate::error::{Result, StegoError};

/// Q factors of the two sections of a 4th-order Butterworth response.
const BUTTERWORTH_Q: [f64; 2] = [0.541_196_100_146_197, 1.306_562_964_876_376_5];

/// Samples of odd-symmetric padding added on each side before filtering.
const EDGE_PAD: usize = 27;

#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Biquad {
    fn low_pass(cutoff: f64, sample_rate: f64, q: f64) -> Self {
        let (cos_w, alpha) = Self::prewarp(cutoff, sample_rate, q);
        Self::normalized(
            (1.0 - cos_w) / 2.0,
            1.0 - cos_w,
            (1.0 - cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    fn high_pass(cutoff: f64, sample_rate: f64, q: f64) -> Self {
        let (cos_w, alpha) = Self::prewarp(cutoff, sample_rate, q);
        Self::normalized(
            (1.0 + cos_w) / 2.0,
            -(1.0 + cos_w),
            (1.0 + cos_w) / 2.0,
            1.0 + alpha,
            -2.0 * cos_w,
            1.0 - alpha,
        )
    }

    fn prewarp(cutoff: f64, sample_rate: f64, q: f64) -> (f64, f64) {
        let w0 = 2.0 * std::f64::consts::PI * cutoff / sample_rate;
        (w0.cos(), w0.sin() / (2.0 * q))
    }

    fn normalized(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Transposed direct form II, in place.
    fn run(&self, signal: &mut [f64]) {
        let (mut z1, mut z2) = (0.0, 0.0);
        for x in signal.iter_mut() {
            let input = *x;
            let output = self.b0 * input + z1;
            z1 = self.b1 * input - self.a1 * output + z2;
            z2 = self.b2 * input - self.a2 * output;
            *x = output;
        }
    }
}

/// Band-pass filter for one `(low, high)` band at one sample rate.
#[derive(Debug, Clone)]
pub struct BandPass {
    sections: Vec<Biquad>,
}

impl BandPass {
    /// Designs the filter. Requires `0 < low < high < sample_rate / 2`.
    pub fn new(low: f64, high: f64, sample_rate: u32) -> Result<Self> {
        let fs = sample_rate as f64;
        let nyquist = fs / 2.0;
        if !(low > 0.0 && low < high && high < nyquist) {
            return Err(StegoError::Validation(format!(
                "frequency band ({low} Hz, {high} Hz) must lie inside (0, {nyquist} Hz)"
            )));
        }

        let mut sections = Vec::with_capacity(4);
        for q in BUTTERWORTH_Q {
            sections.push(Biquad::high_pass(low, fs, q));
        }
        for q in BUTTERWORTH_Q {
            sections.push(Biquad::low_pass(high, fs, q));
        }
        Ok(Self { sections })
    }

    fn run_once(&self, signal: &mut [f64]) {
        for section in &self.sections {
            section.run(signal);
        }
    }

    /// Filters the signal forward and backward.
    pub fn apply(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n < 2 {
            return signal.to_vec();
        }

        let pad = EDGE_PAD.min(n - 1);
        let (first, last) = (signal[0], signal[n - 1]);

        let mut work = Vec::with_capacity(n + 2 * pad);
        work.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        work.extend_from_slice(signal);
        work.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        self.run_once(&mut work);
        work.reverse();
        self.run_once(&mut work);
        work.reverse();

        work[pad..pad + n].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: u32 = 44_100;

    fn sine(freq: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / FS as f64).sin())
            .collect()
    }

    /// RMS over the middle half, away from edge transients.
    fn mid_rms(signal: &[f64]) -> f64 {
        let (start, end) = (signal.len() / 4, 3 * signal.len() / 4);
        let slice = &signal[start..end];
        (slice.iter().map(|x| x * x).sum::<f64>() / slice.len() as f64).sqrt()
    }

    #[test]
    fn test_passband_is_preserved() {
        let filter = BandPass::new(1000.0, 4000.0, FS).unwrap();
        let input = sine(2000.0, 8192);
        let output = filter.apply(&input);

        assert_eq!(output.len(), input.len());
        let ratio = mid_rms(&output) / mid_rms(&input);
        assert!((ratio - 1.0).abs() < 0.05, "passband gain {ratio}");
    }

    #[test]
    fn test_stopbands_are_attenuated() {
        let filter = BandPass::new(1000.0, 4000.0, FS).unwrap();
        for freq in [100.0, 15_000.0] {
            let input = sine(freq, 8192);
            let ratio = mid_rms(&filter.apply(&input)) / mid_rms(&input);
            assert!(ratio < 0.05, "{freq} Hz leaked with gain {ratio}");
        }
    }

    #[test]
    fn test_zero_phase() {
        let filter = BandPass::new(1000.0, 4000.0, FS).unwrap();
        let input = sine(2000.0, 8192);
        let output = filter.apply(&input);

        // Peak-aligned: correlation at lag 0 beats lags of a few samples.
        let corr = |lag: usize| -> f64 {
            (2048..6144).map(|i| input[i] * output[i + lag]).sum()
        };
        assert!(corr(0) > corr(3));
        assert!(corr(0) > 0.9 * (2048..6144).map(|i| input[i] * input[i]).sum::<f64>());
    }

    #[test]
    fn test_invalid_band_rejected() {
        assert!(matches!(
            BandPass::new(4000.0, 1000.0, FS),
            Err(StegoError::Validation(_))
        ));
        assert!(matches!(
            BandPass::new(1000.0, 30_000.0, FS),
            Err(StegoError::Validation(_))
        ));
        assert!(BandPass::new(0.0, 1000.0, FS).is_err());
    }

    #[test]
    fn test_tiny_signals_pass_through() {
        let filter = BandPass::new(1000.0, 4000.0, FS).unwrap();
        assert!(filter.apply(&[]).is_empty());
        assert_eq!(filter.apply(&[0.5]), vec![0.5]);
        assert_eq!(filter.apply(&[0.1, 0.2]).len(), 2);
    }
}
