//! FFT analyser node.
//!
//! Behaves like a browser `AnalyserNode`: the most recent `fft_size`
//! samples are Blackman-windowed and transformed, magnitudes are scaled by
//! `1/N`, blended with the previous spectrum by the smoothing constant and
//! reported in dB. Silence reports the floor instead of `-inf`.

use realfft::{RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;
use std::sync::Arc;

use super::AnalysisError;
use super::frame::DB_FLOOR;

pub const MIN_FFT_SIZE: usize = 32;
pub const MAX_FFT_SIZE: usize = 32_768;

/// Windowed FFT with temporal smoothing.
pub struct AnalyserNode {
    fft: Arc<dyn RealToComplex<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    /// Smoothed linear magnitudes, one per bin
    smoothed: Vec<f32>,
    smoothing: f32,
}

impl AnalyserNode {
    /// `fft_size` must be a power of two in `32..=32768`.
    pub fn new(fft_size: usize, smoothing: f32) -> Result<Self, AnalysisError> {
        if !fft_size.is_power_of_two() || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&fft_size) {
            return Err(AnalysisError::InvalidFftSize(fft_size));
        }
        if !(0.0..1.0).contains(&smoothing) {
            return Err(AnalysisError::InvalidSmoothing(smoothing));
        }

        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let spectrum = fft.make_output_vec();
        let scratch = fft.make_scratch_vec();

        Ok(Self {
            fft,
            fft_size,
            window: blackman(fft_size),
            input: vec![0.0; fft_size],
            spectrum,
            scratch,
            smoothed: vec![0.0; fft_size / 2],
            smoothing,
        })
    }

    /// Get the FFT window length.
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Number of bins reported: half the FFT size.
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// Get the blend factor between consecutive spectra.
    pub fn smoothing(&self) -> f32 {
        self.smoothing
    }

    /// Analyse the tail of `time_domain` and write dB magnitudes to `out`.
    ///
    /// Shorter input is zero-padded at the front. `out` is resized to
    /// [`frequency_bin_count`](Self::frequency_bin_count).
    pub fn get_float_frequency_data(&mut self, time_domain: &[f32], out: &mut Vec<f32>) {
        let n = self.fft_size;
        let tail = &time_domain[time_domain.len().saturating_sub(n)..];
        let pad = n - tail.len();

        self.input[..pad].fill(0.0);
        for ((slot, &sample), &w) in self.input[pad..]
            .iter_mut()
            .zip(tail)
            .zip(&self.window[pad..])
        {
            *slot = if sample.is_finite() { sample * w } else { 0.0 };
        }

        if let Err(e) =
            self.fft
                .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
        {
            tracing::warn!("FFT failed: {}", e);
            return;
        }

        let scale = 1.0 / n as f32;
        let tau = self.smoothing;
        out.resize(self.smoothed.len(), DB_FLOOR);

        for ((smoothed, bin), db) in self
            .smoothed
            .iter_mut()
            .zip(&self.spectrum)
            .zip(out.iter_mut())
        {
            let magnitude = bin.norm() * scale;
            let magnitude = if magnitude.is_finite() { magnitude } else { 0.0 };
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;
            *db = to_db(*smoothed);
        }
    }

    /// Forget the smoothing history.
    pub fn reset(&mut self) {
        self.smoothed.fill(0.0);
    }
}

#[inline]
fn to_db(magnitude: f32) -> f32 {
    if magnitude > 0.0 {
        (20.0 * magnitude.log10()).max(DB_FLOOR)
    } else {
        DB_FLOOR
    }
}

/// Blackman window with alpha = 0.16.
fn blackman(n: usize) -> Vec<f32> {
    let a0 = 0.42;
    let a1 = 0.5;
    let a2 = 0.08;
    (0..n)
        .map(|i| {
            let x = std::f32::consts::TAU * i as f32 / n as f32;
            a0 - a1 * x.cos() + a2 * (2.0 * x).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (std::f32::consts::TAU * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(matches!(
            AnalyserNode::new(1000, 0.8),
            Err(AnalysisError::InvalidFftSize(1000))
        ));
        assert!(AnalyserNode::new(16, 0.8).is_err());
        assert!(AnalyserNode::new(1024, 1.0).is_err());
        assert!(AnalyserNode::new(1024, -0.1).is_err());
    }

    #[test]
    fn test_bin_count() {
        let node = AnalyserNode::new(1024, 0.8).unwrap();
        assert_eq!(node.frequency_bin_count(), 512);
    }

    #[test]
    fn test_silence_reports_floor() {
        let mut node = AnalyserNode::new(256, 0.0).unwrap();
        let mut out = Vec::new();
        node.get_float_frequency_data(&[0.0; 256], &mut out);
        assert_eq!(out.len(), 128);
        assert!(out.iter().all(|&db| db == DB_FLOOR));
    }

    #[test]
    fn test_peak_at_tone_bin() {
        // 1024-point FFT at 1024 Hz: 1 Hz per bin
        let mut node = AnalyserNode::new(1024, 0.0).unwrap();
        let mut out = Vec::new();
        node.get_float_frequency_data(&tone(64.0, 1024.0, 1024), &mut out);

        let peak = out
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 64);
        assert!(out[64] > out[200] + 60.0);
    }

    #[test]
    fn test_smoothing_blends_ticks() {
        let signal = tone(64.0, 1024.0, 1024);
        let mut smooth = AnalyserNode::new(1024, 0.8).unwrap();
        let mut raw = AnalyserNode::new(1024, 0.0).unwrap();
        let (mut a, mut b) = (Vec::new(), Vec::new());

        smooth.get_float_frequency_data(&signal, &mut a);
        raw.get_float_frequency_data(&signal, &mut b);
        // First tick with tau 0.8 is 20% of the raw magnitude: about -14 dB
        assert!((b[64] - a[64] - 13.98).abs() < 0.1);

        for _ in 0..50 {
            smooth.get_float_frequency_data(&signal, &mut a);
        }
        assert!((b[64] - a[64]).abs() < 0.1);

        smooth.reset();
        smooth.get_float_frequency_data(&[0.0; 1024], &mut a);
        assert!(a.iter().all(|&db| db == DB_FLOOR));
    }

    #[test]
    fn test_short_input_is_padded() {
        let mut node = AnalyserNode::new(64, 0.0).unwrap();
        let mut out = Vec::new();
        node.get_float_frequency_data(&[0.5; 10], &mut out);
        assert_eq!(out.len(), 32);
        assert!(out.iter().all(|db| db.is_finite()));
    }
}
