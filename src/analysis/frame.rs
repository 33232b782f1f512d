//! Spectrum frames and the band math behind them.

use std::sync::Arc;

/// Lower edge of the dB scale. Fixed calibration, never derived at runtime.
pub const DB_FLOOR: f32 = -140.0;

/// Map a dB magnitude onto [0, 1]: `-140 dB -> 0`, `0 dB -> 1`.
#[inline]
pub fn normalize(raw: f32) -> f32 {
    if raw.is_nan() {
        return 0.0;
    }
    ((raw - DB_FLOOR) / -DB_FLOOR).clamp(0.0, 1.0)
}

/// Named frequency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Bass,
    Mid,
    Treble,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Bass, Band::Mid, Band::Treble];

    /// Frequency range in Hz, `[low, high)`.
    pub fn range_hz(self) -> (f32, f32) {
        match self {
            Band::Bass => (0.0, 100.0),
            Band::Mid => (100.0, 2_000.0),
            Band::Treble => (2_000.0, 16_000.0),
        }
    }
}

/// Bin index for a frequency: `floor(freq * buffer_len / sample_rate)`.
#[inline]
pub fn bin_index(freq: f32, buffer_len: usize, sample_rate: u32) -> usize {
    if sample_rate == 0 {
        return 0;
    }
    (freq as f64 * buffer_len as f64 / sample_rate as f64).floor().max(0.0) as usize
}

/// Normalised mean of the raw bins in `[low_hz, high_hz)`; 0 for an empty range.
pub fn band_energy(bins: &[f32], low_hz: f32, high_hz: f32, sample_rate: u32) -> f32 {
    let start = bin_index(low_hz, bins.len(), sample_rate);
    let end = bin_index(high_hz, bins.len(), sample_rate).min(bins.len());
    if start >= end {
        return 0.0;
    }
    let slice = &bins[start..end];
    let mean = slice.iter().sum::<f32>() / slice.len() as f32;
    normalize(mean)
}

/// One analysis tick: dB magnitudes plus band energies.
///
/// Bins are shared read-only between every subscriber of the tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumFrame {
    bins: Arc<[f32]>,
    sample_rate: u32,
    pub bass_energy: f32,
    pub mid_energy: f32,
    pub treble_energy: f32,
}

impl SpectrumFrame {
    /// Build a frame from dB bins, deriving the band energies.
    pub fn new(bins: impl Into<Arc<[f32]>>, sample_rate: u32) -> Self {
        let bins = bins.into();
        let energy = |band: Band| {
            let (low, high) = band.range_hz();
            band_energy(&bins, low, high, sample_rate)
        };
        let bass_energy = energy(Band::Bass);
        let mid_energy = energy(Band::Mid);
        let treble_energy = energy(Band::Treble);
        Self {
            bins,
            sample_rate,
            bass_energy,
            mid_energy,
            treble_energy,
        }
    }

    /// Get the raw dB bins.
    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    /// Cheap handle on the bin storage.
    pub fn shared_bins(&self) -> Arc<[f32]> {
        Arc::clone(&self.bins)
    }

    /// Get the number of frequency bins.
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Get the sample rate the bins were computed at.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Normalised amplitude of one bin; 0 when out of range.
    pub fn normalized_bin(&self, index: usize) -> f32 {
        self.bins.get(index).copied().map(normalize).unwrap_or(0.0)
    }

    /// Get the normalised energy of one band.
    pub fn energy(&self, band: Band) -> f32 {
        match band {
            Band::Bass => self.bass_energy,
            Band::Mid => self.mid_energy,
            Band::Treble => self.treble_energy,
        }
    }

    /// Overall intensity: `0.5 * bass + 0.3 * mid + 0.2 * treble`.
    pub fn intensity(&self) -> f32 {
        (self.bass_energy * 0.5 + self.mid_energy * 0.3 + self.treble_energy * 0.2).clamp(0.0, 1.0)
    }
}
