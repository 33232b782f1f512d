//! Spectrum analysis of the playing track.
//!
//! [`AnalyserNode`] is the FFT primitive, [`SpectrumAnalyzer`] drives it at
//! a capped rate from the playback tap, and every executed tick produces a
//! [`SpectrumFrame`] that is handed to the [`Broadcaster`](crate::broadcast::Broadcaster).

mod analyzer;
mod frame;
mod node;

pub use analyzer::SpectrumAnalyzer;
pub use frame::{Band, DB_FLOOR, SpectrumFrame, band_energy, bin_index, normalize};
pub use node::{AnalyserNode, MAX_FFT_SIZE, MIN_FFT_SIZE};

/// Analyser setup errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error("FFT size must be a power of two between 32 and 32768, got {0}")]
    InvalidFftSize(usize),

    #[error("Smoothing must be in [0, 1), got {0}")]
    InvalidSmoothing(f32),

    #[error("Tick rate must be positive, got {0}")]
    InvalidTickRate(f64),
}
