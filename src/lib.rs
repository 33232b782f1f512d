//! Resonant Field - audio-reactive particle visuals.
//!
//! A decoded track plays through an owned [`audio::AudioContext`]; a
//! rate-limited [`analysis::SpectrumAnalyzer`] samples it into
//! [`analysis::SpectrumFrame`]s, which a [`broadcast::Broadcaster`] hands to
//! every subscriber. The [`field::ParticleField`] is one such subscriber and
//! draws itself onto a [`render::Surface`]. [`pipeline`] wires it all
//! together and runs the analysis and render loops.

pub mod analysis;
pub mod audio;
pub mod broadcast;
pub mod cli;
pub mod config;
pub mod error;
pub mod field;
pub mod pipeline;
pub mod render;
#[cfg(test)]
pub mod test_utils;

pub use error::{Error, Result};
