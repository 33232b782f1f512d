//! Command-line interface for resonant-field.
//!
//! Runs the analysis pipeline and the particle field headlessly (offline
//! analysis, PNG snapshots) or live against the audio output device.

mod commands;

pub use commands::{Cli, Commands, run_command};
