//! Audio playback: context, decoding, transport and device output.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                 PlaybackSession (render thread)                 │
//! │   play / pause / seek / volume, end-of-track, analysis tap      │
//! └──────────────┬─────────────────────────────────┬────────────────┘
//!                │ &AudioContext                   │ Arc<DecodedAudio>
//!                ▼                                 ▼
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │ AudioContext                 │   │ SpectrumAnalyzer             │
//! │ clock, suspended/running     │   │ reads the tap at the playhead│
//! └──────────────┬───────────────┘   └──────────────────────────────┘
//!                │ crossbeam channel
//!                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              cpal output callback (device thread)               │
//! │          own cursor over the shared buffer, smoothed gain       │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod context;
mod decoder;
mod gain;
mod output;
mod session;
mod state;

pub use context::{AudioContext, Clock, ContextState, ManualClock, SystemClock};
pub use decoder::{DecodedAudio, decode, decode_async, decode_with_hint};
pub use gain::{GainParam, GainSmoother};
pub use output::{AudioOutput, OutputCommand};
pub use session::PlaybackSession;
pub use state::{PlaybackEvent, PlaybackStatus, format_position};

/// List available audio output devices.
pub fn list_audio_devices() -> Vec<String> {
    use cpal::traits::{DeviceTrait, HostTrait};
    let host = cpal::default_host();
    host.output_devices()
        .map(|devices| devices.filter_map(|d| d.name().ok()).collect())
        .unwrap_or_default()
}

/// Get the default audio device name.
pub fn default_audio_device() -> Option<String> {
    use cpal::traits::{DeviceTrait, HostTrait};
    let host = cpal::default_host();
    host.default_output_device().and_then(|d| d.name().ok())
}

/// Playback errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlayerError {
    #[error("Audio output initialization failed: {0}")]
    AudioInit(String),

    #[error("No audio output device available")]
    NoOutputDevice,

    #[error("Audio context is closed")]
    ContextClosed,

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedFormat(String),
}
