//! In-memory audio decoding using symphonia.
//!
//! Supported formats:
//! - MP3
//! - FLAC
//! - OGG Vorbis
//! - WAV/PCM
//! - AAC (in MP4 container)
//!
//! A whole asset is decoded up front into interleaved `f32` PCM. The result
//! is immutable and shared by `Arc` between the session, the analysis tap and
//! the output device.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::PlayerError;

/// A fully decoded track.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in [-1.0, 1.0]
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl DecodedAudio {
    /// Wrap interleaved PCM. A trailing partial frame is dropped.
    pub fn from_interleaved(
        mut samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self, PlayerError> {
        if sample_rate == 0 {
            return Err(PlayerError::Decode("sample rate is zero".to_string()));
        }
        if channels == 0 {
            return Err(PlayerError::Decode("channel count is zero".to_string()));
        }
        let whole = samples.len() - samples.len() % channels as usize;
        samples.truncate(whole);
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Get the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the number of channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Track length in seconds.
    pub fn duration(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Sample of one channel at a frame; channels wrap for upmixing.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> f32 {
        let channels = self.channels as usize;
        self.samples
            .get(frame * channels + channel % channels)
            .copied()
            .unwrap_or(0.0)
    }

    /// Mono mixdown of one frame. Out-of-range frames are silent.
    #[inline]
    pub fn mono(&self, frame: usize) -> f32 {
        let channels = self.channels as usize;
        let start = frame * channels;
        match self.samples.get(start..start + channels) {
            Some(frame) => frame.iter().sum::<f32>() / channels as f32,
            None => 0.0,
        }
    }
}

/// Decode an encoded asset held in memory.
pub fn decode(bytes: Vec<u8>) -> Result<DecodedAudio, PlayerError> {
    decode_with_hint(bytes, None)
}

/// Decode on a blocking worker so the caller's task keeps running.
pub async fn decode_async(bytes: Vec<u8>) -> Result<DecodedAudio, PlayerError> {
    tokio::task::spawn_blocking(move || decode(bytes))
        .await
        .map_err(|e| PlayerError::Decode(format!("decode task failed: {}", e)))?
}

/// Decode with an optional file extension to speed up probing.
pub fn decode_with_hint(
    bytes: Vec<u8>,
    extension: Option<&str>,
) -> Result<DecodedAudio, PlayerError> {
    if bytes.is_empty() {
        return Err(PlayerError::UnsupportedFormat("empty input".to_string()));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| PlayerError::UnsupportedFormat(e.to_string()))?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PlayerError::UnsupportedFormat("No audio track found".to_string()))?;
    let track_id = track.id;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| PlayerError::Decode(e.to_string()))?;

    let mut samples = Vec::new();
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count() as u16);
    let mut skipped = 0usize;

    loop {
        let packet = match reader.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(PlayerError::Decode(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(_)) => {
                skipped += 1;
                continue;
            }
            Err(e) => return Err(PlayerError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count() as u16);

        let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        buffer.copy_interleaved_ref(decoded);
        samples.extend_from_slice(buffer.samples());
    }

    if skipped > 0 {
        tracing::warn!("Skipped {} undecodable packets", skipped);
    }

    let sample_rate =
        sample_rate.ok_or_else(|| PlayerError::Decode("Unknown sample rate".to_string()))?;
    let channels = channels.unwrap_or(2);

    if samples.is_empty() {
        return Err(PlayerError::Decode("no audio frames decoded".to_string()));
    }

    let audio = DecodedAudio::from_interleaved(samples, sample_rate, channels)?;
    tracing::debug!(
        "Decoded {} frames ({:.2}s) at {}Hz / {}ch",
        audio.frames(),
        audio.duration(),
        audio.sample_rate(),
        audio.channels()
    );
    Ok(audio)
}
