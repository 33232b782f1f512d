//! Audio output using cpal.
//!
//! The output callback runs on the device thread. It owns its own playback
//! cursor over the shared decoded buffer and receives start/stop/gain
//! commands from the session over a bounded channel, so the session never
//! blocks on the device. Sample-rate differences between the track and the
//! device are bridged with linear interpolation.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use super::PlayerError;
use super::decoder::DecodedAudio;
use super::gain::GainSmoother;
use crate::config::AudioSettings;

/// Commands sent to the output callback.
#[derive(Debug, Clone)]
pub enum OutputCommand {
    /// Start rendering `audio` from `offset` seconds, replacing any source
    Start { audio: Arc<DecodedAudio>, offset: f64 },
    /// Stop the current source
    Stop,
    /// Ramp the gain towards a new level
    SetGain(f32),
}

/// An open output stream.
pub struct AudioOutput {
    _stream: Stream,
    command_tx: Sender<OutputCommand>,
    sample_rate: u32,
    channels: u16,
    device_name: String,
}

impl AudioOutput {
    /// Open the configured device (or the default one) and start the stream.
    pub fn open(settings: &AudioSettings) -> Result<Self, PlayerError> {
        let host = cpal::default_host();
        let device = select_device(&host, &settings.output_device)?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        tracing::info!("Using audio device: {}", device_name);

        let supported_config = device
            .default_output_config()
            .map_err(|e| PlayerError::AudioInit(e.to_string()))?;

        let sample_rate = supported_config.sample_rate().0;
        let channels = supported_config.channels();
        tracing::info!("Audio format: {}Hz, {} channels", sample_rate, channels);

        let config = StreamConfig {
            channels,
            sample_rate: supported_config.sample_rate(),
            buffer_size: cpal::BufferSize::Default,
        };

        let (command_tx, command_rx) = bounded(32);
        let renderer = OutputRenderer::new(
            command_rx,
            sample_rate,
            channels,
            settings.volume.clamp(0.0, 1.0),
            settings.volume_ramp_secs,
        );

        let stream = match supported_config.sample_format() {
            SampleFormat::F32 => build_stream::<f32>(&device, &config, renderer),
            SampleFormat::I16 => build_stream::<i16>(&device, &config, renderer),
            SampleFormat::U16 => build_stream::<u16>(&device, &config, renderer),
            format => {
                return Err(PlayerError::AudioInit(format!(
                    "Unsupported sample format: {:?}",
                    format
                )));
            }
        }
        .map_err(|e| PlayerError::AudioInit(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PlayerError::AudioInit(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            command_tx,
            sample_rate,
            channels,
            device_name,
        })
    }

    /// Queue a command for the callback without blocking.
    pub fn send(&self, command: OutputCommand) {
        match self.command_tx.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(cmd)) => {
                tracing::warn!("Output command queue full, dropping {:?}", cmd);
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::warn!("Output stream is gone");
            }
        }
    }

    /// Get the device sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get the device channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Get the device name.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }
}

/// Find a device by (case-insensitive) name, falling back to the default.
fn select_device(host: &cpal::Host, wanted: &str) -> Result<Device, PlayerError> {
    if !wanted.is_empty() {
        let wanted_lower = wanted.to_lowercase();
        let devices = host
            .output_devices()
            .map_err(|e| PlayerError::AudioInit(e.to_string()))?;
        for device in devices {
            if let Ok(name) = device.name() {
                if name.to_lowercase().contains(&wanted_lower) {
                    return Ok(device);
                }
            }
        }
        tracing::warn!("Output device {:?} not found, using default", wanted);
    }

    host.default_output_device()
        .ok_or(PlayerError::NoOutputDevice)
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut renderer: OutputRenderer,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            scratch.resize(data.len(), 0.0);
            renderer.render(&mut scratch);
            for (out, &sample) in data.iter_mut().zip(&scratch) {
                *out = T::from_sample(sample);
            }
        },
        |err| {
            tracing::error!("Audio stream error: {}", err);
        },
        None,
    )
}

/// A buffer being rendered.
struct Voice {
    audio: Arc<DecodedAudio>,
    /// Position in source frames
    cursor: f64,
    /// Source frames advanced per output frame
    step: f64,
}

/// Callback-side state: current voice plus gain.
struct OutputRenderer {
    commands: Receiver<OutputCommand>,
    voice: Option<Voice>,
    gain: GainSmoother,
    sample_rate: u32,
    channels: usize,
}

impl OutputRenderer {
    fn new(
        commands: Receiver<OutputCommand>,
        sample_rate: u32,
        channels: u16,
        volume: f32,
        ramp_secs: f32,
    ) -> Self {
        Self {
            commands,
            voice: None,
            gain: GainSmoother::new(volume, ramp_secs, sample_rate),
            sample_rate,
            channels: channels.max(1) as usize,
        }
    }

    fn drain_commands(&mut self) {
        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                OutputCommand::Start { audio, offset } => {
                    let step = audio.sample_rate() as f64 / self.sample_rate as f64;
                    let cursor = offset.max(0.0) * audio.sample_rate() as f64;
                    self.voice = Some(Voice {
                        audio,
                        cursor,
                        step,
                    });
                }
                OutputCommand::Stop => self.voice = None,
                OutputCommand::SetGain(level) => self.gain.set_target(level),
            }
        }
    }

    /// Fill an interleaved buffer.
    fn render(&mut self, out: &mut [f32]) {
        self.drain_commands();

        for frame in out.chunks_mut(self.channels) {
            let gain = self.gain.next();
            let Some(voice) = self.voice.as_mut() else {
                frame.fill(0.0);
                continue;
            };

            let index = voice.cursor as usize;
            if index >= voice.audio.frames() {
                self.voice = None;
                frame.fill(0.0);
                continue;
            }

            let frac = (voice.cursor - index as f64) as f32;
            for (channel, sample) in frame.iter_mut().enumerate() {
                let a = voice.audio.sample(index, channel);
                let b = if index + 1 < voice.audio.frames() {
                    voice.audio.sample(index + 1, channel)
                } else {
                    a
                };
                *sample = (a + (b - a) * frac) * gain;
            }
            voice.cursor += voice.step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer(sample_rate: u32, channels: u16) -> (Sender<OutputCommand>, OutputRenderer) {
        let (tx, rx) = bounded(8);
        (tx, OutputRenderer::new(rx, sample_rate, channels, 1.0, 0.0))
    }

    #[test]
    fn test_silence_without_voice() {
        let (_tx, mut r) = renderer(100, 2);
        let mut out = vec![1.0; 8];
        r.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_renders_from_offset_and_upmixes() {
        let audio = DecodedAudio::from_interleaved(vec![0.0, 0.1, 0.2, 0.3], 100, 1).unwrap();
        let (tx, mut r) = renderer(100, 2);
        tx.send(OutputCommand::Start {
            audio: Arc::new(audio),
            offset: 0.02,
        })
        .unwrap();

        let mut out = vec![0.0; 6];
        r.render(&mut out);
        assert_eq!(&out[..4], &[0.2, 0.2, 0.3, 0.3]);
        // Past the end the voice is dropped
        assert_eq!(&out[4..], &[0.0, 0.0]);
        assert!(r.voice.is_none());
    }

    #[test]
    fn test_resamples_with_interpolation() {
        let audio = DecodedAudio::from_interleaved(vec![0.0, 1.0], 50, 1).unwrap();
        let (tx, mut r) = renderer(100, 1);
        tx.send(OutputCommand::Start {
            audio: Arc::new(audio),
            offset: 0.0,
        })
        .unwrap();

        let mut out = vec![0.0; 3];
        r.render(&mut out);
        assert_eq!(out, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_stop_silences() {
        let audio = DecodedAudio::from_interleaved(vec![0.5; 10], 10, 1).unwrap();
        let (tx, mut r) = renderer(10, 1);
        tx.send(OutputCommand::Start {
            audio: Arc::new(audio),
            offset: 0.0,
        })
        .unwrap();
        tx.send(OutputCommand::Stop).unwrap();

        let mut out = vec![1.0; 4];
        r.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
