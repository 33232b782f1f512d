//! Test fixtures: synthetic audio and a recording draw surface.

use crate::render::{Color, Point, Surface};

/// A 16-bit mono PCM WAV file holding a sine tone at half scale.
pub fn sine_wav_bytes(freq: f32, seconds: f32, sample_rate: u32) -> Vec<u8> {
    let frames = (seconds * sample_rate as f32).round() as u32;
    let data_len = frames * 2;

    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes()); // byte rate
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = (std::f32::consts::TAU * freq * t).sin() * 0.5;
        out.extend_from_slice(&((sample * i16::MAX as f32) as i16).to_le_bytes());
    }
    out
}

/// Surface that records draw calls instead of rasterising them.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub width: u32,
    pub height: u32,
    pub clears: usize,
    pub circles: Vec<(Point, f32, Color)>,
    pub lines: Vec<(Point, Point, f32, Color)>,
    /// Kind of every call in order: "clear", "circle" or "line"
    pub calls: Vec<&'static str>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, _color: Color) {
        self.clears += 1;
        self.calls.push("clear");
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Color) {
        self.circles.push((center, radius, color));
        self.calls.push("circle");
    }

    fn stroke_line(&mut self, from: Point, to: Point, width: f32, color: Color) {
        self.lines.push((from, to, width, color));
        self.calls.push("line");
    }
}
