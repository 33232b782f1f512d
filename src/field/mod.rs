//! Audio-reactive particle field.
//!
//! A fixed batch of agents drifts and bounces inside the bounds. Each agent
//! is tied to one spectrum bin by its position in the batch; the bin's
//! amplitude drives its size and colour, and the frame's overall intensity
//! drives speed, global scale and how far apart agents may be and still get
//! connected by an edge.
//!
//! The field learns about audio only through its [`FieldAudio`] subscriber.
//! Until the first frame arrives every audio-derived value is neutral.

mod agent;
mod audio;
pub mod color;

pub use agent::{Agent, Bounds};
pub use audio::{AudioSnapshot, FieldAudio};
pub use color::{ColorBand, FREQUENCY_COLORS, Rgb};

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::broadcast::FrameSubscriber;
use crate::config::FieldSettings;
use crate::render::{Color, Surface};

/// Growth of the connect distance at full intensity.
const CONNECT_INTENSITY_GAIN: f32 = 1.5;
/// Per-agent size curve: `1 + 5 * amplitude`.
const AGENT_SCALE_GAIN: f32 = 5.0;
/// Colour saturation curve: `0.5 + 3.5 * amplitude`.
const SATURATION_BASE: f32 = 0.5;
const SATURATION_GAIN: f32 = 3.5;

/// One edge of the connectivity pass. Derived per frame, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionEdge {
    /// Lower agent index of the pair
    pub a: usize,
    /// Higher agent index of the pair
    pub b: usize,
    pub distance: f32,
    pub opacity: f32,
    pub width: f32,
    pub color: Color,
}

/// Agent simulation driven by spectrum frames.
pub struct ParticleField {
    settings: FieldSettings,
    bounds: Bounds,
    agents: Vec<Agent>,
    connect_distance: f32,
    audio: Arc<FieldAudio>,
    rng: StdRng,
}

impl ParticleField {
    pub fn new(settings: &FieldSettings, bounds: Bounds) -> Self {
        Self::with_rng(settings, bounds, StdRng::from_os_rng())
    }

    /// Field with reproducible agent placement.
    pub fn with_seed(settings: &FieldSettings, bounds: Bounds, seed: u64) -> Self {
        Self::with_rng(settings, bounds, StdRng::seed_from_u64(seed))
    }

    fn with_rng(settings: &FieldSettings, bounds: Bounds, rng: StdRng) -> Self {
        let mut field = Self {
            settings: settings.clone(),
            bounds,
            agents: Vec::new(),
            connect_distance: 0.0,
            audio: Arc::new(FieldAudio::default()),
            rng,
        };
        field.set_connect_distance(settings.connect_distance);
        field.set_agent_count(settings.agent_count);
        field
    }

    /// Handle to register with a [`Broadcaster`](crate::broadcast::Broadcaster).
    ///
    /// Every call returns the same subscriber identity.
    pub fn subscriber(&self) -> Arc<dyn FrameSubscriber> {
        self.audio.clone()
    }

    /// Latest audio state, `None` before the first frame.
    pub fn audio(&self) -> Option<AudioSnapshot> {
        self.audio.latest()
    }

    /// Discard the batch and build `count` fresh agents.
    pub fn set_agent_count(&mut self, count: u32) {
        self.settings.agent_count = count;
        self.rebuild();
    }

    /// Change the bounds; the batch is rebuilt against the new size.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
        self.rebuild();
    }

    /// Base connect distance. Negative clamps to 0, NaN is ignored.
    pub fn set_connect_distance(&mut self, distance: f32) {
        if distance.is_nan() {
            return;
        }
        self.connect_distance = distance.max(0.0);
    }

    /// Get the base connection distance.
    pub fn connect_distance(&self) -> f32 {
        self.connect_distance
    }

    /// Get the configured agent count.
    pub fn agent_count(&self) -> u32 {
        self.settings.agent_count
    }

    /// Get the simulation bounds.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Get the agents in index order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    fn rebuild(&mut self) {
        let count = self.settings.agent_count;
        let bounds = self.bounds;
        let rng = &mut self.rng;
        self.agents = (0..count).map(|i| Agent::spawn(i, bounds, &mut *rng)).collect();
        tracing::debug!(
            "Rebuilt {} agents in {}x{}",
            count,
            bounds.width,
            bounds.height
        );
    }

    /// Integrate one frame of motion.
    pub fn step(&mut self) {
        let intensity = self.audio().map_or(0.0, |a| a.intensity);
        let speed = 1.0 + intensity * self.settings.speed_gain;
        let bounds = self.bounds;
        for agent in &mut self.agents {
            agent.advance(speed, bounds);
        }
    }

    /// Every unordered pair closer than the audio-modulated connect distance.
    ///
    /// Each pair appears once with `a < b`. Quadratic in the agent count.
    pub fn connections(&self) -> Vec<ConnectionEdge> {
        let audio = self.audio();
        let audio = audio.as_ref();
        let intensity = audio.map_or(0.0, |a| a.intensity);
        let bass = audio.map_or(0.0, |a| a.bass);

        let threshold = self.connect_distance * (1.0 + intensity * CONNECT_INTENSITY_GAIN);
        if threshold <= 0.0 {
            return Vec::new();
        }
        let strength = 0.3 + intensity * 0.7;
        let width = 1.0 + bass * 2.0;
        let amplitudes: Vec<f32> = (0..self.agents.len())
            .map(|i| self.amplitude(audio, i))
            .collect();

        let mut edges = Vec::new();
        for (i, a) in self.agents.iter().enumerate() {
            for (j, b) in self.agents.iter().enumerate().skip(i + 1) {
                let distance = a.position().distance(b.position());
                if distance >= threshold {
                    continue;
                }
                // Ties go to the lower index
                let owner = if amplitudes[j] > amplitudes[i] { j } else { i };
                edges.push(ConnectionEdge {
                    a: i,
                    b: j,
                    distance,
                    opacity: (1.0 - distance / threshold) * strength,
                    width,
                    color: self.color_with(audio, owner),
                });
            }
        }
        edges
    }

    /// Combined size multiplier of agent `index`; exactly 1 before any frame.
    pub fn agent_audio_scale(&self, index: usize) -> f32 {
        self.scale_with(self.audio().as_ref(), index)
    }

    /// Visible radius: `max(min_size, base_size * scale)`.
    pub fn agent_radius(&self, index: usize) -> f32 {
        self.radius_with(self.audio().as_ref(), index)
    }

    pub fn agent_color(&self, index: usize) -> Color {
        self.color_with(self.audio().as_ref(), index)
    }

    /// Draw edges, then agents. Without a surface this does nothing.
    pub fn render(&self, surface: Option<&mut dyn Surface>) {
        let Some(surface) = surface else {
            return;
        };

        for edge in self.connections() {
            surface.stroke_line(
                self.agents[edge.a].position(),
                self.agents[edge.b].position(),
                edge.width,
                edge.color.with_alpha(edge.color.a * edge.opacity),
            );
        }

        let audio = self.audio();
        for (i, agent) in self.agents.iter().enumerate() {
            surface.fill_circle(
                agent.position(),
                self.radius_with(audio.as_ref(), i),
                self.color_with(audio.as_ref(), i),
            );
        }
    }

    fn amplitude(&self, audio: Option<&AudioSnapshot>, index: usize) -> f32 {
        audio.map_or(0.0, |a| {
            a.agent_amplitude(index as u32, self.agents.len() as u32)
        })
    }

    fn scale_with(&self, audio: Option<&AudioSnapshot>, index: usize) -> f32 {
        let Some(snapshot) = audio else {
            return 1.0;
        };
        let per_agent = 1.0 + AGENT_SCALE_GAIN * self.amplitude(audio, index);
        let global = 1.0 + snapshot.intensity * self.settings.global_scale_gain;
        per_agent * global
    }

    fn radius_with(&self, audio: Option<&AudioSnapshot>, index: usize) -> f32 {
        (self.settings.base_size * self.scale_with(audio, index)).max(self.settings.min_size)
    }

    fn color_with(&self, audio: Option<&AudioSnapshot>, index: usize) -> Color {
        let Some(snapshot) = audio else {
            let [r, g, b] = self.settings.fallback_color;
            return Color::from_rgb8(r, g, b);
        };

        let count = self.agents.len().max(1);
        let base = color::base_color(index as f32 / count as f32);
        let amp = self.amplitude(audio, index);
        let intensity = snapshot.intensity;

        let brightness = 0.3 + amp * intensity * 0.7;
        let gain = brightness * (SATURATION_BASE + SATURATION_GAIN * amp);
        let channel = |c: u8| (c as f32 / 255.0 * gain).clamp(0.0, 1.0);
        Color::from_rgba(
            channel(base.r),
            channel(base.g),
            channel(base.b),
            0.7 + intensity * 0.3,
        )
    }
}
