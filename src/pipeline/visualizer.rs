//! The assembled pipeline.

use std::sync::Arc;

use crate::analysis::{SpectrumAnalyzer, SpectrumFrame};
use crate::audio::{AudioContext, DecodedAudio, PlaybackEvent, PlaybackSession, PlayerError};
use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::error::Result;
use crate::field::{Bounds, ParticleField};
use crate::render::{Color, Surface};

/// Everything one visual session needs, wired together.
///
/// The field is subscribed to the broadcaster on construction. Callers
/// drive it with [`analysis_tick`](Self::analysis_tick) and
/// [`render_frame`](Self::render_frame), either by hand or through the
/// loops in [`super::run`].
pub struct Visualizer {
    ctx: AudioContext,
    session: PlaybackSession,
    analyzer: SpectrumAnalyzer,
    broadcaster: Arc<Broadcaster>,
    field: ParticleField,
    surface: Option<Box<dyn Surface>>,
    background: Color,
    stop_at_end: bool,
    frames_rendered: u64,
}

impl Visualizer {
    pub fn new(config: &Config, ctx: AudioContext) -> Result<Self> {
        let field = ParticleField::new(
            &config.field,
            Bounds::new(config.render.width as f32, config.render.height as f32),
        );
        Self::with_field(config, ctx, field)
    }

    /// Build around an existing field, e.g. one with a fixed seed.
    pub fn with_field(config: &Config, ctx: AudioContext, field: ParticleField) -> Result<Self> {
        let analyzer = SpectrumAnalyzer::new(&config.analysis)?;
        let broadcaster = Arc::new(Broadcaster::new());
        broadcaster.subscribe(field.subscriber());

        let [r, g, b] = config.render.background;
        Ok(Self {
            ctx,
            session: PlaybackSession::new(&config.audio),
            analyzer,
            broadcaster,
            field,
            surface: None,
            background: Color::from_rgb8(r, g, b),
            stop_at_end: false,
            frames_rendered: 0,
        })
    }

    /// Attach or detach the drawing surface. The field is rebuilt to fit it.
    pub fn set_surface(&mut self, surface: Option<Box<dyn Surface>>) {
        if let Some(s) = &surface {
            let (w, h) = s.size();
            self.field.set_bounds(Bounds::new(w as f32, h as f32));
        }
        self.surface = surface;
    }

    /// Detach the surface, leaving rendering a no-op.
    pub fn take_surface(&mut self) -> Option<Box<dyn Surface>> {
        self.surface.take()
    }

    /// Stop both loops once the track has played to the end.
    pub fn set_stop_at_end(&mut self, stop: bool) {
        self.stop_at_end = stop;
    }

    /// Decode and install a track. On failure the visuals keep running on
    /// whatever was loaded before, or on silence.
    pub fn load(&mut self, bytes: Vec<u8>) -> std::result::Result<(), PlayerError> {
        self.session.load(&self.ctx, bytes)?;
        self.analyzer.reset();
        Ok(())
    }

    /// Install an already decoded track.
    pub fn install(&mut self, audio: Arc<DecodedAudio>) {
        self.session.install(&self.ctx, audio);
        self.analyzer.reset();
    }

    /// Start or resume playback.
    pub fn play(&mut self) {
        self.session.play(&self.ctx);
    }

    /// Pause playback.
    pub fn pause(&mut self) {
        self.session.pause(&self.ctx);
    }

    /// Move the playhead, clamped to the track.
    pub fn seek(&mut self, seconds: f64) {
        self.session.seek(&self.ctx, seconds);
    }

    /// Set the volume, clamped to [0, 1].
    pub fn set_volume(&mut self, level: f64) {
        self.session.set_volume(&self.ctx, level);
    }

    /// One pass of the analysis side: end-of-track check, then a
    /// (possibly throttled) spectrum tick.
    pub fn analysis_tick(&mut self) -> Option<SpectrumFrame> {
        if let Some(PlaybackEvent::Ended) = self.session.poll(&self.ctx) {
            if self.stop_at_end {
                tracing::info!("Track ended, stopping loops");
                self.analyzer.stop();
            }
        }
        self.analyzer
            .tick(&self.ctx, &self.session, &self.broadcaster)
    }

    /// One frame of the render side: integrate the field and draw it.
    pub fn render_frame(&mut self) {
        self.field.step();
        if let Some(mut surface) = self.surface.take() {
            self.draw(&mut *surface);
            self.surface = Some(surface);
        }
        self.frames_rendered += 1;
    }

    /// Clear `surface` and draw the field's current state onto it.
    pub fn draw(&self, surface: &mut dyn Surface) {
        surface.clear(self.background);
        self.field.render(Some(surface));
    }

    /// Whether the loops should keep going.
    pub fn is_running(&self) -> bool {
        self.analyzer.is_processing()
    }

    /// Cooperative cancellation: both loops exit at their next boundary.
    pub fn stop(&mut self) {
        self.analyzer.stop();
        self.session.pause(&self.ctx);
    }

    /// Stop everything and close the audio context.
    pub fn shutdown(mut self) {
        self.stop();
        self.broadcaster.clear();
        self.ctx.dispose();
    }

    /// Get the audio context.
    pub fn context(&self) -> &AudioContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut AudioContext {
        &mut self.ctx
    }

    /// Get the playback session.
    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    /// Resume a suspended context and flush a deferred start.
    pub fn resume_after_gesture(&mut self) -> std::result::Result<(), PlayerError> {
        self.session.resume_after_gesture(&mut self.ctx)
    }

    /// Get the analyser.
    pub fn analyzer(&self) -> &SpectrumAnalyzer {
        &self.analyzer
    }

    /// Get the frame broadcaster.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Get the particle field.
    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    pub fn field_mut(&mut self) -> &mut ParticleField {
        &mut self.field
    }

    /// Get the number of frames stepped so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{ManualClock, PlaybackStatus};
    use crate::config::FieldSettings;
    use crate::test_utils::{RecordingSurface, sine_wav_bytes};
    use std::time::Duration;

    fn offline() -> (Arc<ManualClock>, Visualizer) {
        let clock = Arc::new(ManualClock::new());
        let ctx = AudioContext::offline(44_100, clock.clone());
        let config = Config::default();
        let field = ParticleField::with_seed(&config.field, Bounds::new(640.0, 360.0), 9);
        (clock, Visualizer::with_field(&config, ctx, field).unwrap())
    }

    #[test]
    fn test_low_tone_lands_in_bass() {
        let (clock, mut vis) = offline();
        vis.load(sine_wav_bytes(50.0, 10.0, 44_100)).unwrap();
        vis.play();
        clock.advance(Duration::from_millis(200));

        let frame = vis.analysis_tick().expect("first tick runs");
        assert!(
            frame.bass_energy > frame.mid_energy,
            "bass {} mid {}",
            frame.bass_energy,
            frame.mid_energy
        );
        assert!(
            frame.bass_energy > frame.treble_energy,
            "bass {} treble {}",
            frame.bass_energy,
            frame.treble_energy
        );
        // The field saw the same tick
        assert!(vis.field().audio().is_some());
    }

    #[test]
    fn test_failed_load_keeps_visuals_alive() {
        let (_clock, mut vis) = offline();
        assert!(vis.load(b"definitely not audio".to_vec()).is_err());
        vis.play();
        let frame = vis.analysis_tick().unwrap();
        assert_eq!(frame.intensity(), 0.0);
        vis.render_frame();
        assert_eq!(vis.frames_rendered(), 1);
    }

    #[test]
    fn test_render_without_surface_still_steps() {
        let (_clock, mut vis) = offline();
        let before = vis.field().agents().to_vec();
        vis.render_frame();
        assert_ne!(before, vis.field().agents());
    }

    #[test]
    fn test_render_clears_then_draws() {
        let (_clock, mut vis) = offline();
        vis.set_surface(Some(Box::new(RecordingSurface::new(320, 200))));
        assert_eq!(vis.field().bounds(), Bounds::new(320.0, 200.0));

        vis.render_frame();
        assert!(vis.take_surface().is_some());
        assert_eq!(vis.frames_rendered(), 1);
    }

    #[test]
    fn test_draw_clears_first() {
        let (_clock, vis) = offline();
        let mut surface = RecordingSurface::new(640, 360);
        vis.draw(&mut surface);

        assert_eq!(surface.clears, 1);
        assert_eq!(surface.calls[0], "clear");
        assert_eq!(surface.circles.len(), vis.field().agents().len());
    }

    #[test]
    fn test_stop_at_end_stops_analysis() {
        let (clock, mut vis) = offline();
        vis.set_stop_at_end(true);
        vis.load(sine_wav_bytes(200.0, 0.5, 44_100)).unwrap();
        vis.play();

        clock.advance(Duration::from_secs(1));
        vis.analysis_tick();
        assert_eq!(vis.session().status(), PlaybackStatus::Ended);
        assert!(!vis.is_running());
    }

    #[test]
    fn test_shutdown_closes_context() {
        let settings = FieldSettings {
            agent_count: 4,
            ..FieldSettings::default()
        };
        let clock = Arc::new(ManualClock::new());
        let ctx = AudioContext::offline(48_000, clock);
        let field = ParticleField::with_seed(&settings, Bounds::new(10.0, 10.0), 1);
        let vis = Visualizer::with_field(&Config::default(), ctx, field).unwrap();
        let broadcaster = Arc::clone(vis.broadcaster());
        assert_eq!(broadcaster.len(), 1);

        vis.shutdown();
        assert!(broadcaster.is_empty());
    }
}
