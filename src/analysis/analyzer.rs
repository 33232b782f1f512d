//! Rate-limited spectrum sampling.

use std::time::Duration;

use super::AnalysisError;
use super::frame::SpectrumFrame;
use super::node::AnalyserNode;
use crate::audio::{AudioContext, PlaybackSession};
use crate::broadcast::Broadcaster;
use crate::config::AnalysisSettings;

/// Samples the playback tap at a capped rate and publishes frames.
///
/// The cap is independent of how often [`tick`](Self::tick) is called:
/// callers may drive it from a fast device-rate timer and only one tick per
/// interval does any work.
pub struct SpectrumAnalyzer {
    node: AnalyserNode,
    time_domain: Vec<f32>,
    bins: Vec<f32>,
    min_interval: Duration,
    last_tick: Option<Duration>,
    is_processing: bool,
    ticks: u64,
}

impl SpectrumAnalyzer {
    /// Create an analyser from settings, validating the FFT size and tick rate.
    pub fn new(settings: &AnalysisSettings) -> Result<Self, AnalysisError> {
        if !(settings.max_tick_rate_hz.is_finite() && settings.max_tick_rate_hz > 0.0) {
            return Err(AnalysisError::InvalidTickRate(settings.max_tick_rate_hz));
        }
        let node = AnalyserNode::new(settings.fft_size, settings.smoothing)?;
        Ok(Self {
            time_domain: vec![0.0; node.fft_size()],
            bins: Vec::with_capacity(node.frequency_bin_count()),
            node,
            min_interval: Duration::from_secs_f64(1.0 / settings.max_tick_rate_hz),
            last_tick: None,
            is_processing: true,
            ticks: 0,
        })
    }

    /// Run one sampling tick if the rate limit allows it.
    ///
    /// Returns the published frame, or `None` when stopped or throttled.
    pub fn tick(
        &mut self,
        ctx: &AudioContext,
        session: &PlaybackSession,
        broadcaster: &Broadcaster,
    ) -> Option<SpectrumFrame> {
        if !self.is_processing {
            return None;
        }

        let now = ctx.now();
        if let Some(last) = self.last_tick {
            if now.saturating_sub(last) < self.min_interval {
                return None;
            }
        }
        self.last_tick = Some(now);
        self.ticks += 1;

        session.analysis_window(ctx, &mut self.time_domain);
        self.node
            .get_float_frequency_data(&self.time_domain, &mut self.bins);

        let sample_rate = session.sample_rate().unwrap_or_else(|| ctx.sample_rate());
        let frame = SpectrumFrame::new(self.bins.as_slice(), sample_rate);

        tracing::trace!(
            bass = frame.bass_energy,
            mid = frame.mid_energy,
            treble = frame.treble_energy,
            "analysis tick {}",
            self.ticks
        );

        broadcaster.publish(&frame);
        Some(frame)
    }

    /// Resume ticking.
    pub fn start(&mut self) {
        self.is_processing = true;
    }

    /// Stop ticking. Checked at the top of every tick.
    pub fn stop(&mut self) {
        self.is_processing = false;
    }

    /// Check if ticks are enabled.
    pub fn is_processing(&self) -> bool {
        self.is_processing
    }

    /// Number of ticks that did work.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Get the shortest allowed gap between ticks.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Get the number of bins per frame.
    pub fn bin_count(&self) -> usize {
        self.node.frequency_bin_count()
    }

    /// Drop smoothing history, e.g. after loading a new track.
    pub fn reset(&mut self) {
        self.node.reset();
        self.last_tick = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ManualClock;
    use crate::config::AudioSettings;
    use std::sync::Arc;

    fn setup() -> (Arc<ManualClock>, AudioContext, PlaybackSession, Broadcaster) {
        let clock = Arc::new(ManualClock::new());
        let ctx = AudioContext::offline(44_100, clock.clone());
        let session = PlaybackSession::new(&AudioSettings::default());
        (clock, ctx, session, Broadcaster::new())
    }

    #[test]
    fn test_rejects_bad_tick_rate() {
        let settings = AnalysisSettings {
            max_tick_rate_hz: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            SpectrumAnalyzer::new(&settings),
            Err(AnalysisError::InvalidTickRate(_))
        ));
    }

    #[test]
    fn test_tick_is_rate_limited() {
        let (clock, ctx, session, broadcaster) = setup();
        let mut analyzer = SpectrumAnalyzer::new(&AnalysisSettings::default()).unwrap();

        assert!(analyzer.tick(&ctx, &session, &broadcaster).is_some());
        // Same instant and 10ms later: throttled
        assert!(analyzer.tick(&ctx, &session, &broadcaster).is_none());
        clock.advance(Duration::from_millis(10));
        assert!(analyzer.tick(&ctx, &session, &broadcaster).is_none());
        // 17ms after the first tick: allowed
        clock.advance(Duration::from_millis(7));
        assert!(analyzer.tick(&ctx, &session, &broadcaster).is_some());
        assert_eq!(analyzer.ticks(), 2);
    }

    #[test]
    fn test_fast_driver_caps_at_sixty_per_second() {
        let (clock, ctx, session, broadcaster) = setup();
        let mut analyzer = SpectrumAnalyzer::new(&AnalysisSettings::default()).unwrap();

        // Drive at 1kHz for one second
        for _ in 0..1000 {
            analyzer.tick(&ctx, &session, &broadcaster);
            clock.advance(Duration::from_millis(1));
        }
        assert!(analyzer.ticks() <= 60, "ran {} ticks", analyzer.ticks());
        assert!(analyzer.ticks() >= 55);
    }

    #[test]
    fn test_stopped_analyzer_does_nothing() {
        let (_clock, ctx, session, broadcaster) = setup();
        let mut analyzer = SpectrumAnalyzer::new(&AnalysisSettings::default()).unwrap();
        analyzer.stop();
        assert!(analyzer.tick(&ctx, &session, &broadcaster).is_none());
        assert_eq!(analyzer.ticks(), 0);
        analyzer.start();
        assert!(analyzer.tick(&ctx, &session, &broadcaster).is_some());
    }

    #[test]
    fn test_silent_frame_without_track() {
        let (_clock, ctx, session, broadcaster) = setup();
        let mut analyzer = SpectrumAnalyzer::new(&AnalysisSettings::default()).unwrap();
        let frame = analyzer.tick(&ctx, &session, &broadcaster).unwrap();
        assert_eq!(frame.bin_count(), 512);
        assert_eq!(frame.sample_rate(), 44_100);
        assert_eq!(frame.bass_energy, 0.0);
        assert_eq!(frame.mid_energy, 0.0);
        assert_eq!(frame.treble_energy, 0.0);
    }

    #[test]
    fn test_tick_publishes_synchronously() {
        use parking_lot::Mutex;

        let (_clock, ctx, session, broadcaster) = setup();
        let mut analyzer = SpectrumAnalyzer::new(&AnalysisSettings::default()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        broadcaster.subscribe(Arc::new(move |frame: &SpectrumFrame| {
            sink.lock().push(frame.bin_count());
        }));

        analyzer.tick(&ctx, &session, &broadcaster);
        assert_eq!(*seen.lock(), vec![512]);
    }
}
