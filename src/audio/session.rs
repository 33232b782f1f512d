//! Playback session: the loaded track and its transport state.
//!
//! Position is tracked against context time rather than the device cursor:
//! `position` holds the offset accumulated up to the last pause or seek, and
//! while playing the live playhead is `position + (now - started_at)`. A
//! running source cannot be repositioned, so seeking while playing restarts
//! it at the new offset.
//!
//! Reaching the end stops the source wherever it is noticed: in `poll`, in
//! `pause`, or in a seek to the end. The `Ended` event is queued there and
//! handed out by the next `poll`.

use std::sync::Arc;

use super::PlayerError;
use super::context::AudioContext;
use super::decoder::{self, DecodedAudio};
use super::gain::GainParam;
use super::output::OutputCommand;
use super::state::{PlaybackEvent, PlaybackStatus};
use crate::config::AudioSettings;

/// Transport state for one decoded track.
pub struct PlaybackSession {
    buffer: Option<Arc<DecodedAudio>>,
    duration: f64,
    /// Offset in seconds at the last pause/seek
    position: f64,
    is_playing: bool,
    pending_start: bool,
    /// Context time of the last start, in seconds
    started_at: f64,
    gain: GainParam,
    /// Set on play, cleared when the end-of-track signal fires
    completion_armed: bool,
    /// Raised end-of-track event not yet returned by `poll`
    ended: Option<PlaybackEvent>,
    on_ended: Option<Box<dyn FnMut()>>,
}

impl PlaybackSession {
    /// Create an empty session at the configured volume.
    pub fn new(settings: &AudioSettings) -> Self {
        Self {
            buffer: None,
            duration: 0.0,
            position: 0.0,
            is_playing: false,
            pending_start: false,
            started_at: 0.0,
            gain: GainParam::new(settings.volume.clamp(0.0, 1.0), settings.volume_ramp_secs),
            completion_armed: false,
            ended: None,
            on_ended: None,
        }
    }

    /// Decode `bytes` and make them the current track.
    ///
    /// On failure the previously loaded track (if any) stays in place and
    /// the error is returned for the caller to log or ignore.
    pub fn load(&mut self, ctx: &AudioContext, bytes: Vec<u8>) -> Result<(), PlayerError> {
        match decoder::decode(bytes) {
            Ok(audio) => {
                self.install(ctx, Arc::new(audio));
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to load track, keeping previous buffer: {}", e);
                Err(e)
            }
        }
    }

    /// Replace the current track wholesale. Stops any running source.
    pub fn install(&mut self, ctx: &AudioContext, audio: Arc<DecodedAudio>) {
        if self.is_playing {
            ctx.send(OutputCommand::Stop);
        }
        self.duration = audio.duration();
        self.buffer = Some(audio);
        self.position = 0.0;
        self.is_playing = false;
        self.pending_start = false;
        self.completion_armed = false;
        self.ended = None;
        tracing::info!("Loaded track ({:.2}s)", self.duration);
    }

    /// Start or resume playback.
    ///
    /// Does nothing when already playing or with nothing loaded. From the
    /// end of the track it restarts at 0. While the
    /// context is suspended the start is deferred until
    /// [`resume_after_gesture`](Self::resume_after_gesture).
    pub fn play(&mut self, ctx: &AudioContext) {
        if self.is_playing {
            return;
        }
        let Some(audio) = &self.buffer else {
            return;
        };
        if ctx.is_suspended() {
            tracing::debug!("Context suspended, deferring playback");
            self.pending_start = true;
            return;
        }
        if !ctx.is_running() {
            tracing::warn!("Cannot play on a closed audio context");
            return;
        }

        if self.position >= self.duration {
            self.position = 0.0;
        }

        ctx.send(OutputCommand::Start {
            audio: Arc::clone(audio),
            offset: self.position,
        });
        self.started_at = ctx.current_time();
        self.is_playing = true;
        self.pending_start = false;
        self.completion_armed = true;
    }

    /// Pause, keeping the accumulated position. Also cancels a deferred start.
    ///
    /// Pausing after the playhead has passed the end finishes the cycle
    /// instead, so its end-of-track signal is not lost.
    pub fn pause(&mut self, ctx: &AudioContext) {
        self.pending_start = false;
        if !self.is_playing {
            return;
        }
        if self.current_position(ctx) >= self.duration {
            self.finish(ctx);
            return;
        }
        self.position = self.current_position(ctx);
        self.is_playing = false;
        ctx.send(OutputCommand::Stop);
    }

    /// Move the playhead to `seconds`, clamped to the track.
    ///
    /// Seeking to the end while playing ends the cycle there rather than
    /// wrapping around to the start.
    pub fn seek(&mut self, ctx: &AudioContext, seconds: f64) {
        let target = if seconds.is_nan() {
            0.0
        } else {
            seconds.clamp(0.0, self.duration)
        };

        if !self.is_playing {
            self.position = target;
            return;
        }
        if target >= self.duration {
            self.finish(ctx);
            return;
        }
        self.pause(ctx);
        self.position = target;
        self.play(ctx);
    }

    /// Set the volume, clamped to [0, 1]. The audible level ramps to it.
    pub fn set_volume(&mut self, ctx: &AudioContext, level: f64) {
        if level.is_nan() {
            return;
        }
        let level = level.clamp(0.0, 1.0) as f32;
        self.gain.set_target(level, ctx.now());
        ctx.send(OutputCommand::SetGain(level));
    }

    /// Target volume level.
    pub fn volume(&self) -> f64 {
        self.gain.target() as f64
    }

    /// Resume a suspended context from a user gesture and flush a deferred start.
    pub fn resume_after_gesture(&mut self, ctx: &mut AudioContext) -> Result<(), PlayerError> {
        ctx.resume()?;
        if self.pending_start {
            self.pending_start = false;
            self.play(ctx);
        }
        Ok(())
    }

    /// Register a callback for the end-of-track signal.
    pub fn set_on_ended(&mut self, callback: impl FnMut() + 'static) {
        self.on_ended = Some(Box::new(callback));
    }

    /// Check for the end of the track.
    ///
    /// Returns [`PlaybackEvent::Ended`] at most once per play cycle, including
    /// for a cycle that a pause or seek already stopped at the end.
    pub fn poll(&mut self, ctx: &AudioContext) -> Option<PlaybackEvent> {
        if self.is_playing && self.current_position(ctx) >= self.duration {
            self.finish(ctx);
        }
        self.ended.take()
    }

    /// Stop at the end of the track and raise the signal if this cycle
    /// has not raised it yet.
    fn finish(&mut self, ctx: &AudioContext) {
        self.position = self.duration;
        self.is_playing = false;
        ctx.send(OutputCommand::Stop);

        if !self.completion_armed {
            return;
        }
        self.completion_armed = false;
        tracing::info!("Playback finished");
        if let Some(callback) = self.on_ended.as_mut() {
            callback();
        }
        self.ended = Some(PlaybackEvent::Ended);
    }

    /// Live playhead in seconds.
    pub fn current_position(&self, ctx: &AudioContext) -> f64 {
        if self.is_playing {
            let elapsed = (ctx.current_time() - self.started_at).max(0.0);
            (self.position + elapsed).min(self.duration)
        } else {
            self.position
        }
    }

    /// Fill `out` with the mono, post-gain signal ending at the playhead.
    ///
    /// This is the analysis tap. It produces silence when nothing is playing.
    pub fn analysis_window(&self, ctx: &AudioContext, out: &mut [f32]) {
        out.fill(0.0);
        let Some(audio) = self.buffer.as_deref() else {
            return;
        };
        if !self.is_playing {
            return;
        }

        let gain = self.gain.value_at(ctx.now());
        let end = (self.current_position(ctx) * audio.sample_rate() as f64).floor() as i64;
        let start = end - out.len() as i64;

        for (offset, slot) in out.iter_mut().enumerate() {
            let frame = start + offset as i64;
            if frame >= 0 {
                *slot = audio.mono(frame as usize) * gain;
            }
        }
    }

    /// Get the coarse playback status.
    pub fn status(&self) -> PlaybackStatus {
        if self.buffer.is_none() {
            PlaybackStatus::Empty
        } else if self.is_playing {
            PlaybackStatus::Playing
        } else if self.pending_start {
            PlaybackStatus::Pending
        } else if self.duration > 0.0 && self.position >= self.duration {
            PlaybackStatus::Ended
        } else {
            PlaybackStatus::Paused
        }
    }

    /// Check if the source is running.
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Check if a start is waiting for a user gesture.
    pub fn pending_start(&self) -> bool {
        self.pending_start
    }

    /// Get the track length in seconds (0 with nothing loaded).
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Position at the last pause/seek; see [`current_position`](Self::current_position).
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Check if a track is loaded.
    pub fn has_track(&self) -> bool {
        self.buffer.is_some()
    }

    /// Sample rate of the loaded track.
    pub fn sample_rate(&self) -> Option<u32> {
        self.buffer.as_ref().map(|a| a.sample_rate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::ManualClock;
    use crate::test_utils::sine_wav_bytes;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::time::Duration;

    fn setup() -> (Arc<ManualClock>, AudioContext, PlaybackSession) {
        let clock = Arc::new(ManualClock::new());
        let ctx = AudioContext::offline(44_100, clock.clone());
        let session = PlaybackSession::new(&AudioSettings::default());
        (clock, ctx, session)
    }

    /// Silent track of `seconds` at a low rate to keep tests cheap.
    fn track(seconds: usize) -> Arc<DecodedAudio> {
        Arc::new(DecodedAudio::from_interleaved(vec![0.25; seconds * 100], 100, 1).unwrap())
    }

    #[test]
    fn test_volume_clamp() {
        let (_clock, ctx, mut session) = setup();
        session.set_volume(&ctx, -0.5);
        assert_eq!(session.volume(), 0.0);
        session.set_volume(&ctx, 2.0);
        assert_eq!(session.volume(), 1.0);
        session.set_volume(&ctx, f64::NAN);
        assert_eq!(session.volume(), 1.0);
    }

    #[test]
    fn test_seek_clamp() {
        let (_clock, ctx, mut session) = setup();
        session.install(&ctx, track(180));
        session.seek(&ctx, -10.0);
        assert_eq!(session.current_position(&ctx), 0.0);
        session.seek(&ctx, 500.0);
        assert_eq!(session.current_position(&ctx), 180.0);
    }

    #[test]
    fn test_seek_past_end_while_playing_stops_at_end() {
        let (clock, ctx, mut session) = setup();
        session.install(&ctx, track(180));
        session.play(&ctx);
        clock.advance(Duration::from_secs(5));

        session.seek(&ctx, 500.0);
        assert!(!session.is_playing());
        assert_eq!(session.current_position(&ctx), 180.0);
        assert_eq!(session.status(), PlaybackStatus::Ended);

        clock.advance(Duration::from_secs(1));
        assert_eq!(session.current_position(&ctx), 180.0);
        assert_eq!(session.poll(&ctx), Some(PlaybackEvent::Ended));
        assert_eq!(session.poll(&ctx), None);

        // Playing again from the end starts over
        session.play(&ctx);
        assert_eq!(session.current_position(&ctx), 0.0);
    }

    #[test]
    fn test_pause_accumulates_elapsed_time() {
        let (clock, ctx, mut session) = setup();
        session.install(&ctx, track(10));

        session.play(&ctx);
        clock.advance(Duration::from_secs(2));
        session.pause(&ctx);
        assert!((session.position() - 2.0).abs() < 1e-9);

        clock.advance(Duration::from_secs(5));
        assert!((session.current_position(&ctx) - 2.0).abs() < 1e-9);

        session.play(&ctx);
        clock.advance(Duration::from_secs(1));
        session.pause(&ctx);
        assert!((session.position() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_seek_while_playing_restarts_at_offset() {
        let (clock, ctx, mut session) = setup();
        session.install(&ctx, track(10));
        session.play(&ctx);
        clock.advance(Duration::from_secs(1));

        session.seek(&ctx, 6.0);
        assert!(session.is_playing());
        clock.advance(Duration::from_secs(1));
        assert!((session.current_position(&ctx) - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_play_without_track_is_noop() {
        let (_clock, ctx, mut session) = setup();
        session.play(&ctx);
        assert!(!session.is_playing());
        assert_eq!(session.status(), PlaybackStatus::Empty);
    }

    #[test]
    fn test_play_twice_does_not_restart() {
        let (clock, ctx, mut session) = setup();
        session.install(&ctx, track(10));
        session.play(&ctx);
        clock.advance(Duration::from_secs(3));
        session.play(&ctx);
        assert!((session.current_position(&ctx) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_pause_when_not_playing_is_noop() {
        let (_clock, ctx, mut session) = setup();
        session.install(&ctx, track(10));
        session.seek(&ctx, 4.0);
        session.pause(&ctx);
        assert_eq!(session.position(), 4.0);
        assert_eq!(session.status(), PlaybackStatus::Paused);
    }

    #[test]
    fn test_suspended_context_defers_start() {
        let (clock, mut ctx, mut session) = setup();
        session.install(&ctx, track(10));
        ctx.suspend();

        session.play(&ctx);
        assert!(!session.is_playing());
        assert!(session.pending_start());
        assert_eq!(session.status(), PlaybackStatus::Pending);

        clock.advance(Duration::from_secs(1));
        session.resume_after_gesture(&mut ctx).unwrap();
        assert!(ctx.is_running());
        assert!(session.is_playing());
        assert!(!session.pending_start());
        assert_eq!(session.current_position(&ctx), 0.0);
    }

    #[test]
    fn test_gesture_without_pending_start_only_resumes() {
        let (_clock, mut ctx, mut session) = setup();
        session.install(&ctx, track(10));
        ctx.suspend();
        session.resume_after_gesture(&mut ctx).unwrap();
        assert!(ctx.is_running());
        assert!(!session.is_playing());
    }

    #[test]
    fn test_end_of_track_fires_once_per_cycle() {
        let (clock, ctx, mut session) = setup();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        session.set_on_ended(move || counter.set(counter.get() + 1));
        session.install(&ctx, track(2));

        session.play(&ctx);
        clock.advance(Duration::from_secs(1));
        assert_eq!(session.poll(&ctx), None);

        clock.advance(Duration::from_secs(2));
        assert_eq!(session.poll(&ctx), Some(PlaybackEvent::Ended));
        assert_eq!(session.poll(&ctx), None);
        assert_eq!(fired.get(), 1);
        assert_eq!(session.status(), PlaybackStatus::Ended);
        assert_eq!(session.current_position(&ctx), 2.0);

        // A new play cycle restarts from the top and re-arms the signal
        session.play(&ctx);
        assert_eq!(session.current_position(&ctx), 0.0);
        clock.advance(Duration::from_secs(3));
        assert_eq!(session.poll(&ctx), Some(PlaybackEvent::Ended));
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_pause_past_end_still_reports_completion() {
        let (clock, ctx, mut session) = setup();
        let fired = Rc::new(Cell::new(0));
        let counter = Rc::clone(&fired);
        session.set_on_ended(move || counter.set(counter.get() + 1));
        session.install(&ctx, track(2));

        session.play(&ctx);
        clock.advance(Duration::from_secs(3));
        session.pause(&ctx);
        assert_eq!(fired.get(), 1);
        assert_eq!(session.position(), 2.0);

        assert_eq!(session.poll(&ctx), Some(PlaybackEvent::Ended));
        assert_eq!(session.poll(&ctx), None);
        assert_eq!(fired.get(), 1);

        // The next cycle is armed afresh
        session.play(&ctx);
        clock.advance(Duration::from_secs(3));
        assert_eq!(session.poll(&ctx), Some(PlaybackEvent::Ended));
        assert_eq!(fired.get(), 2);
    }

    #[test]
    fn test_seek_after_end_passed_reports_completion() {
        let (clock, ctx, mut session) = setup();
        session.install(&ctx, track(2));
        session.play(&ctx);
        clock.advance(Duration::from_secs(3));

        session.seek(&ctx, 1.0);
        assert_eq!(session.poll(&ctx), Some(PlaybackEvent::Ended));
        assert!(session.is_playing());
        assert_eq!(session.current_position(&ctx), 1.0);
        assert_eq!(session.poll(&ctx), None);
    }

    #[test]
    fn test_pause_does_not_fire_completion() {
        let (clock, ctx, mut session) = setup();
        session.install(&ctx, track(2));
        session.play(&ctx);
        clock.advance(Duration::from_millis(500));
        session.pause(&ctx);
        clock.advance(Duration::from_secs(5));
        assert_eq!(session.poll(&ctx), None);
    }

    #[test]
    fn test_failed_load_keeps_previous_buffer() {
        let (_clock, ctx, mut session) = setup();
        session.load(&ctx, sine_wav_bytes(50.0, 1.0, 8_000)).unwrap();
        let duration = session.duration();

        let result = session.load(&ctx, b"not audio at all".to_vec());
        assert!(result.is_err());
        assert!(session.has_track());
        assert_eq!(session.duration(), duration);
        assert_eq!(session.sample_rate(), Some(8_000));
    }

    #[test]
    fn test_analysis_window_is_silent_when_paused() {
        let (clock, ctx, mut session) = setup();
        session.install(&ctx, track(10));
        let mut window = vec![1.0; 32];

        session.analysis_window(&ctx, &mut window);
        assert!(window.iter().all(|&s| s == 0.0));

        session.play(&ctx);
        clock.advance(Duration::from_secs(1));
        session.analysis_window(&ctx, &mut window);
        assert!(window.iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_analysis_window_pads_before_start() {
        let (clock, ctx, mut session) = setup();
        session.install(&ctx, track(10));
        session.play(&ctx);
        clock.advance(Duration::from_millis(100));

        // 100ms at 100Hz = 10 frames of signal at the end of a 16-frame window
        let mut window = vec![1.0; 16];
        session.analysis_window(&ctx, &mut window);
        assert!(window[..6].iter().all(|&s| s == 0.0));
        assert!(window[6..].iter().all(|&s| s > 0.0));
    }
}
