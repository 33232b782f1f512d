//! Playback status and event types.

use std::time::Duration;

/// Coarse playback status, derived from the session's flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    /// Nothing loaded
    #[default]
    Empty,
    /// Loaded and not playing
    Paused,
    /// `play()` was requested while the context was suspended
    Pending,
    Playing,
    /// Playhead reached the end of the track
    Ended,
}

/// Events surfaced by [`PlaybackSession::poll`](super::PlaybackSession::poll).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The track played to its end. Fired once per play cycle.
    Ended,
}

/// Format a position in seconds as MM:SS or HH:MM:SS.
pub fn format_position(seconds: f64) -> String {
    let d = Duration::from_secs_f64(seconds.max(0.0));
    let secs = d.as_secs();
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
