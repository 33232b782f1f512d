//! Offline band-energy dump.

use std::path::Path;
use std::sync::Arc;

use crate::analysis::{SpectrumAnalyzer, SpectrumFrame};
use crate::audio::{self, AudioContext, ManualClock, PlaybackSession, format_position};
use crate::broadcast::Broadcaster;
use crate::config::Config;

use super::read_track;

/// Play a track against a manual clock and print its band energies.
///
/// The clock advances by exactly the analyser's rate cap, so every step
/// produces one frame and the output is independent of machine speed.
pub fn cmd_analyze(
    config: &Config,
    path: &Path,
    every: f64,
    limit: Option<f64>,
) -> anyhow::Result<()> {
    let decoded = audio::decode(read_track(path)?)?;
    let clock = Arc::new(ManualClock::new());
    let ctx = AudioContext::offline(decoded.sample_rate(), clock.clone());

    let mut session = PlaybackSession::new(&config.audio);
    session.install(&ctx, Arc::new(decoded));
    let mut analyzer = SpectrumAnalyzer::new(&config.analysis)?;
    let broadcaster = Broadcaster::new();

    let end = limit.map_or(session.duration(), |l| l.clamp(0.0, session.duration()));
    println!(
        "{:?}: {:.2}s, {} bins per frame",
        path,
        session.duration(),
        analyzer.bin_count()
    );
    println!(
        "{:>8}  {:>5} {:>5} {:>5} {:>5}  spectrum",
        "time", "bass", "mid", "treb", "int"
    );

    session.play(&ctx);
    let step = analyzer.min_interval();
    let every = if every.is_finite() && every > 0.0 { every } else { 0.25 };
    let mut next_row = 0.0;
    let mut frames = 0u64;

    while session.current_position(&ctx) < end {
        let position = session.current_position(&ctx);
        if let Some(frame) = analyzer.tick(&ctx, &session, &broadcaster) {
            frames += 1;
            if position >= next_row {
                println!("{}", row(position, &frame));
                next_row += every;
            }
        }
        clock.advance(step);
        if session.poll(&ctx).is_some() {
            break;
        }
    }

    println!("\n{} frames analysed.", frames);
    Ok(())
}

fn row(position: f64, frame: &SpectrumFrame) -> String {
    format!(
        "{:>8}  {:>5.2} {:>5.2} {:>5.2} {:>5.2}  {}",
        format_position(position),
        frame.bass_energy,
        frame.mid_energy,
        frame.treble_energy,
        frame.intensity(),
        meter(frame.intensity(), 24)
    )
}

/// Text bar for a value in `[0, 1]`.
fn meter(value: f32, width: usize) -> String {
    let filled = ((value.clamp(0.0, 1.0) * width as f32).round() as usize).min(width);
    format!("{}{}", "#".repeat(filled), ".".repeat(width - filled))
}
