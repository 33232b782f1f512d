//! Render a single frame of the field to an image.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::audio::{AudioContext, ManualClock};
use crate::config::Config;
use crate::field::{Bounds, ParticleField};
use crate::pipeline::{LoopTiming, Visualizer};
use crate::render::ImageSurface;

use super::read_track;

/// Seconds of simulation run before the requested position, so agents have
/// moved and the smoothed spectrum has settled.
const WARMUP_SECS: f64 = 1.0;

/// Simulate up to `at` seconds into the track and write the frame to `out`.
pub fn cmd_snapshot(
    config: &Config,
    path: &Path,
    at: f64,
    out: &Path,
    seed: u64,
) -> anyhow::Result<()> {
    let bytes = read_track(path)?;
    let clock = Arc::new(ManualClock::new());
    let ctx = AudioContext::offline(config.audio.fallback_sample_rate, clock.clone());

    let (width, height) = (config.render.width, config.render.height);
    let field = ParticleField::with_seed(
        &config.field,
        Bounds::new(width as f32, height as f32),
        seed,
    );
    let mut vis = Visualizer::with_field(config, ctx, field)?;
    if let Err(e) = vis.load(bytes) {
        // Still render the field, just without audio
        eprintln!("Could not decode {:?}: {}", path, e);
    }

    let at = if at.is_finite() { at.max(0.0) } else { 0.0 };
    let at = at.min(vis.session().duration());
    let start = (at - WARMUP_SECS).max(0.0);
    vis.seek(start);
    vis.play();

    let frame = LoopTiming::from_settings(&config.render).frame_interval;
    let frames = ((at - start) / frame.as_secs_f64()).ceil() as u64;
    for _ in 0..frames {
        clock.advance(frame);
        vis.analysis_tick();
        vis.render_frame();
    }
    // Covers `at == start`; a throttled tick is a no-op
    vis.analysis_tick();

    let mut surface = ImageSurface::new(width, height)
        .with_context(|| format!("Cannot allocate a {}x{} frame", width, height))?;
    vis.draw(&mut surface);
    surface.save(out)?;

    println!(
        "Wrote {}x{} frame at {:.2}s ({} agents) to {:?}",
        width,
        height,
        at,
        vis.field().agents().len(),
        out
    );
    Ok(())
}
