//! Live playback with the analysis and render loops.

use std::cell::RefCell;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::analysis::SpectrumFrame;
use crate::audio::{self, AudioContext, format_position};
use crate::broadcast::FrameSubscriber;
use crate::config::Config;
use crate::pipeline::{self, LoopTiming, Visualizer};

use super::read_track;

/// Print a meter line every this many frames.
const METER_EVERY: u64 = 15;

/// Play `path` through the output device until it ends or Ctrl-C.
pub fn cmd_play(
    rt: &Runtime,
    config: &Config,
    path: &Path,
    volume: Option<f64>,
    start: Option<f64>,
) -> anyhow::Result<()> {
    let bytes = read_track(path)?;

    rt.block_on(async {
        let ctx = AudioContext::init(&config.audio);
        if !ctx.has_output() {
            warn!("No output device; visuals will run silently");
        }
        let mut vis = Visualizer::new(config, ctx)?;

        // Decode off the loop thread, then swap the buffer in
        match audio::decode_async(bytes).await {
            Ok(decoded) => vis.install(Arc::new(decoded)),
            Err(e) => warn!("Could not decode {:?}: {}", path, e),
        }

        // Launching the command is the user gesture
        vis.resume_after_gesture()?;
        if let Some(v) = volume {
            vis.set_volume(v);
        }
        if let Some(s) = start {
            vis.seek(s);
        }
        vis.set_stop_at_end(true);
        vis.broadcaster().subscribe(meter());

        println!(
            "Playing {:?} ({}) on {}",
            path,
            format_position(vis.session().duration()),
            vis.context().output_device_name().unwrap_or("no device")
        );
        vis.play();

        let timing = LoopTiming::from_settings(&config.render);
        let vis = Rc::new(RefCell::new(vis));
        tokio::select! {
            _ = pipeline::run(Rc::clone(&vis), timing) => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    warn!("Failed to listen for Ctrl-C: {}", e);
                }
                info!("Interrupted");
                vis.borrow_mut().stop();
            }
        }
        println!();

        match Rc::try_unwrap(vis) {
            Ok(vis) => {
                let vis = vis.into_inner();
                println!(
                    "Stopped at {} after {} frames, {} analysis ticks.",
                    format_position(vis.session().current_position(vis.context())),
                    vis.frames_rendered(),
                    vis.analyzer().ticks()
                );
                vis.shutdown();
            }
            Err(vis) => vis.borrow_mut().stop(),
        }
        Ok::<(), anyhow::Error>(())
    })
}

/// Subscriber that redraws a one-line band meter on stdout.
fn meter() -> Arc<dyn FrameSubscriber> {
    let count = AtomicU64::new(0);
    Arc::new(move |frame: &SpectrumFrame| {
        if count.fetch_add(1, Ordering::Relaxed) % METER_EVERY != 0 {
            return;
        }
        let bar = |v: f32| "|".repeat((v.clamp(0.0, 1.0) * 20.0).round() as usize);
        print!(
            "\rbass {:<20} mid {:<20} treble {:<20}",
            bar(frame.bass_energy),
            bar(frame.mid_energy),
            bar(frame.treble_energy)
        );
        let _ = std::io::stdout().flush();
    })
}
