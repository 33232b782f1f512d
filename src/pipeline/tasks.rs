//! The analysis and render loops.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::LocalSet;
use tokio::time::{self, MissedTickBehavior};

use super::Visualizer;
use crate::config::RenderSettings;

/// How often each loop wakes up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopTiming {
    /// Wake-up cadence of the analysis task. The analyser's own rate cap
    /// decides which wake-ups do work.
    pub analysis_poll: Duration,
    /// Render cadence
    pub frame_interval: Duration,
}

impl LoopTiming {
    pub const DEFAULT_ANALYSIS_POLL: Duration = Duration::from_millis(5);

    pub fn from_settings(render: &RenderSettings) -> Self {
        let fps = render.target_fps.max(1);
        Self {
            analysis_poll: Self::DEFAULT_ANALYSIS_POLL,
            frame_interval: Duration::from_secs_f64(1.0 / fps as f64),
        }
    }
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self::from_settings(&RenderSettings::default())
    }
}

/// Poll the session and tick the analyser until it is stopped.
pub async fn analysis_loop(vis: Rc<RefCell<Visualizer>>, poll: Duration) {
    let mut interval = time::interval(poll);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let mut vis = vis.borrow_mut();
        if !vis.is_running() {
            break;
        }
        vis.analysis_tick();
    }
    tracing::debug!("Analysis loop finished");
}

/// Step and draw the field every frame until the analyser is stopped.
pub async fn render_loop(vis: Rc<RefCell<Visualizer>>, frame_interval: Duration) {
    let mut interval = time::interval(frame_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let mut vis = vis.borrow_mut();
        if !vis.is_running() {
            break;
        }
        vis.render_frame();
    }
    tracing::debug!("Render loop finished");
}

/// Run both loops on a local task set until the visualizer is stopped.
///
/// Must be awaited on a current-thread runtime (or inside `block_on`);
/// the visualizer is not `Send`.
pub async fn run(vis: Rc<RefCell<Visualizer>>, timing: LoopTiming) {
    let local = LocalSet::new();
    local
        .run_until(async move {
            let analysis = tokio::task::spawn_local(analysis_loop(
                Rc::clone(&vis),
                timing.analysis_poll,
            ));
            let render = tokio::task::spawn_local(render_loop(vis, timing.frame_interval));

            let (analysis, render) = tokio::join!(analysis, render);
            for (name, result) in [("analysis", analysis), ("render", render)] {
                if let Err(e) = result {
                    tracing::error!("{} task failed: {}", name, e);
                }
            }
        })
        .await;
}
