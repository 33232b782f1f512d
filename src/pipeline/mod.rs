//! Wiring and scheduling.
//!
//! [`Visualizer`] owns the context, session, analyser, broadcaster and
//! field. [`run`] drives it with two cooperative tasks on one thread:
//!
//! ```text
//!  analysis task (poll interval)        render task (frame interval)
//!  ─────────────────────────────        ────────────────────────────
//!  session.poll  -> end of track        field.step
//!  analyzer.tick -> throttled           surface.clear
//!     └─ broadcaster.publish            field.render
//!          └─ field audio snapshot
//! ```
//!
//! Both tasks share `Rc<RefCell<Visualizer>>` and never hold the borrow
//! across an await. Stopping the analyser ends both loops.

mod tasks;
mod visualizer;

pub use tasks::{LoopTiming, analysis_loop, render_loop, run};
pub use visualizer::Visualizer;
