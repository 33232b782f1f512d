//! Audio state the field keeps between frames.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::analysis::{SpectrumFrame, normalize};
use crate::broadcast::FrameSubscriber;

/// What the field retains from the latest spectrum frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSnapshot {
    bins: Arc<[f32]>,
    pub intensity: f32,
    pub bass: f32,
}

impl AudioSnapshot {
    pub fn from_frame(frame: &SpectrumFrame) -> Self {
        Self {
            bins: frame.shared_bins(),
            intensity: frame.intensity(),
            bass: frame.bass_energy,
        }
    }

    /// Get the number of bins in the snapshot.
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Bin assigned to agent `index` of `count`: `floor(index / count * bins)`.
    pub fn agent_bin(&self, index: u32, count: u32) -> Option<usize> {
        if self.bins.is_empty() || count == 0 {
            return None;
        }
        let bin = (index as f64 / count as f64 * self.bins.len() as f64).floor() as usize;
        Some(bin.min(self.bins.len() - 1))
    }

    /// Normalised amplitude of the agent's bin; 0 with no bins.
    pub fn agent_amplitude(&self, index: u32, count: u32) -> f32 {
        self.agent_bin(index, count)
            .map(|bin| normalize(self.bins[bin]))
            .unwrap_or(0.0)
    }
}

/// Frame subscriber that keeps the most recent snapshot for the field.
#[derive(Debug, Default)]
pub struct FieldAudio {
    latest: Mutex<Option<AudioSnapshot>>,
}

impl FieldAudio {
    /// Get the most recent snapshot, if any frame has arrived.
    pub fn latest(&self) -> Option<AudioSnapshot> {
        self.latest.lock().clone()
    }

    /// Forget the last frame; the field goes back to neutral.
    pub fn clear(&self) {
        *self.latest.lock() = None;
    }
}

impl FrameSubscriber for FieldAudio {
    fn on_frame(&self, frame: &SpectrumFrame) {
        *self.latest.lock() = Some(AudioSnapshot::from_frame(frame));
    }
}
