//! Smoothed gain.
//!
//! Volume changes approach their target exponentially instead of jumping,
//! which would click. [`GainParam`] evaluates the curve at an arbitrary
//! context time (used by the analysis tap); [`GainSmoother`] is the
//! per-sample form run inside the output callback.

use std::time::Duration;

/// Gain parameter following `target + (start - target) * e^(-t/tau)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainParam {
    target: f32,
    start: f32,
    changed_at: Duration,
    time_constant: f32,
}

impl GainParam {
    pub fn new(value: f32, time_constant: f32) -> Self {
        Self {
            target: value,
            start: value,
            changed_at: Duration::ZERO,
            time_constant: time_constant.max(0.0),
        }
    }

    /// Begin ramping from the current value towards `target`.
    pub fn set_target(&mut self, target: f32, now: Duration) {
        self.start = self.value_at(now);
        self.target = target;
        self.changed_at = now;
    }

    /// Get the level being approached.
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Get the ramped level at `now`.
    pub fn value_at(&self, now: Duration) -> f32 {
        if self.time_constant <= 0.0 {
            return self.target;
        }
        let elapsed = now.saturating_sub(self.changed_at).as_secs_f32();
        let decay = (-elapsed / self.time_constant).exp();
        self.target + (self.start - self.target) * decay
    }
}

/// One-pole smoother stepping once per output frame.
#[derive(Debug, Clone, Copy)]
pub struct GainSmoother {
    current: f32,
    target: f32,
    coeff: f32,
}

impl GainSmoother {
    pub fn new(value: f32, time_constant: f32, sample_rate: u32) -> Self {
        let coeff = if time_constant <= 0.0 || sample_rate == 0 {
            1.0
        } else {
            1.0 - (-1.0 / (time_constant * sample_rate as f32)).exp()
        };
        Self {
            current: value,
            target: value,
            coeff,
        }
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Advance one sample and return the level.
    #[inline]
    pub fn next(&mut self) -> f32 {
        self.current += (self.target - self.current) * self.coeff;
        self.current
    }
}
