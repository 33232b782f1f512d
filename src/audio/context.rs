//! The audio context: one explicitly owned handle to the output device and
//! the clock everything is scheduled against.
//!
//! The host creates a context with [`AudioContext::init`] (real device) or
//! [`AudioContext::offline`] (no device, injectable clock) and passes it by
//! reference to the session and analyser. [`AudioContext::dispose`] closes
//! it when the host shuts down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::PlayerError;
use super::output::{AudioOutput, OutputCommand};
use crate::config::AudioSettings;

/// Source of context time.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;
}

/// Wall clock starting at construction.
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to. Used for offline rendering and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Jump the clock to an absolute time.
    pub fn set(&self, to: Duration) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }
}

/// Lifecycle state of a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Waiting for a user gesture before output may start
    Suspended,
    Running,
    /// Disposed; cannot be resumed
    Closed,
}

/// Owned audio context.
pub struct AudioContext {
    state: ContextState,
    clock: Arc<dyn Clock>,
    sample_rate: u32,
    output: Option<AudioOutput>,
}

impl AudioContext {
    /// Open the output device described by `settings`.
    ///
    /// A missing or broken device is not fatal: the context keeps running
    /// on the system clock without output so visuals still animate.
    pub fn init(settings: &AudioSettings) -> Self {
        let (output, sample_rate) = match AudioOutput::open(settings) {
            Ok(output) => {
                let rate = output.sample_rate();
                (Some(output), rate)
            }
            Err(e) => {
                tracing::warn!("Running without audio output: {}", e);
                (None, settings.fallback_sample_rate)
            }
        };

        let state = if settings.require_user_gesture {
            ContextState::Suspended
        } else {
            ContextState::Running
        };

        tracing::info!("Audio context initialised ({:?}, {}Hz)", state, sample_rate);

        Self {
            state,
            clock: Arc::new(SystemClock::new()),
            sample_rate,
            output,
        }
    }

    /// A running context with no output device.
    pub fn offline(sample_rate: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: ContextState::Running,
            clock,
            sample_rate,
            output: None,
        }
    }

    /// Get the lifecycle state.
    pub fn state(&self) -> ContextState {
        self.state
    }

    /// Check if the context is waiting for a gesture.
    pub fn is_suspended(&self) -> bool {
        self.state == ContextState::Suspended
    }

    /// Check if the context is running.
    pub fn is_running(&self) -> bool {
        self.state == ContextState::Running
    }

    /// Resume a suspended context. Calling this on a running context is a no-op.
    pub fn resume(&mut self) -> Result<(), PlayerError> {
        match self.state {
            ContextState::Closed => Err(PlayerError::ContextClosed),
            ContextState::Running => Ok(()),
            ContextState::Suspended => {
                tracing::debug!("Audio context resumed");
                self.state = ContextState::Running;
                Ok(())
            }
        }
    }

    /// Suspend output until the next [`resume`](Self::resume).
    pub fn suspend(&mut self) {
        if self.state == ContextState::Running {
            self.send(OutputCommand::Stop);
            self.state = ContextState::Suspended;
        }
    }

    /// Release the device. The context cannot be used for output afterwards.
    pub fn dispose(&mut self) {
        if self.state != ContextState::Closed {
            self.send(OutputCommand::Stop);
            self.output = None;
            self.state = ContextState::Closed;
            tracing::info!("Audio context closed");
        }
    }

    /// Context time.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Context time in seconds.
    pub fn current_time(&self) -> f64 {
        self.now().as_secs_f64()
    }

    /// Rate of the output device, or the fallback rate without one.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Check if a device stream is attached.
    pub fn has_output(&self) -> bool {
        self.output.is_some()
    }

    /// Get the output device name, if any.
    pub fn output_device_name(&self) -> Option<&str> {
        self.output.as_ref().map(AudioOutput::device_name)
    }

    /// Forward a command to the device, if there is one.
    pub(crate) fn send(&self, command: OutputCommand) {
        if let Some(output) = &self.output {
            output.send(command);
        }
    }
}

impl std::fmt::Debug for AudioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioContext")
            .field("state", &self.state)
            .field("sample_rate", &self.sample_rate)
            .field("has_output", &self.output.is_some())
            .finish()
    }
}
