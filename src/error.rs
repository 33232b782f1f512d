//! Crate-wide error types.
//!
//! Each subsystem owns a specific error enum built with `thiserror`
//! ([`PlayerError`], [`AnalysisError`], [`ConfigError`]). They all convert
//! into [`Error`], which the pipeline and CLI propagate. The binary itself
//! uses `anyhow` on top of this.
//!
//! Nothing in the analysis/broadcast core is fatal: decode failures, a
//! suspended device, a panicking subscriber or a missing surface are all
//! handled where they occur. The errors here cover setup (bad config,
//! unusable FFT size, device init) and explicit user requests.

use std::path::PathBuf;

use crate::analysis::AnalysisError;
use crate::audio::PlayerError;
use crate::config::ConfigError;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Decoding, device or playback error
    #[error("Playback error: {0}")]
    Playback(#[from] PlayerError),

    /// Analyser setup error
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Frame output error (snapshot encoding, surface setup)
    #[error("Render error for {path}: {message}")]
    Render { path: PathBuf, message: String },
}

impl Error {
    /// Create a render error.
    pub fn render(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Render {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_error_display() {
        let err = Error::render("/tmp/frame.png", "unsupported extension");
        let msg = err.to_string();
        assert!(msg.contains("/tmp/frame.png"));
        assert!(msg.contains("unsupported extension"));
    }

    #[test]
    fn test_subsystem_errors_convert() {
        let err: Error = PlayerError::Decode("bad header".into()).into();
        assert!(matches!(err, Error::Playback(_)));
        assert!(err.to_string().contains("bad header"));

        let err: Error = ConfigError::NoConfigDir.into();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
