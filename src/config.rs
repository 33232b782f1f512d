//! TOML settings for the audio, analysis, field and render stages.
//!
//! The file lives under the platform config directory:
//! - Windows: %APPDATA%\resonant-field\config.toml
//! - macOS: ~/Library/Application Support/resonant-field/config.toml
//! - Linux: ~/.config/resonant-field/config.toml
//!
//! Every section is `#[serde(default)]`, so a partial file only overrides
//! what it names.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Output device and playback settings
    pub audio: AudioSettings,

    /// Spectrum analyser settings
    pub analysis: AnalysisSettings,

    /// Particle field tuning
    pub field: FieldSettings,

    /// Render surface settings
    pub render: RenderSettings,
}

/// Output device and playback settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Selected output device name (empty = system default)
    pub output_device: String,

    /// Initial volume level (0.0 - 1.0)
    pub volume: f32,

    /// Time constant of the volume ramp in seconds
    pub volume_ramp_secs: f32,

    /// Start the context suspended until a user gesture resumes it
    pub require_user_gesture: bool,

    /// Sample rate of a device-less context
    pub fallback_sample_rate: u32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            output_device: String::new(),
            volume: 1.0,
            volume_ramp_secs: 0.05,
            require_user_gesture: false,
            fallback_sample_rate: 44_100,
        }
    }
}

/// Spectrum analyser settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// FFT window length (power of two)
    pub fft_size: usize,

    /// Blend factor between consecutive spectra (0.0 = none, <1.0)
    pub smoothing: f32,

    /// Upper bound on analysis ticks per second
    pub max_tick_rate_hz: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            fft_size: 1024,
            smoothing: 0.8,
            max_tick_rate_hz: 60.0,
        }
    }
}

/// Particle field tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldSettings {
    /// Number of agents
    pub agent_count: u32,

    /// Base distance under which two agents are connected
    pub connect_distance: f32,

    /// Radius of an agent at neutral scale
    pub base_size: f32,

    /// Smallest radius an agent is drawn with
    pub min_size: f32,

    /// How strongly intensity speeds agents up
    pub speed_gain: f32,

    /// How strongly intensity scales every agent
    pub global_scale_gain: f32,

    /// Agent colour when no spectrum frame has been received
    pub fallback_color: [u8; 3],
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            agent_count: 80,
            connect_distance: 120.0,
            base_size: 2.0,
            min_size: 1.0,
            speed_gain: 0.5,
            global_scale_gain: 0.5,
            fallback_color: [100, 150, 255],
        }
    }
}

/// Render surface settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,

    /// Frame cadence of the render loop
    pub target_fps: u32,

    /// Clear colour
    pub background: [u8; 3],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            target_fps: 60,
            background: [5, 5, 10],
        }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// `<platform config dir>/resonant-field`
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("resonant-field"))
}

/// `config.toml` inside [`config_dir`]
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Read [`config_path`], or defaults when it is missing or malformed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("No platform config directory; running with defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Read `path`. A missing, unreadable or unparsable file yields defaults.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("{:?} does not exist; running with defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Ignoring malformed config {:?}: {}", path, e);
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Could not read {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Write `config` to [`config_path`].
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Write `config` to `path` through a sibling temp file, creating
/// missing parent directories.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Wrote config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Failures while writing the config file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No platform config directory")]
    NoConfigDir,

    #[error("Cannot create {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Cannot encode config as TOML: {0}")]
    Serialize(toml::ser::Error),

    #[error("Cannot write {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Cannot move {0} over {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[audio]"));
        assert!(toml.contains("[analysis]"));
        assert!(toml.contains("[field]"));
        assert!(toml.contains("[render]"));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let toml = r#"
[field]
agent_count = 40
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.field.agent_count, 40);
        assert_eq!(config.field.connect_distance, 120.0);
        assert_eq!(config.analysis.fft_size, 1024);
        assert_eq!(config.analysis.max_tick_rate_hz, 60.0);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.audio.volume = 0.25;
        config.field.fallback_color = [1, 2, 3];

        save_to(&config, &path).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("toml.tmp").exists());

        let loaded = load_from(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[field\nagent_count = ").unwrap();

        assert_eq!(load_from(&path), Config::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_from(&dir.path().join("absent.toml")), Config::default());
    }
}
