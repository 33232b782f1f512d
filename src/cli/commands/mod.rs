//! CLI command definitions and dispatch.
//!
//! Each subcommand lives in its own submodule:
//! - `analyze`: band energies over time on an offline clock
//! - `snapshot`: render one frame of the field to an image
//! - `play`: live playback with the analysis and render loops
//! - `settings`: config and device inspection

mod analyze;
mod play;
mod settings;
mod snapshot;

use clap::{Parser, Subcommand};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tokio::runtime::{Builder, Runtime};

use crate::config;

pub use analyze::cmd_analyze;
pub use play::cmd_play;
pub use settings::{cmd_config, cmd_devices};
pub use snapshot::cmd_snapshot;

/// Audio-reactive particle field
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "RESONANT_FIELD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Print bass/mid/treble energies over the course of a track
    Analyze {
        /// Path to the audio file
        path: PathBuf,
        /// Seconds between printed rows
        #[arg(long, default_value = "0.25")]
        every: f64,
        /// Stop after this many seconds of audio
        #[arg(long)]
        limit: Option<f64>,
    },
    /// Render the field at a point in the track to an image file
    Snapshot {
        /// Path to the audio file
        path: PathBuf,
        /// Track position in seconds
        #[arg(long, default_value = "0")]
        at: f64,
        /// Output image (format from extension, e.g. .png)
        #[arg(short, long)]
        out: PathBuf,
        /// Image width (default from config)
        #[arg(long)]
        width: Option<u32>,
        /// Image height (default from config)
        #[arg(long)]
        height: Option<u32>,
        /// Seed for agent placement
        #[arg(long, default_value = "1")]
        seed: u64,
    },
    /// Play a track through the output device with the live loops
    Play {
        /// Path to the audio file
        path: PathBuf,
        /// Playback volume (0.0-1.0)
        #[arg(long)]
        volume: Option<f64>,
        /// Start position in seconds
        #[arg(long)]
        start: Option<f64>,
    },
    /// Show the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
    /// List audio output devices
    Devices,
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => config::load_from(path),
        None => config::load(),
    };

    match &cli.command {
        Commands::Analyze { path, every, limit } => cmd_analyze(&config, path, *every, *limit),
        Commands::Snapshot {
            path,
            at,
            out,
            width,
            height,
            seed,
        } => {
            let mut config = config;
            if let Some(w) = width {
                config.render.width = *w;
            }
            if let Some(h) = height {
                config.render.height = *h;
            }
            cmd_snapshot(&config, path, *at, out, *seed)
        }
        Commands::Play {
            path,
            volume,
            start,
        } => {
            let rt = runtime()?;
            cmd_play(&rt, &config, path, *volume, *start)
        }
        Commands::Config { save } => cmd_config(&config, cli.config.as_deref(), *save),
        Commands::Devices => {
            cmd_devices();
            Ok(())
        }
    }
}

/// Single-threaded runtime; the pipeline is `!Send` and runs on one thread.
fn runtime() -> anyhow::Result<Runtime> {
    Ok(Builder::new_current_thread().enable_all().build()?)
}

/// Read a track file, with the path in the error.
fn read_track(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}
