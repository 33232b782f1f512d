//! Configuration and device inspection.

use std::path::Path;

use crate::audio::{default_audio_device, list_audio_devices};
use crate::config::{self, Config};

/// Print the effective configuration, optionally writing it out.
pub fn cmd_config(config: &Config, explicit_path: Option<&Path>, save: bool) -> anyhow::Result<()> {
    let path = explicit_path.map(Path::to_path_buf).or_else(config::config_path);
    match &path {
        Some(p) => println!("# Config file: {}", p.display()),
        None => println!("# No config directory on this platform"),
    }
    print!("{}", toml::to_string_pretty(config)?);

    if save {
        match &path {
            Some(p) => {
                config::save_to(config, p)?;
                println!("# Saved to {}", p.display());
            }
            None => anyhow::bail!("No config path to save to"),
        }
    }
    Ok(())
}

/// Print the output devices cpal can see, marking the default.
pub fn cmd_devices() {
    let default = default_audio_device();
    let devices = list_audio_devices();
    if devices.is_empty() {
        println!("No audio output devices found.");
        return;
    }
    for name in devices {
        let marker = if default.as_deref() == Some(name.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{} {}", marker, name);
    }
}
