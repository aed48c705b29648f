//! Subcommand handlers for list-cameras and config actions.

use std::path::{Path, PathBuf};

use super::args::ConfigAction;
use crate::camera;
use crate::config::{self, Config};

/// Default config file contents written by `config init`.
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# attire-check configuration

[model]
# Base URL of the hosted model (the directory containing
# model.json and metadata.json)
# url = "https://models.example.com/attire/v1/"

[camera]
# Camera device index
device = 0
# Mirror horizontally (selfie mode)
mirror = true
# Capture resolution: low, medium, high, or WIDTHxHEIGHT
resolution = "high"
# Target FPS
# fps = 30

[preview]
# Character set: standard, blocks, minimal
charset = "standard"
# Invert brightness (for light themes)
invert = false

[ui]
# Show status bar
status_bar = true
"#;

/// List available cameras and print them to stdout.
pub fn list_cameras() {
    match camera::list_devices() {
        Ok(devices) => {
            if devices.is_empty() {
                println!("No cameras found.");
                println!();
                println!("Make sure your camera is connected and permissions are granted.");
                println!(
                    "On macOS, grant access in System Settings > Privacy & Security > Camera."
                );
            } else {
                println!("Available cameras:");
                for device in devices {
                    println!("  {}", device);
                }
                println!();
                println!("Use --camera <index> to select a camera.");
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(config::default_path);

    match action {
        ConfigAction::Show => {
            let cfg = match Config::load(Some(&config_path)) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            println!("Current configuration:");
            println!(
                "  Model URL: {}",
                cfg.model.url.as_deref().unwrap_or("(not set)")
            );
            println!("  Camera: {}", cfg.camera.device);
            println!(
                "  Mirror: {}",
                if cfg.camera.mirror { "yes" } else { "no" }
            );
            println!(
                "  Resolution: {}",
                cfg.camera.resolution.as_deref().unwrap_or("high")
            );
            println!(
                "  Charset: {}",
                cfg.preview.charset.as_deref().unwrap_or("standard")
            );
            println!(
                "  Invert: {}",
                if cfg.preview.invert { "yes" } else { "no" }
            );
            println!(
                "  Status bar: {}",
                if cfg.ui.status_bar { "yes" } else { "no" }
            );
            println!();

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'attire-check config show' to view current settings.");
                std::process::exit(1);
            }

            // Create parent directories if needed
            if let Some(parent) = config_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error creating config directory: {}", e);
                    std::process::exit(1);
                }
            }

            if let Err(e) = std::fs::write(&config_path, DEFAULT_CONFIG_TEMPLATE) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }

            println!("Created config file: {}", config_path.display());
        }
    }
}
