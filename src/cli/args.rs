//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::camera::Resolution;

use super::enums::CharacterSet;

/// Parse a capture resolution: a preset name or WIDTHxHEIGHT.
pub fn parse_resolution(s: &str) -> Result<Resolution, String> {
    match s {
        "low" => return Ok(Resolution::LOW),
        "medium" => return Ok(Resolution::MEDIUM),
        "high" => return Ok(Resolution::HIGH),
        _ => {}
    }

    let parts: Vec<&str> = s.split('x').collect();
    if parts.len() != 2 {
        return Err(format!(
            "Invalid resolution '{}'. Use low, medium, high, or WIDTHxHEIGHT (e.g., 1280x720)",
            s
        ));
    }
    let width: u32 = parts[0]
        .parse()
        .map_err(|_| format!("Invalid width '{}' in resolution", parts[0]))?;
    let height: u32 = parts[1]
        .parse()
        .map_err(|_| format!("Invalid height '{}' in resolution", parts[1]))?;
    if width == 0 || height == 0 {
        return Err("Resolution width and height must be greater than 0".to_string());
    }
    if width > 4096 || height > 2160 {
        return Err("Resolution exceeds maximum supported (4096x2160)".to_string());
    }
    Ok(Resolution { width, height })
}

/// Parse and validate capture FPS (1-60).
pub fn parse_fps(s: &str) -> Result<u32, String> {
    let fps: u32 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid FPS value", s))?;
    if !(1..=60).contains(&fps) {
        return Err(format!("FPS must be between 1 and 60, got {}", fps));
    }
    Ok(fps)
}

/// TUI app that checks outfits against a dress-code model
#[derive(Parser, Debug)]
#[command(name = "attire-check")]
#[command(version, about = "Check whether an outfit reads as business professional", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Interactive mode: live camera preview in the terminal
    attire-check

    # Classify a photo without the TUI
    attire-check check outfit.jpg

    # Pick a camera and a lower capture resolution
    attire-check --camera 1 --resolution 640x480

    # Point at a different hosted model
    attire-check --model-url https://models.example.com/attire/v2/

    # List available cameras
    attire-check list-cameras")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Base URL of the hosted model (overrides config and ATTIRE_MODEL_URL)
    #[arg(long)]
    pub model_url: Option<String>,

    /// Camera device index (from list-cameras)
    #[arg(long)]
    pub camera: Option<u32>,

    /// Capture resolution: low, medium, high, or WIDTHxHEIGHT
    #[arg(long, value_parser = parse_resolution)]
    pub resolution: Option<Resolution>,

    /// Target capture FPS (1-60)
    #[arg(long, value_parser = parse_fps)]
    pub fps: Option<u32>,

    /// Disable mirroring of the preview and captured stills
    #[arg(long)]
    pub no_mirror: bool,

    /// ASCII character set for the preview
    #[arg(long)]
    pub charset: Option<CharacterSet>,

    /// Invert brightness (for light terminals)
    #[arg(long)]
    pub invert: bool,

    /// Hide status bar
    #[arg(long)]
    pub no_status: bool,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a single image file and print the verdict
    Check {
        /// Path to the image (JPEG or PNG)
        image: PathBuf,
    },
    /// List available cameras
    ListCameras,
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["attire-check"]);
        assert!(args.model_url.is_none());
        assert!(args.camera.is_none());
        assert!(args.resolution.is_none());
        assert!(args.fps.is_none());
        assert!(!args.no_mirror);
        assert!(args.charset.is_none());
        assert!(!args.invert);
        assert!(!args.no_status);
        assert!(args.config.is_none());
        assert!(args.command.is_none());
    }

    #[test]
    fn test_args_model_url() {
        let args = Args::parse_from(["attire-check", "--model-url", "https://example.com/m/"]);
        assert_eq!(args.model_url, Some("https://example.com/m/".to_string()));
    }

    #[test]
    fn test_args_camera_index() {
        let args = Args::parse_from(["attire-check", "--camera", "2"]);
        assert_eq!(args.camera, Some(2));
    }

    #[test]
    fn test_args_no_mirror_flag() {
        let args = Args::parse_from(["attire-check", "--no-mirror"]);
        assert!(args.no_mirror);
    }

    #[test]
    fn test_args_invert_flag() {
        let args = Args::parse_from(["attire-check", "--invert"]);
        assert!(args.invert);
    }

    #[test]
    fn test_args_no_status_flag() {
        let args = Args::parse_from(["attire-check", "--no-status"]);
        assert!(args.no_status);
    }

    #[test]
    fn test_args_resolution_presets() {
        let args = Args::parse_from(["attire-check", "--resolution", "low"]);
        assert_eq!(args.resolution, Some(Resolution::LOW));

        let args = Args::parse_from(["attire-check", "--resolution", "medium"]);
        assert_eq!(args.resolution, Some(Resolution::MEDIUM));

        let args = Args::parse_from(["attire-check", "--resolution", "high"]);
        assert_eq!(args.resolution, Some(Resolution::HIGH));
    }

    #[test]
    fn test_args_resolution_explicit() {
        let args = Args::parse_from(["attire-check", "--resolution", "800x600"]);
        assert_eq!(
            args.resolution,
            Some(Resolution {
                width: 800,
                height: 600
            })
        );
    }

    #[test]
    fn test_args_charset_values() {
        let args = Args::parse_from(["attire-check", "--charset", "standard"]);
        assert_eq!(args.charset, Some(CharacterSet::Standard));

        let args = Args::parse_from(["attire-check", "--charset", "blocks"]);
        assert_eq!(args.charset, Some(CharacterSet::Blocks));

        let args = Args::parse_from(["attire-check", "--charset", "minimal"]);
        assert_eq!(args.charset, Some(CharacterSet::Minimal));
    }

    #[test]
    fn test_args_config_option() {
        let args = Args::parse_from(["attire-check", "--config", "/tmp/config.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/config.toml")));

        let args = Args::parse_from(["attire-check", "-c", "/tmp/test.toml"]);
        assert_eq!(args.config, Some(PathBuf::from("/tmp/test.toml")));
    }

    #[test]
    fn test_args_check_subcommand() {
        let args = Args::parse_from(["attire-check", "check", "photo.jpg"]);
        match args.command {
            Some(Command::Check { image }) => assert_eq!(image, PathBuf::from("photo.jpg")),
            _ => panic!("Expected Check subcommand"),
        }
    }

    #[test]
    fn test_args_list_cameras_subcommand() {
        let args = Args::parse_from(["attire-check", "list-cameras"]);
        assert!(matches!(args.command, Some(Command::ListCameras)));
    }

    #[test]
    fn test_args_config_show_subcommand() {
        let args = Args::parse_from(["attire-check", "config", "show"]);
        match args.command {
            Some(Command::Config {
                action: ConfigAction::Show,
            }) => (),
            _ => panic!("Expected Config Show subcommand"),
        }
    }

    #[test]
    fn test_args_config_init_subcommand() {
        let args = Args::parse_from(["attire-check", "config", "init"]);
        match args.command {
            Some(Command::Config {
                action: ConfigAction::Init,
            }) => (),
            _ => panic!("Expected Config Init subcommand"),
        }
    }

    #[test]
    fn test_args_combined_options() {
        let args = Args::parse_from([
            "attire-check",
            "--model-url",
            "https://example.com/m/",
            "--camera",
            "1",
            "--resolution",
            "medium",
            "--fps",
            "15",
            "--charset",
            "blocks",
            "--no-mirror",
            "--invert",
            "--no-status",
        ]);
        assert_eq!(args.model_url, Some("https://example.com/m/".to_string()));
        assert_eq!(args.camera, Some(1));
        assert_eq!(args.resolution, Some(Resolution::MEDIUM));
        assert_eq!(args.fps, Some(15));
        assert_eq!(args.charset, Some(CharacterSet::Blocks));
        assert!(args.no_mirror);
        assert!(args.invert);
        assert!(args.no_status);
    }

    // Resolution and FPS parsing tests

    #[test]
    fn test_parse_resolution_presets() {
        assert_eq!(parse_resolution("low").unwrap(), Resolution::LOW);
        assert_eq!(parse_resolution("medium").unwrap(), Resolution::MEDIUM);
        assert_eq!(parse_resolution("high").unwrap(), Resolution::HIGH);
    }

    #[test]
    fn test_parse_resolution_valid() {
        assert_eq!(
            parse_resolution("1280x720").unwrap(),
            Resolution {
                width: 1280,
                height: 720
            }
        );
        assert_eq!(
            parse_resolution("640x480").unwrap(),
            Resolution {
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn test_parse_resolution_invalid_format() {
        assert!(parse_resolution("1280").is_err());
        assert!(parse_resolution("1280:720").is_err());
        assert!(parse_resolution("1280-720").is_err());
        assert!(parse_resolution("widthxheight").is_err());
        assert!(parse_resolution("huge").is_err());
    }

    #[test]
    fn test_parse_resolution_zero_values() {
        assert!(parse_resolution("0x720").is_err());
        assert!(parse_resolution("1280x0").is_err());
    }

    #[test]
    fn test_parse_resolution_too_large() {
        assert!(parse_resolution("10000x10000").is_err());
    }

    #[test]
    fn test_parse_fps_valid() {
        assert_eq!(parse_fps("30").unwrap(), 30);
        assert_eq!(parse_fps("1").unwrap(), 1);
        assert_eq!(parse_fps("60").unwrap(), 60);
    }

    #[test]
    fn test_parse_fps_invalid() {
        assert!(parse_fps("0").is_err());
        assert!(parse_fps("61").is_err());
        assert!(parse_fps("-1").is_err());
        assert!(parse_fps("abc").is_err());
    }
}
