use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use log::warn;

use attire_check::camera::{CameraController, CameraSettings};
use attire_check::cli::{self, Args, Command};
use attire_check::config::Config;
use attire_check::event_loop::{self, UiOptions};
use attire_check::model::{
    display_label, format_confidence, severity_for, top_prediction, LinearSoftmaxEngine,
    ModelCache, ModelClient, ModelLoadError, Prediction, Severity, MODEL_URL_ENV,
};
use attire_check::preview::CharSet;
use attire_check::session::CaptureSession;

/// Load .env so ATTIRE_MODEL_URL can live in a local file.
///
/// Existing environment variables are never overridden.
fn load_env() {
    let _ = dotenv::dotenv();
}

/// Resolve the model base URL: CLI flag > config file > environment.
fn resolve_model_url(flag: Option<String>, config_url: Option<String>) -> Option<String> {
    flag.or(config_url)
        .or_else(|| std::env::var(MODEL_URL_ENV).ok())
}

/// Load the config file, exiting with a friendly message on failure.
///
/// An explicitly requested config file must exist; the default location
/// is optional and falls back to built-in defaults.
fn load_config(path: Option<&Path>) -> Config {
    if let Some(p) = path {
        if !p.exists() {
            eprintln!("Error: config file not found: {}", p.display());
            std::process::exit(1);
        }
    }
    match Config::load(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Build the model client, attaching the on-disk artifact cache when
/// the cache directory is usable.
fn build_client(url: String) -> Result<ModelClient, ModelLoadError> {
    let client = ModelClient::new(url, Arc::new(LinearSoftmaxEngine))?;
    match ModelCache::with_default_dir_initialized() {
        Ok(cache) => Ok(client.with_cache(cache)),
        Err(e) => {
            warn!("Model cache unavailable: {}", e);
            Ok(client)
        }
    }
}

fn print_missing_url_help() {
    eprintln!("Error: no model URL configured.");
    eprintln!();
    eprintln!("Set one of:");
    eprintln!("  --model-url <URL>");
    eprintln!("  [model] url in {}", attire_check::config::default_path().display());
    eprintln!("  {} (environment or .env)", MODEL_URL_ENV);
}

/// Classify a single image file and print the verdict, ranked scores
/// included. No TTY needed.
fn run_check(image: &Path, client: ModelClient) -> Result<(), String> {
    let bytes = std::fs::read(image)
        .map_err(|e| format!("Failed to read '{}': {}", image.display(), e))?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| format!("Failed to create async runtime: {}", e))?;

    print!("Loading model... ");
    std::io::Write::flush(&mut std::io::stdout()).ok();
    let model = rt.block_on(client.load()).map_err(|e| format!("\n{}", e))?;
    println!("done");

    print!("Classifying {}... ", image.display());
    std::io::Write::flush(&mut std::io::stdout()).ok();
    let predictions = model
        .classify_bytes(&bytes)
        .map_err(|e| format!("\n{}", e))?;
    println!("done");
    println!();

    let top = match top_prediction(&predictions) {
        Some(p) => p,
        None => return Err("The model returned no predictions".to_string()),
    };

    println!(
        "Verdict: {} ({}% confidence)",
        display_label(&top.label),
        format_confidence(top.probability)
    );
    let note = match severity_for(&top.label) {
        Severity::Favorable => "Looks interview-ready.",
        Severity::Neutral => "Close, but not full business professional.",
        Severity::Unfavorable => "Unlikely to pass a business professional dress code.",
    };
    println!("{}", note);
    println!();

    // Stable sort: ties keep model order, matching the verdict rule
    let mut ranked: Vec<&Prediction> = predictions.iter().collect();
    ranked.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for p in &ranked {
        println!(
            "  {:<24} {:>6}%",
            display_label(&p.label),
            format_confidence(p.probability)
        );
    }

    Ok(())
}

/// Run the interactive TUI checker.
fn run_interactive(args: Args) {
    let cfg = load_config(args.config.as_deref());

    // Merge settings: CLI args > config file > built-in defaults

    // Camera device: CLI > config > default (0)
    let device_index = args.camera.unwrap_or(cfg.camera.device);

    // Mirror: --no-mirror wins, otherwise config (default true)
    let mirror = if args.no_mirror {
        false
    } else {
        cfg.camera.mirror
    };

    // Resolution: CLI > config > default (high)
    let resolution = args
        .resolution
        .or_else(|| {
            cfg.camera
                .resolution
                .as_deref()
                .and_then(|r| match cli::parse_resolution(r) {
                    Ok(res) => Some(res),
                    Err(e) => {
                        warn!("Ignoring configured resolution: {}", e);
                        None
                    }
                })
        })
        .unwrap_or_default();

    // FPS: CLI > config > default (30)
    let fps = args.fps.or(cfg.camera.fps).unwrap_or(30);

    // Charset: CLI > config > default (standard)
    let charset = args
        .charset
        .map(CharSet::from)
        .or_else(|| {
            cfg.preview.charset.as_deref().and_then(|name| {
                let cs = CharSet::from_name(name);
                if cs.is_none() {
                    warn!("Unknown charset '{}' in config, using standard", name);
                }
                cs
            })
        })
        .unwrap_or_default();

    // Invert: CLI flag > config > default (false)
    let invert = args.invert || cfg.preview.invert;

    // Status bar: --no-status wins, otherwise config (default true)
    let show_status = if args.no_status {
        false
    } else {
        cfg.ui.status_bar
    };

    let url = match resolve_model_url(args.model_url, cfg.model.url) {
        Some(u) => u,
        None => {
            print_missing_url_help();
            std::process::exit(1);
        }
    };

    let client = match build_client(url) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let controller = CameraController::new(CameraSettings {
        device_index,
        resolution,
        fps,
        mirror,
    });
    let session = CaptureSession::new();
    let options = UiOptions {
        charset,
        invert,
        show_status,
        mirror,
    };

    // The handler only sets a flag; the event loop restores the
    // terminal and releases the camera on its way out
    if let Err(e) = event_loop::setup_ctrlc_handler() {
        eprintln!("Warning: Could not set up Ctrl+C handler: {}", e);
    }

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create async runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(event_loop::run(session, controller, client, options)) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn main() {
    // Load .env before reading any configuration
    load_env();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Some(Command::ListCameras) => {
            cli::list_cameras();
        }
        Some(Command::Config { action }) => {
            cli::handle_config_action(action, args.config.as_deref());
        }
        Some(Command::Check { ref image }) => {
            let cfg = load_config(args.config.as_deref());
            let url = match resolve_model_url(args.model_url, cfg.model.url) {
                Some(u) => u,
                None => {
                    print_missing_url_help();
                    std::process::exit(1);
                }
            };
            let client = match build_client(url) {
                Ok(c) => c,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            if let Err(e) = run_check(image, client) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            run_interactive(args);
        }
    }
}
