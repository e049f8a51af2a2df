//! Subcommand handlers for scan and config actions.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::args::{ConfigAction, ScanArgs};
use crate::camera::{CameraError, ReplayCamera};
use crate::config::{default_path, Config};
use crate::decode::ScanResult;
use crate::frame::{FrameError, Rotation};
use crate::scan::{ScanMode, Scanner, SessionListener};
use crate::worker::{CameraWorker, WorkerError};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Errors from the scan subcommand.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Camera(#[from] CameraError),
    #[error("Failed to install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// How a scan run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEnd {
    /// Single mode delivered its result.
    Found,
    /// Every image was replayed.
    Exhausted,
    TimedOut,
    Interrupted,
}

/// Outcome of the scan subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub results: usize,
    pub end: ScanEnd,
}

/// Fold CLI flags over the loaded configuration. Flags win.
pub fn apply_overrides(mut config: Config, args: &ScanArgs) -> Config {
    if let Some(camera_id) = args.camera_id {
        config.camera.camera_id = camera_id;
    }
    if let Some(focus) = args.focus {
        config.camera.focus_mode = focus;
    }
    if args.inverted {
        config.camera.inverted_scan = true;
    }
    if let Some(strategy) = args.strategy {
        config.decode.strategy = strategy;
    }
    if let Some(scale) = args.scale {
        config.decode.scale = scale;
    }
    if args.crop {
        config.decode.crop = true;
    }
    config
}

/// Keeps the first camera error for the polling loop.
struct ErrorSlot(Rc<RefCell<Option<CameraError>>>);

impl SessionListener for ErrorSlot {
    fn camera_error(&mut self, error: &CameraError) {
        self.0.borrow_mut().get_or_insert_with(|| error.clone());
    }
}

fn print_result(result: &ScanResult, json: bool) {
    if json {
        match serde_json::to_string(result) {
            Ok(line) => println!("{}", line),
            Err(e) => log::error!("Failed to serialize result: {}", e),
        }
    } else {
        println!("{}", result);
    }
}

/// Replay the images through a scanner and print what it finds.
pub fn run_scan(args: &ScanArgs, config: Config) -> Result<ScanSummary, ScanError> {
    let config = apply_overrides(config, args);
    let rotation = args.rotation.unwrap_or(Rotation::Deg0);

    let mut camera = ReplayCamera::from_images(&args.images, rotation)?.looping(args.loop_frames);
    if let Some(interval) = args.interval {
        camera = camera.with_interval(interval);
    }
    let stats = camera.stats();
    log::info!(
        "Replaying {} image(s), {} mode, strategy {}",
        args.images.len(),
        if args.continuous { "continuous" } else { "single" },
        config.decode.strategy
    );

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })?;

    let mut scanner = Scanner::new(CameraWorker::new(), Box::new(camera), &config);
    let error = Rc::new(RefCell::new(None));
    scanner.set_listener(ErrorSlot(Rc::clone(&error)));

    let count = Rc::new(Cell::new(0usize));
    let sink_count = Rc::clone(&count);
    let json = args.json;
    let sink = move |result: ScanResult| {
        sink_count.set(sink_count.get() + 1);
        print_result(&result, json);
    };
    if args.continuous {
        scanner.decode_continuous(sink);
    } else {
        scanner.decode_single(sink);
    }
    scanner.resume()?;

    let deadline = args.timeout.map(|secs| Instant::now() + Duration::from_secs(secs));
    let end = loop {
        scanner.pump_timeout(POLL_INTERVAL);

        if let Some(e) = error.borrow_mut().take() {
            scanner.pause();
            return Err(e.into());
        }
        if !args.continuous && count.get() > 0 && scanner.mode() == ScanMode::Idle {
            break ScanEnd::Found;
        }
        if stats.is_exhausted() {
            // The last frame's outcome was posted before the next request failed.
            scanner.pump();
            break if !args.continuous && count.get() > 0 {
                ScanEnd::Found
            } else {
                ScanEnd::Exhausted
            };
        }
        if interrupted.load(Ordering::SeqCst) {
            break ScanEnd::Interrupted;
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            break ScanEnd::TimedOut;
        }
    };

    scanner.stop_decoding();
    scanner.pause();
    log::info!(
        "Scan finished ({:?}): {} result(s) from {} frame(s), {} capture failure(s)",
        end,
        count.get(),
        stats.delivered(),
        scanner.controller().decode_loop().transient_failures()
    );
    Ok(ScanSummary {
        results: count.get(),
        end,
    })
}

const DEFAULT_CONFIG: &str = r#"# scanloop configuration

[camera]
# Camera index, or -1 for no preference
camera_id = -1
# Focus mode: auto, continuous, infinity, macro, none
focus_mode = "auto"
# Let the camera switch the torch on in low light
torch_auto = false
metering = false
exposure = false
scene_mode = false
# Ask the camera for inverted colours (light codes on dark backgrounds)
inverted_scan = false

[decode]
# Strategy: normal, inverted, mixed
strategy = "normal"
# Downscale factor before decoding (power of two)
scale = 1
# Framing rectangle margin as a fraction of the preview
margin = 0.1
# Only decode inside the framing rectangle
crop = false
"#;

/// Handle config subcommand actions.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
    match action {
        ConfigAction::Show => {
            let config = match Config::load(Some(&config_path)) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            if config_path.exists() {
                println!("# Config file: {} (exists)", config_path.display());
            } else {
                println!("# Config file: {} (not found, showing defaults)", config_path.display());
            }
            match config.to_toml() {
                Ok(text) => print!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'scanloop config show' to view current settings.");
                std::process::exit(1);
            }

            if let Some(parent) = config_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error creating config directory: {}", e);
                    std::process::exit(1);
                }
            }

            if let Err(e) = std::fs::write(&config_path, DEFAULT_CONFIG) {
                eprintln!("Error writing config file: {}", e);
                std::process::exit(1);
            }

            println!("Created config file: {}", config_path.display());
        }
    }
}
