//! CLI argument parsing with clap.

use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use super::parse::{parse_camera_id, parse_interval, parse_rotation, parse_scale};
use crate::camera::{CameraId, FocusMode};
use crate::decode::ScanStrategy;
use crate::frame::Rotation;

/// Scan barcodes by replaying image files through the camera pipeline
#[derive(Parser, Debug)]
#[command(name = "scanloop")]
#[command(version, about = "Replay images through a camera capture and barcode decode pipeline", long_about = None)]
#[command(after_help = "EXAMPLES:
    # Decode the first QR code found
    scanloop scan code.png

    # Report every result, one JSON object per line
    scanloop scan --continuous --json a.png b.png

    # Frames from a sensor mounted a quarter turn from the display
    scanloop scan --rotation 90 frame.png")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Config file path
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode barcodes from image files replayed as camera frames
    Scan(ScanArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ScanArgs {
    /// Images to replay, in order
    #[arg(required = true)]
    pub images: Vec<PathBuf>,

    /// Keep decoding and print every result
    #[arg(long)]
    pub continuous: bool,

    /// Replay the images forever (continuous mode only)
    #[arg(long = "loop", requires = "continuous")]
    pub loop_frames: bool,

    /// Sensor rotation relative to the display (0, 90, 180, 270)
    #[arg(long, value_parser = parse_rotation)]
    pub rotation: Option<Rotation>,

    /// Downscale factor before decoding (power of two)
    #[arg(long, value_parser = parse_scale)]
    pub scale: Option<u32>,

    /// Scan strategy
    #[arg(long)]
    pub strategy: Option<ScanStrategy>,

    /// Camera index, or -1 for no preference
    #[arg(long, value_parser = parse_camera_id, allow_hyphen_values = true)]
    pub camera_id: Option<CameraId>,

    /// Focus mode requested from the camera
    #[arg(long)]
    pub focus: Option<FocusMode>,

    /// Only decode inside the framing rectangle
    #[arg(long)]
    pub crop: bool,

    /// Ask the camera for inverted colours
    #[arg(long)]
    pub inverted: bool,

    /// Delay between replayed frames in milliseconds
    #[arg(long, value_parser = parse_interval)]
    pub interval: Option<std::time::Duration>,

    /// Give up after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Print results as JSON, one object per line
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}
