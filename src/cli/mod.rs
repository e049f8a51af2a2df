//! Command-line interface definitions and helpers.
//!
//! This module contains CLI argument parsing, value parsers and subcommand handlers.

mod args;
mod commands;
mod parse;

pub use args::{Args, Command, ConfigAction, ScanArgs};
pub use commands::{apply_overrides, handle_config_action, run_scan, ScanEnd, ScanError, ScanSummary};
pub use parse::{parse_camera_id, parse_interval, parse_rotation, parse_scale};
