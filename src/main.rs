use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use scanloop::cli::{handle_config_action, run_scan, Args, Command, ScanEnd};
use scanloop::config::Config;

/// Install the fmt subscriber. `log` records from the library are bridged in.
fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Command::Config { action } => handle_config_action(action, args.config.as_deref()),
        Command::Scan(scan) => {
            let config = match Config::load(args.config.as_deref()) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            match run_scan(&scan, config) {
                Ok(summary) => {
                    if summary.results == 0 {
                        match summary.end {
                            ScanEnd::TimedOut => eprintln!("No barcode found before the timeout"),
                            ScanEnd::Interrupted => {}
                            _ => eprintln!("No barcode found"),
                        }
                        std::process::exit(1);
                    }
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
