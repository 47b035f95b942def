// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use inventory_scanner::Config;
use std::path::PathBuf;
use std::sync::Mutex;

mod cli;

#[derive(Parser)]
#[command(name = "inventory-scanner")]
#[command(about = "Scan product QR codes with a webcam")]
#[command(version = inventory_scanner::constants::app_info::version())]
#[command(subcommand_required = false)]
struct Cli {
    /// Use a still image instead of a camera
    #[arg(long, global = true)]
    image: Option<PathBuf>,

    /// Camera index to try (repeat to give several, tried in order)
    #[arg(short, long = "device", global = true)]
    devices: Vec<u32>,

    /// Config file (default: ~/.config/inventory-scanner/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the scanner in the terminal (default)
    Terminal,

    /// Scan without a UI, printing each product as a JSON line
    Scan {
        /// Exit after the first product
        #[arg(long)]
        once: bool,
    },

    /// List available cameras
    List,

    /// Decode QR codes in an image file
    Decode {
        /// Image to decode
        path: PathBuf,
    },

    /// Print the effective configuration
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Terminal);

    init_logging(matches!(command, Commands::Terminal));

    let config_path = cli.config.clone().or_else(Config::default_path);
    let mut config = match &config_path {
        Some(path) => Config::load_or_default(path),
        None => Config::default(),
    };
    if !cli.devices.is_empty() {
        config.candidate_devices = cli.devices.clone();
    }
    config.validate()?;

    match command {
        Commands::Terminal => inventory_scanner::terminal::run(&config, cli.image)?,
        Commands::Scan { once } => cli::run_headless(&config, cli.image, once)?,
        Commands::List => cli::list_cameras()?,
        Commands::Decode { path } => cli::decode_image(&path)?,
        Commands::Config { save } => cli::show_config(&config, save, config_path.as_deref())?,
    }

    Ok(())
}

/// Set up tracing
///
/// Set RUST_LOG to control the level, e.g. RUST_LOG=debug or
/// RUST_LOG=inventory_scanner=trace. The terminal UI owns stdout, so in that
/// mode logs go to a file instead.
fn init_logging(to_file: bool) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };

    if to_file {
        let path = inventory_scanner::storage::log_file_path();
        let file = path
            .parent()
            .map(std::fs::create_dir_all)
            .transpose()
            .and_then(|_| {
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
            });
        match file {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .with_env_filter(filter())
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_level(true)
                    .init();
            }
            Err(e) => {
                // Without a log file, stay silent rather than draw over the UI
                eprintln!("Could not open log file {}: {}", path.display(), e);
            }
        }
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .init();
}
