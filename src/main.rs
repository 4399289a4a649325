//! flashscan - Serial NAND flash bad-block scanner
//!
//! Drives the `flashscan-core` handler over an emulated device. The `scan`
//! command erases, writes and verifies every unit of a range with a set of
//! patterns and reports the bad pages and blocks it finds. The `crc` command
//! prints the page checksums of an image.

mod cli;
mod commands;
mod config;

use clap::Parser;
use cli::{Cli, Commands};
use config::ScanConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::Scan {
            config,
            range,
            bad,
            image,
        } => {
            let mut scan_config = match config {
                Some(path) => ScanConfig::load(&path)?,
                None => ScanConfig::default(),
            };
            scan_config.apply_overrides(&range, &bad, image);

            if !commands::run_scan(&scan_config)? {
                std::process::exit(2);
            }
            Ok(())
        }
        Commands::Crc { input, base } => commands::run_crc(&input, base),
    }
}
