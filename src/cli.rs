//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

#[derive(Parser)]
#[command(name = "flashscan")]
#[command(author, version, about = "Serial NAND flash bad-block scanner", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Address range options
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// First address of the range (hex, e.g., 0x08000000)
    #[arg(long, value_parser = parse_hex_u32)]
    pub start: Option<u32>,

    /// One past the last address of the range (hex, e.g., 0x08200000)
    #[arg(long, value_parser = parse_hex_u32)]
    pub end: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan an emulated flash device for bad blocks
    Scan {
        /// Scan configuration file (TOML format)
        #[arg(short, long)]
        config: Option<PathBuf>,

        #[command(flatten)]
        range: RangeArgs,

        /// Byte addresses of cells stuck at 0xFF (comma-separated)
        #[arg(long, value_delimiter = ',', value_parser = parse_hex_u32)]
        bad: Vec<u32>,

        /// Image loaded into the emulated device before the scan
        #[arg(short, long)]
        image: Option<PathBuf>,
    },

    /// Print the CRC16 of every page of an image file
    Crc {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Address of the first byte of the image
        #[arg(long, default_value = "0x08000000", value_parser = parse_hex_u32)]
        base: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_u32() {
        assert_eq!(parse_hex_u32("0x08000000"), Ok(0x0800_0000));
        assert_eq!(parse_hex_u32("0X10"), Ok(16));
        assert_eq!(parse_hex_u32("4096"), Ok(4096));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert!(parse_hex_u32("").is_err());
    }

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from([
            "flashscan",
            "-v",
            "scan",
            "--start",
            "0x08000000",
            "--end",
            "0x08010000",
            "--bad",
            "0x08000010,0x08000020",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Scan {
                config,
                range,
                bad,
                image,
            } => {
                assert!(config.is_none());
                assert_eq!(range.start, Some(0x0800_0000));
                assert_eq!(range.end, Some(0x0801_0000));
                assert_eq!(bad, vec![0x0800_0010, 0x0800_0020]);
                assert!(image.is_none());
            }
            _ => panic!("expected scan command"),
        }
    }

    #[test]
    fn test_parse_crc_default_base() {
        let cli = Cli::try_parse_from(["flashscan", "crc", "-i", "dump.bin"]).unwrap();
        match cli.command {
            Commands::Crc { input, base } => {
                assert_eq!(input, PathBuf::from("dump.bin"));
                assert_eq!(base, 0x0800_0000);
            }
            _ => panic!("expected crc command"),
        }
    }
}
