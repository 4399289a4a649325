//! Scan configuration
//!
//! A scan is configured from an optional TOML file, then from command-line
//! flags which take precedence:
//!
//! ```toml
//! [range]
//! start = 0x08000000
//! end = "0x08200000"
//!
//! [device]
//! bad_cells = ["0x08010010", 0x08010011]
//! image = "dump.bin"
//! ```
//!
//! Addresses can be TOML integers or strings holding hex (`0x...`) or
//! decimal numbers.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::cli::{parse_hex_u32, RangeArgs};

/// Default first address of the scanned range
pub const DEFAULT_START: u32 = 0x0800_0000;
/// Default end of the scanned range (exclusive)
pub const DEFAULT_END: u32 = 0x0820_0000;
/// Largest range the in-memory device will emulate
pub const MAX_EMULATED_SIZE: usize = 256 * 1024 * 1024;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML or has unknown fields
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The range is empty or reversed
    #[error("Invalid range 0x{start:08X}..0x{end:08X}: end must be above start")]
    InvalidRange { start: u32, end: u32 },

    /// The range is too large to emulate in memory
    #[error("Range of {size} bytes exceeds the emulator limit of {max} bytes")]
    RangeTooLarge { size: usize, max: usize },
}

/// Full scan configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanConfig {
    #[serde(default)]
    pub range: RangeConfig,
    #[serde(default)]
    pub device: DeviceConfig,
}

/// Scanned address range, `start..end`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RangeConfig {
    #[serde(default = "default_start", deserialize_with = "deserialize_hex_u32")]
    pub start: u32,
    #[serde(default = "default_end", deserialize_with = "deserialize_hex_u32")]
    pub end: u32,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            start: DEFAULT_START,
            end: DEFAULT_END,
        }
    }
}

/// Emulated device setup
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    #[serde(default, deserialize_with = "deserialize_hex_u32_vec")]
    pub bad_cells: Vec<u32>,
    pub image: Option<PathBuf>,
}

fn default_start() -> u32 {
    DEFAULT_START
}

fn default_end() -> u32 {
    DEFAULT_END
}

/// A number written either as a TOML integer or as a string
#[derive(Deserialize)]
#[serde(untagged)]
enum HexOrInt {
    Int(u32),
    Str(String),
}

impl HexOrInt {
    fn into_u32(self) -> Result<u32, String> {
        match self {
            Self::Int(n) => Ok(n),
            Self::Str(s) => parse_hex_u32(s.trim()),
        }
    }
}

/// Deserialize a u32 that can be hex (0x...) or decimal
fn deserialize_hex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    HexOrInt::deserialize(deserializer)?
        .into_u32()
        .map_err(serde::de::Error::custom)
}

/// Deserialize a list of u32 that can each be hex (0x...) or decimal
fn deserialize_hex_u32_vec<'de, D>(deserializer: D) -> Result<Vec<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Vec::<HexOrInt>::deserialize(deserializer)?
        .into_iter()
        .map(|v| v.into_u32().map_err(serde::de::Error::custom))
        .collect()
}

impl ScanConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Apply command-line overrides
    ///
    /// Range bounds and the image replace file values; bad cells are added
    /// to those of the file.
    pub fn apply_overrides(
        &mut self,
        range: &RangeArgs,
        bad_cells: &[u32],
        image: Option<PathBuf>,
    ) {
        if let Some(start) = range.start {
            self.range.start = start;
        }
        if let Some(end) = range.end {
            self.range.end = end;
        }
        self.device.bad_cells.extend_from_slice(bad_cells);
        if image.is_some() {
            self.device.image = image;
        }
    }

    /// Check that the range is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.range.end <= self.range.start {
            return Err(ConfigError::InvalidRange {
                start: self.range.start,
                end: self.range.end,
            });
        }
        if self.size() > MAX_EMULATED_SIZE {
            return Err(ConfigError::RangeTooLarge {
                size: self.size(),
                max: MAX_EMULATED_SIZE,
            });
        }
        Ok(())
    }

    /// Size of the range in bytes
    pub fn size(&self) -> usize {
        self.range.end.saturating_sub(self.range.start) as usize
    }
}
