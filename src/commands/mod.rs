//! CLI command implementations
//!
//! Commands drive a [`flashscan_core::FlashHandler`] over the in-memory
//! emulator from `flashscan-dummy`.

mod crc;
mod scan;

pub use crc::run_crc;
pub use scan::run_scan;
