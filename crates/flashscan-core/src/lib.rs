//! flashscan-core - Serial NAND flash handler model
//!
//! This crate models a serial NAND flash device as a page / sector / block
//! hierarchy and provides erase, write and read operations over a fixed
//! address range, plus the Modbus CRC16 used to fingerprint page content.
//! It is `no_std` so the same handler can sit on top of a real bus driver
//! in firmware.
//!
//! # Features
//!
//! - `std` - Implement `std::error::Error` for [`Error`]
//!
//! # Example
//!
//! ```ignore
//! use flashscan_core::{FlashBackend, FlashHandler};
//!
//! fn fingerprint<B: FlashBackend>(backend: B) -> flashscan_core::Result<u16> {
//!     let mut handler = FlashHandler::new(0x0800_0000, 0x0820_0000, backend);
//!     handler.erase_page(0x0800_0000)?;
//!     handler.write_page(0x0800_0000, &[0xAA; 256])?;
//!     handler.get_page_crc16(0x0800_0000)
//! }
//! ```

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(feature = "std", test))]
extern crate std;

pub mod backend;
pub mod crc16;
pub mod error;
pub mod geometry;
pub mod handler;

pub use backend::FlashBackend;
pub use error::{Error, Result};
pub use handler::{FlashHandler, HandlerStatus};
