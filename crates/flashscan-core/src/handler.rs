//! Flash handler - address-range owner and operation state machine
//!
//! A [`FlashHandler`] owns one contiguous address range of a NAND device and
//! exposes erase, write and read at page, sector and block granularity.
//! Sector and block operations are always decomposed into page operations
//! issued in ascending address order; only the page operations reach the
//! [`FlashBackend`].
//!
//! # Address range
//!
//! `start_address` is the first byte of the range and `end_address` is one
//! past the last byte. An operation is accepted only if its whole footprint
//! (`addr .. addr + unit size`) lies inside the range; the check happens
//! once per public call, before the status changes or the backend is
//! touched.
//!
//! # Status
//!
//! Each operation sets [`HandlerStatus`] to its own value while it runs and
//! restores the previous value on every exit path. Seen from the outside
//! the handler is therefore always [`HandlerStatus::Free`] between calls.

use core::fmt;

use log::{debug, trace};

use crate::backend::FlashBackend;
use crate::crc16::crc16;
use crate::error::{Error, Result};
use crate::geometry::{need_erase, Block, Page, Sector, Unit, ERASED_BYTE, PAGE_SIZE, SECTOR_SIZE};

/// Operation currently in progress on a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerStatus {
    /// No operation in progress
    #[default]
    Free,
    /// Erasing a page
    ErasingPage,
    /// Erasing a sector
    ErasingSector,
    /// Erasing a block
    ErasingBlock,
    /// Erasing the whole range
    ErasingFull,
    /// Writing a page
    WritingPage,
    /// Writing a sector
    WritingSector,
    /// Writing a block
    WritingBlock,
    /// Reading a page
    ReadingPage,
    /// Reading a sector
    ReadingSector,
    /// Reading a block
    ReadingBlock,
}

impl HandlerStatus {
    /// Whether no operation is in progress
    pub fn is_free(self) -> bool {
        self == Self::Free
    }
}

impl fmt::Display for HandlerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Free => "free",
            Self::ErasingPage => "erasing page",
            Self::ErasingSector => "erasing sector",
            Self::ErasingBlock => "erasing block",
            Self::ErasingFull => "erasing full memory",
            Self::WritingPage => "writing page",
            Self::WritingSector => "writing sector",
            Self::WritingBlock => "writing block",
            Self::ReadingPage => "reading page",
            Self::ReadingSector => "reading sector",
            Self::ReadingBlock => "reading block",
        };
        f.write_str(s)
    }
}

/// Handler for one address range of a serial NAND flash
///
/// Not safe for concurrent use; every mutating operation takes `&mut self`.
/// Callers that share a handler between threads wrap it in a single lock.
pub struct FlashHandler<B> {
    backend: B,
    status: HandlerStatus,
    check_mode: bool,
    start_address: u32,
    end_address: u32,
    /// Current content of the page being written
    page_buf: Page,
}

impl<B: FlashBackend> FlashHandler<B> {
    /// Create a handler for `start_address..end_address` on top of `backend`
    pub fn new(start_address: u32, end_address: u32, backend: B) -> Self {
        debug!(
            "Flash handler for 0x{:08X}..0x{:08X} ({} bytes)",
            start_address,
            end_address,
            end_address.saturating_sub(start_address)
        );
        Self {
            backend,
            status: HandlerStatus::Free,
            check_mode: false,
            start_address,
            end_address,
            page_buf: [ERASED_BYTE; PAGE_SIZE],
        }
    }

    /// Current handler status
    pub fn status(&self) -> HandlerStatus {
        self.status
    }

    /// First address of the range
    pub fn start_address(&self) -> u32 {
        self.start_address
    }

    /// One past the last address of the range
    pub fn end_address(&self) -> u32 {
        self.end_address
    }

    /// Size of the range in bytes
    pub fn size(&self) -> u32 {
        self.end_address.saturating_sub(self.start_address)
    }

    /// Mark the following operations as part of a verification pass
    pub fn enable_check_mode(&mut self) {
        trace!("Check mode enabled");
        self.check_mode = true;
    }

    /// Mark the following operations as part of a normal pass
    pub fn disable_check_mode(&mut self) {
        trace!("Check mode disabled");
        self.check_mode = false;
    }

    /// Whether check mode is enabled
    pub fn is_check_mode(&self) -> bool {
        self.check_mode
    }

    /// Get a reference to the backend
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Get a mutable reference to the backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Consume the handler and return the backend
    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Check whether a unit at `addr` fits inside the range
    pub fn is_valid_unit(&self, addr: u32, unit: Unit) -> bool {
        let end = addr as u64 + unit.size() as u64;
        addr >= self.start_address && end <= self.end_address as u64
    }

    fn check_unit(&self, addr: u32, unit: Unit) -> Result<()> {
        if self.is_valid_unit(addr, unit) {
            Ok(())
        } else {
            debug!("Rejected {} at 0x{:08X}: out of range", unit, addr);
            Err(Error::AddressOutOfRange { addr })
        }
    }

    /// Run `op` with the status set to `status`, restoring the previous
    /// status afterwards whatever the outcome
    fn run_as<T>(
        &mut self,
        status: HandlerStatus,
        op: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let previous = core::mem::replace(&mut self.status, status);
        let result = op(self);
        self.status = previous;
        result
    }

    // =========================================================================
    // Erase
    // =========================================================================

    /// Erase the page starting at `addr`
    pub fn erase_page(&mut self, addr: u32) -> Result<()> {
        self.check_unit(addr, Unit::Page)?;
        self.run_as(HandlerStatus::ErasingPage, |h| {
            trace!("Erasing page at 0x{:08X}", addr);
            h.backend.erase_page(addr)
        })
    }

    /// Erase the sector starting at `addr`, one page at a time
    pub fn erase_sector(&mut self, addr: u32) -> Result<()> {
        self.check_unit(addr, Unit::Sector)?;
        self.run_as(HandlerStatus::ErasingSector, |h| {
            debug!("Erasing sector at 0x{:08X}", addr);
            h.erase_pages(addr, Unit::Sector)
        })
    }

    /// Erase the block starting at `addr`
    ///
    /// The block is walked sector by sector and every page of each sector
    /// goes through [`erase_page`](Self::erase_page).
    pub fn erase_block(&mut self, addr: u32) -> Result<()> {
        self.check_unit(addr, Unit::Block)?;
        self.run_as(HandlerStatus::ErasingBlock, |h| {
            debug!("Erasing block at 0x{:08X}", addr);
            for sector in (0..Unit::Block.size()).step_by(SECTOR_SIZE) {
                h.erase_pages(addr + sector, Unit::Sector)?;
            }
            Ok(())
        })
    }

    /// Erase every whole page of the range
    ///
    /// Fails with [`Error::Busy`] unless the handler is free.
    pub fn erase_full_memory(&mut self) -> Result<()> {
        if !self.status.is_free() {
            return Err(Error::Busy {
                status: self.status,
            });
        }
        self.run_as(HandlerStatus::ErasingFull, |h| {
            let start = h.start_address;
            let pages = h.size() / Unit::Page.size();
            debug!("Erasing {} pages from 0x{:08X}", pages, start);
            for page in 0..pages {
                h.erase_page(start + page * Unit::Page.size())?;
            }
            Ok(())
        })
    }

    /// Erase the pages making up `unit` at `addr`, in ascending order
    fn erase_pages(&mut self, addr: u32, unit: Unit) -> Result<()> {
        for offset in (0..unit.size()).step_by(PAGE_SIZE) {
            self.erase_page(addr + offset)?;
        }
        Ok(())
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Write one page at `addr`
    ///
    /// Programming can only clear bits. If the current content has a bit
    /// cleared that `data` needs set, the page is erased before programming.
    pub fn write_page(&mut self, addr: u32, data: &Page) -> Result<()> {
        self.check_unit(addr, Unit::Page)?;
        self.run_as(HandlerStatus::WritingPage, |h| {
            h.backend.read_page(addr, &mut h.page_buf)?;
            if need_erase(&h.page_buf, data) {
                trace!("Page at 0x{:08X} needs erase before write", addr);
                h.backend.erase_page(addr)?;
            }
            trace!("Writing page at 0x{:08X}", addr);
            h.backend.program_page(addr, data)
        })
    }

    /// Write one sector at `addr` as 16 consecutive page writes
    ///
    /// Page `i` receives bytes `i * 256 .. (i + 1) * 256` of `data`.
    pub fn write_sector(&mut self, addr: u32, data: &Sector) -> Result<()> {
        self.check_unit(addr, Unit::Sector)?;
        self.run_as(HandlerStatus::WritingSector, |h| {
            debug!("Writing sector at 0x{:08X}", addr);
            let mut page = [ERASED_BYTE; PAGE_SIZE];
            for (i, chunk) in data.chunks_exact(PAGE_SIZE).enumerate() {
                page.copy_from_slice(chunk);
                h.write_page(addr + (i * PAGE_SIZE) as u32, &page)?;
            }
            Ok(())
        })
    }

    /// Write one block at `addr` as 16 consecutive sector writes
    pub fn write_block(&mut self, addr: u32, data: &Block) -> Result<()> {
        self.check_unit(addr, Unit::Block)?;
        self.run_as(HandlerStatus::WritingBlock, |h| {
            debug!("Writing block at 0x{:08X}", addr);
            let mut sector = [ERASED_BYTE; SECTOR_SIZE];
            for (i, chunk) in data.chunks_exact(SECTOR_SIZE).enumerate() {
                sector.copy_from_slice(chunk);
                h.write_sector(addr + (i * SECTOR_SIZE) as u32, &sector)?;
            }
            Ok(())
        })
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Read the page at `addr` into `buf`
    pub fn get_page(&mut self, addr: u32, buf: &mut Page) -> Result<()> {
        self.check_unit(addr, Unit::Page)?;
        self.run_as(HandlerStatus::ReadingPage, |h| {
            trace!("Reading page at 0x{:08X}", addr);
            h.backend.read_page(addr, buf)
        })
    }

    /// Read the sector at `addr` into `buf`, one page at a time
    pub fn get_sector(&mut self, addr: u32, buf: &mut Sector) -> Result<()> {
        self.check_unit(addr, Unit::Sector)?;
        self.run_as(HandlerStatus::ReadingSector, |h| {
            debug!("Reading sector at 0x{:08X}", addr);
            let mut page = [ERASED_BYTE; PAGE_SIZE];
            for (i, chunk) in buf.chunks_exact_mut(PAGE_SIZE).enumerate() {
                h.get_page(addr + (i * PAGE_SIZE) as u32, &mut page)?;
                chunk.copy_from_slice(&page);
            }
            Ok(())
        })
    }

    /// Read the block at `addr` into `buf`, one sector at a time
    pub fn get_block(&mut self, addr: u32, buf: &mut Block) -> Result<()> {
        self.check_unit(addr, Unit::Block)?;
        self.run_as(HandlerStatus::ReadingBlock, |h| {
            debug!("Reading block at 0x{:08X}", addr);
            let mut sector = [ERASED_BYTE; SECTOR_SIZE];
            for (i, chunk) in buf.chunks_exact_mut(SECTOR_SIZE).enumerate() {
                h.get_sector(addr + (i * SECTOR_SIZE) as u32, &mut sector)?;
                chunk.copy_from_slice(&sector);
            }
            Ok(())
        })
    }

    /// Read the page at `addr` and return its CRC16
    pub fn get_page_crc16(&mut self, addr: u32) -> Result<u16> {
        let mut page = [ERASED_BYTE; PAGE_SIZE];
        self.get_page(addr, &mut page)?;
        Ok(crc16(&page))
    }
}

impl<B> fmt::Debug for FlashHandler<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlashHandler")
            .field("start_address", &self.start_address)
            .field("end_address", &self.end_address)
            .field("status", &self.status)
            .field("check_mode", &self.check_mode)
            .finish_non_exhaustive()
    }
}
