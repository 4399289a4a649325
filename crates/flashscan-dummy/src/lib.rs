//! flashscan-dummy - In-memory NAND flash emulator for testing
//!
//! This crate provides a [`FlashBackend`] that emulates a NAND flash device
//! in memory. It follows the physical model of the real part (erase sets
//! bits, programming can only clear them) and can simulate stuck cells, so
//! the bad-block searcher can be exercised without hardware.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

use alloc::collections::BTreeSet;
use alloc::vec;
use alloc::vec::Vec;

use flashscan_core::error::{Error, Result};
use flashscan_core::geometry::{Page, ERASED_BYTE, PAGE_SIZE};
use flashscan_core::FlashBackend;

/// Configuration for the dummy flash
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Address of the first emulated byte
    pub base_address: u32,
    /// Emulated size in bytes
    pub size: usize,
    /// Byte addresses stuck in the erased state
    pub bad_cells: Vec<u32>,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            base_address: 0x0800_0000,
            size: 2 * 1024 * 1024,
            bad_cells: Vec::new(),
        }
    }
}

/// Operation counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DummyStats {
    /// Number of page erases
    pub erases: usize,
    /// Number of page programs
    pub programs: usize,
    /// Number of page reads
    pub reads: usize,
}

/// Dummy NAND flash
///
/// Emulates a NAND flash device in memory for testing purposes. A bad cell
/// always reads back as `0xFF`, whatever was programmed into it.
pub struct DummyNand {
    config: DummyConfig,
    data: Vec<u8>,
    /// Offsets of bad cells inside `data`
    bad: BTreeSet<usize>,
    stats: DummyStats,
}

impl DummyNand {
    /// Create a new dummy flash with the given configuration, fully erased
    pub fn new(config: DummyConfig) -> Self {
        let data = vec![ERASED_BYTE; config.size];
        let mut flash = Self {
            config,
            data,
            bad: BTreeSet::new(),
            stats: DummyStats::default(),
        };
        for addr in flash.config.bad_cells.clone() {
            flash.mark_bad(addr);
        }
        flash
    }

    /// Create a new dummy flash with the default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create a dummy flash with pre-filled data
    ///
    /// `initial_data` is placed at the base address. Bytes past the end of
    /// the emulated range are ignored. Bad cells keep reading as `0xFF`.
    pub fn with_data(config: DummyConfig, initial_data: &[u8]) -> Self {
        let mut flash = Self::new(config);
        let len = core::cmp::min(initial_data.len(), flash.data.len());
        for (i, &byte) in initial_data[..len].iter().enumerate() {
            if !flash.bad.contains(&i) {
                flash.data[i] = byte;
            }
        }
        flash
    }

    /// Get a reference to the flash data
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the configuration
    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Get the operation counters
    pub fn stats(&self) -> DummyStats {
        self.stats
    }

    /// Reset the operation counters
    pub fn reset_stats(&mut self) {
        self.stats = DummyStats::default();
    }

    /// Make the cell at byte address `addr` stuck in the erased state
    ///
    /// Addresses outside the emulated range are ignored.
    pub fn mark_bad(&mut self, addr: u32) {
        if let Some(offset) = self.offset_of(addr) {
            log::debug!("Dummy flash: cell 0x{:08X} marked bad", addr);
            self.bad.insert(offset);
            self.data[offset] = ERASED_BYTE;
        }
    }

    /// Check whether the cell at byte address `addr` is bad
    pub fn is_bad(&self, addr: u32) -> bool {
        self.offset_of(addr)
            .is_some_and(|offset| self.bad.contains(&offset))
    }

    fn offset_of(&self, addr: u32) -> Option<usize> {
        let offset = addr.checked_sub(self.config.base_address)? as usize;
        (offset < self.data.len()).then_some(offset)
    }

    /// Translate a page address into an offset range inside `data`
    fn page_range(&self, addr: u32) -> Result<core::ops::Range<usize>> {
        let offset = addr
            .checked_sub(self.config.base_address)
            .ok_or(Error::AddressOutOfRange { addr })? as usize;
        if offset + PAGE_SIZE > self.data.len() {
            return Err(Error::AddressOutOfRange { addr });
        }
        Ok(offset..offset + PAGE_SIZE)
    }
}

impl FlashBackend for DummyNand {
    fn erase_page(&mut self, addr: u32) -> Result<()> {
        let range = self.page_range(addr)?;
        self.data[range].fill(ERASED_BYTE);
        self.stats.erases += 1;
        Ok(())
    }

    fn program_page(&mut self, addr: u32, data: &Page) -> Result<()> {
        let range = self.page_range(addr)?;
        let start = range.start;

        // Flash programming: can only change 1 -> 0
        for (stored, &byte) in self.data[range].iter_mut().zip(data.iter()) {
            *stored &= byte;
        }
        for &offset in self.bad.range(start..start + PAGE_SIZE) {
            self.data[offset] = ERASED_BYTE;
        }

        self.stats.programs += 1;
        Ok(())
    }

    fn read_page(&mut self, addr: u32, buf: &mut Page) -> Result<()> {
        let range = self.page_range(addr)?;
        buf.copy_from_slice(&self.data[range]);
        self.stats.reads += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flashscan_core::geometry::{is_erased, BLOCK_SIZE, PAGES_PER_SECTOR, SECTOR_SIZE};
    use flashscan_core::{FlashHandler, HandlerStatus};

    const BASE: u32 = 0x0800_0000;

    fn small_config() -> DummyConfig {
        DummyConfig {
            base_address: BASE,
            size: 4 * BLOCK_SIZE,
            bad_cells: Vec::new(),
        }
    }

    #[test]
    fn test_starts_erased() {
        let flash = DummyNand::new(small_config());
        assert_eq!(flash.data().len(), 4 * BLOCK_SIZE);
        assert!(is_erased(flash.data()));
    }

    #[test]
    fn test_program_only_clears_bits() {
        let mut flash = DummyNand::new(small_config());
        flash.program_page(BASE, &[0x0F; PAGE_SIZE]).unwrap();
        flash.program_page(BASE, &[0xF3; PAGE_SIZE]).unwrap();

        let mut buf = [0u8; PAGE_SIZE];
        flash.read_page(BASE, &mut buf).unwrap();
        assert_eq!(buf, [0x03; PAGE_SIZE]);
    }

    #[test]
    fn test_erase() {
        let mut flash = DummyNand::new(small_config());
        flash.program_page(BASE + 0x100, &[0x00; PAGE_SIZE]).unwrap();
        flash.erase_page(BASE + 0x100).unwrap();

        let mut buf = [0x00u8; PAGE_SIZE];
        flash.read_page(BASE + 0x100, &mut buf).unwrap();
        assert!(is_erased(&buf));
        assert_eq!(
            flash.stats(),
            DummyStats {
                erases: 1,
                programs: 1,
                reads: 1
            }
        );
    }

    #[test]
    fn test_out_of_bounds() {
        let mut flash = DummyNand::new(small_config());
        let mut buf = [0u8; PAGE_SIZE];
        let past_end = BASE + (4 * BLOCK_SIZE) as u32;

        assert_eq!(
            flash.erase_page(BASE - PAGE_SIZE as u32),
            Err(Error::AddressOutOfRange {
                addr: BASE - PAGE_SIZE as u32
            })
        );
        assert_eq!(
            flash.read_page(past_end, &mut buf),
            Err(Error::AddressOutOfRange { addr: past_end })
        );
        assert!(flash.program_page(past_end - 1, &buf).is_err());
        assert_eq!(flash.stats(), DummyStats::default());
    }

    #[test]
    fn test_bad_cell_reads_erased() {
        let mut config = small_config();
        config.bad_cells.push(BASE + 0x205);
        let mut flash = DummyNand::new(config);
        assert!(flash.is_bad(BASE + 0x205));
        assert!(!flash.is_bad(BASE + 0x204));

        flash.program_page(BASE + 0x200, &[0x00; PAGE_SIZE]).unwrap();
        let mut buf = [0u8; PAGE_SIZE];
        flash.read_page(BASE + 0x200, &mut buf).unwrap();
        assert_eq!(buf[5], 0xFF);
        assert_eq!(buf.iter().filter(|&&b| b == 0x00).count(), PAGE_SIZE - 1);
    }

    #[test]
    fn test_bad_cell_only_affects_its_page() {
        let mut config = small_config();
        config.bad_cells.extend([BASE + 0x1FF, BASE + 0x300]);
        let mut flash = DummyNand::new(config);

        flash.program_page(BASE + 0x200, &[0x00; PAGE_SIZE]).unwrap();
        flash.program_page(BASE + 0x300, &[0x00; PAGE_SIZE]).unwrap();

        let mut buf = [0xFFu8; PAGE_SIZE];
        flash.read_page(BASE + 0x200, &mut buf).unwrap();
        assert_eq!(buf, [0x00; PAGE_SIZE]);
        flash.read_page(BASE + 0x300, &mut buf).unwrap();
        assert_eq!(buf[0], 0xFF);
        assert!(buf[1..].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_with_data() {
        let image = [0x11u8, 0x22, 0x33];
        let mut config = small_config();
        config.bad_cells.push(BASE + 1);
        let flash = DummyNand::with_data(config, &image);
        assert_eq!(&flash.data()[..4], &[0x11, 0xFF, 0x33, 0xFF]);
    }

    #[test]
    fn test_handler_over_dummy() {
        let end = BASE + (4 * BLOCK_SIZE) as u32;
        let mut handler = FlashHandler::new(BASE, end, DummyNand::new(small_config()));

        let mut sector = [0u8; SECTOR_SIZE];
        for (i, byte) in sector.iter_mut().enumerate() {
            *byte = i as u8;
        }
        let addr = BASE + SECTOR_SIZE as u32;
        handler.write_sector(addr, &sector).unwrap();

        let mut readback = [0u8; SECTOR_SIZE];
        handler.get_sector(addr, &mut readback).unwrap();
        assert_eq!(readback[..], sector[..]);
        assert_eq!(handler.backend().stats().programs, PAGES_PER_SECTOR);

        handler.erase_full_memory().unwrap();
        assert!(is_erased(handler.backend().data()));
        assert_eq!(handler.status(), HandlerStatus::Free);
    }
}
