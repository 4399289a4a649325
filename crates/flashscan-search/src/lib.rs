//! flashscan-search - Bad-block searcher
//!
//! Drives a [`FlashHandler`] through a destructive scan of its whole range
//! and classifies pages whose content does not survive an erase/write
//! cycle as bad.
//!
//! # Algorithm
//!
//! The range is covered by whole blocks first; a tail that does not fill a
//! block is covered by whole sectors, then by whole pages. Each unit goes
//! through four passes: an erase-only pass followed by one pass per test
//! pattern (`0x00`, `0xAA`, `0x55`). A pass has two phases:
//!
//! 1. normal phase (check mode off): erase the unit, then write it filled
//!    with the pattern;
//! 2. verification phase (check mode on): compare the CRC16 of every page
//!    with the CRC16 of the expected page, and on mismatch read the page
//!    back to count the differing bytes.
//!
//! A block containing at least one bad page is reported as a bad block.
//!
//! # Example
//!
//! ```ignore
//! use flashscan_core::FlashHandler;
//! use flashscan_dummy::DummyNand;
//! use flashscan_search::BadBlockSearcher;
//!
//! let mut handler = FlashHandler::new(0x0800_0000, 0x0820_0000, DummyNand::new_default());
//! let mut searcher = BadBlockSearcher::new(&mut handler);
//! searcher.scan();
//! for block in &searcher.report().bad_blocks {
//!     println!("bad block at 0x{:08X}", block);
//! }
//! ```

mod report;

pub use report::{BadPage, ScanReport, UnitFailure};

use flashscan_core::crc16::crc16;
use flashscan_core::geometry::{Block, Unit, BLOCK_SIZE, ERASED_BYTE, PAGE_SIZE, SECTOR_SIZE};
use flashscan_core::{FlashBackend, FlashHandler, Result};
use log::{debug, info, warn};

/// Byte patterns written during a scan, after the erase-only pass
pub const TEST_PATTERNS: [u8; 3] = [0x00, 0xAA, 0x55];

/// Receives progress notifications during a scan
pub trait ScanObserver {
    /// Called once before the first unit with the number of bytes to scan
    fn scan_started(&mut self, _total_bytes: u64) {}

    /// Called after every unit, whether it passed, had bad pages or failed
    fn unit_finished(&mut self, _addr: u32, _unit: Unit, _bad_pages: usize) {}
}

/// Observer that ignores every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

impl<O: ScanObserver + ?Sized> ScanObserver for &mut O {
    fn scan_started(&mut self, total_bytes: u64) {
        (**self).scan_started(total_bytes)
    }

    fn unit_finished(&mut self, addr: u32, unit: Unit, bad_pages: usize) {
        (**self).unit_finished(addr, unit, bad_pages)
    }
}

/// Bad-block searcher over one flash handler
pub struct BadBlockSearcher<'a, B, O = NoopObserver> {
    handler: &'a mut FlashHandler<B>,
    observer: O,
    report: ScanReport,
    /// Pattern-filled data for block writes
    block_buf: Box<Block>,
}

impl<'a, B: FlashBackend> BadBlockSearcher<'a, B> {
    /// Create a searcher driving `handler`
    pub fn new(handler: &'a mut FlashHandler<B>) -> Self {
        Self {
            handler,
            observer: NoopObserver,
            report: ScanReport::default(),
            block_buf: Box::new([ERASED_BYTE; BLOCK_SIZE]),
        }
    }
}

impl<'a, B: FlashBackend, O: ScanObserver> BadBlockSearcher<'a, B, O> {
    /// Replace the progress observer
    pub fn with_observer<P: ScanObserver>(self, observer: P) -> BadBlockSearcher<'a, B, P> {
        BadBlockSearcher {
            handler: self.handler,
            observer,
            report: self.report,
            block_buf: self.block_buf,
        }
    }

    /// Results of the last scan
    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    /// Consume the searcher and return the results of the last scan
    pub fn into_report(self) -> ScanReport {
        self.report
    }

    /// Scan the whole range of the handler
    ///
    /// The content of the range is destroyed. Results replace those of any
    /// previous scan and are available from [`report`](Self::report).
    pub fn scan(&mut self) {
        let start = self.handler.start_address();
        let end = self.handler.end_address();
        info!("Scanning 0x{:08X}..0x{:08X} for bad blocks", start, end);

        self.report = ScanReport::default();
        self.observer.scan_started(self.handler.size() as u64);

        let mut addr = start;
        while self.handler.is_valid_unit(addr, Unit::Block) {
            self.scan_unit(addr, Unit::Block);
            addr += Unit::Block.size();
        }
        while self.handler.is_valid_unit(addr, Unit::Sector) {
            self.scan_unit(addr, Unit::Sector);
            addr += Unit::Sector.size();
        }
        while self.handler.is_valid_unit(addr, Unit::Page) {
            self.scan_unit(addr, Unit::Page);
            addr += Unit::Page.size();
        }

        self.handler.disable_check_mode();
        self.report.collect_bad_blocks(start);

        info!(
            "Scan finished: {} pages checked, {} bad pages in {} blocks, {} failures",
            self.report.pages_checked,
            self.report.bad_pages.len(),
            self.report.bad_blocks.len(),
            self.report.failures.len()
        );
    }

    fn scan_unit(&mut self, addr: u32, unit: Unit) {
        debug!("Checking {} at 0x{:08X}", unit, addr);
        let mut found = Vec::new();

        match self.check_unit(addr, unit, &mut found) {
            Ok(()) => {
                self.report.pages_checked += (unit.size() as usize) / PAGE_SIZE;
            }
            Err(error) => {
                warn!("Checking {} at 0x{:08X} failed: {}", unit, addr, error);
                self.report.failures.push(UnitFailure {
                    address: addr,
                    unit,
                    error,
                });
            }
        }

        found.sort_unstable_by_key(|page| page.address);
        for page in &found {
            warn!(
                "Bad page at 0x{:08X}: {} bad bytes, first at offset {}",
                page.address, page.bad_bytes, page.first_bad_offset
            );
        }
        self.observer.unit_finished(addr, unit, found.len());
        self.report.bad_pages.extend(found);
    }

    /// Run the erase pass and every pattern pass over one unit
    fn check_unit(&mut self, addr: u32, unit: Unit, found: &mut Vec<BadPage>) -> Result<()> {
        let passes = core::iter::once(None).chain(TEST_PATTERNS.iter().copied().map(Some));

        for pattern in passes {
            self.handler.disable_check_mode();
            self.erase_unit(addr, unit)?;
            if let Some(pattern) = pattern {
                self.write_unit(addr, unit, pattern)?;
            }

            self.handler.enable_check_mode();
            self.verify_unit(addr, unit, pattern.unwrap_or(ERASED_BYTE), found)?;
        }

        Ok(())
    }

    fn erase_unit(&mut self, addr: u32, unit: Unit) -> Result<()> {
        match unit {
            Unit::Block => self.handler.erase_block(addr),
            Unit::Sector => self.handler.erase_sector(addr),
            Unit::Page => self.handler.erase_page(addr),
        }
    }

    fn write_unit(&mut self, addr: u32, unit: Unit, pattern: u8) -> Result<()> {
        match unit {
            Unit::Block => {
                self.block_buf.fill(pattern);
                self.handler.write_block(addr, &self.block_buf)
            }
            Unit::Sector => self.handler.write_sector(addr, &[pattern; SECTOR_SIZE]),
            Unit::Page => self.handler.write_page(addr, &[pattern; PAGE_SIZE]),
        }
    }

    fn verify_unit(
        &mut self,
        addr: u32,
        unit: Unit,
        expected: u8,
        found: &mut Vec<BadPage>,
    ) -> Result<()> {
        let expected_crc = crc16(&[expected; PAGE_SIZE]);
        let mut page = [ERASED_BYTE; PAGE_SIZE];

        for offset in (0..unit.size()).step_by(PAGE_SIZE) {
            let page_addr = addr + offset;
            if self.handler.get_page_crc16(page_addr)? == expected_crc {
                continue;
            }

            self.handler.get_page(page_addr, &mut page)?;
            if let Some(bad) = BadPage::from_mismatch(page_addr, &page, expected) {
                match found.iter_mut().find(|p| p.address == page_addr) {
                    Some(existing) => existing.merge(&bad),
                    None => found.push(bad),
                }
            }
        }

        Ok(())
    }
}
