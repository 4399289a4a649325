//! Scan results

use flashscan_core::geometry::{Unit, BLOCK_SIZE};
use flashscan_core::Error;

/// A page whose content did not match the written pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadPage {
    /// Page address
    pub address: u32,
    /// Largest number of mismatching bytes seen in a single pass
    pub bad_bytes: usize,
    /// Lowest mismatching offset within the page, over all passes
    pub first_bad_offset: usize,
}

impl BadPage {
    /// Compare `page` against a page filled with `expected`
    ///
    /// Returns `None` if every byte matches.
    pub fn from_mismatch(address: u32, page: &[u8], expected: u8) -> Option<Self> {
        let first_bad_offset = page.iter().position(|&b| b != expected)?;
        let bad_bytes = page[first_bad_offset..]
            .iter()
            .filter(|&&b| b != expected)
            .count();
        Some(Self {
            address,
            bad_bytes,
            first_bad_offset,
        })
    }

    pub(crate) fn merge(&mut self, other: &BadPage) {
        self.bad_bytes = self.bad_bytes.max(other.bad_bytes);
        self.first_bad_offset = self.first_bad_offset.min(other.first_bad_offset);
    }
}

/// A unit that could not be checked because an operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitFailure {
    /// Start address of the unit
    pub address: u32,
    /// Unit being checked
    pub unit: Unit,
    /// First error returned by the handler
    pub error: Error,
}

/// Results of a bad-block scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    /// Pages that went through every pass
    pub pages_checked: usize,
    /// Bad pages, in address order
    pub bad_pages: Vec<BadPage>,
    /// Addresses of blocks holding at least one bad page
    pub bad_blocks: Vec<u32>,
    /// Units that could not be checked
    pub failures: Vec<UnitFailure>,
}

impl ScanReport {
    /// Whether the scan found no bad page and hit no failure
    pub fn is_clean(&self) -> bool {
        self.bad_pages.is_empty() && self.failures.is_empty()
    }

    /// Fill `bad_blocks` from `bad_pages`
    ///
    /// Blocks are counted from `start`, the first address of the scanned
    /// range.
    pub(crate) fn collect_bad_blocks(&mut self, start: u32) {
        let block = BLOCK_SIZE as u32;
        self.bad_blocks = self
            .bad_pages
            .iter()
            .map(|page| start + (page.address - start) / block * block)
            .collect();
        self.bad_blocks.dedup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_mismatch() {
        let mut page = [0xAA; 256];
        assert_eq!(BadPage::from_mismatch(0x100, &page, 0xAA), None);

        page[4] = 0xFF;
        page[200] = 0xAB;
        assert_eq!(
            BadPage::from_mismatch(0x100, &page, 0xAA),
            Some(BadPage {
                address: 0x100,
                bad_bytes: 2,
                first_bad_offset: 4,
            })
        );
    }

    #[test]
    fn test_merge() {
        let mut a = BadPage {
            address: 0,
            bad_bytes: 1,
            first_bad_offset: 10,
        };
        a.merge(&BadPage {
            address: 0,
            bad_bytes: 3,
            first_bad_offset: 12,
        });
        assert_eq!(a.bad_bytes, 3);
        assert_eq!(a.first_bad_offset, 10);
    }

    #[test]
    fn test_collect_bad_blocks() {
        let page = |address| BadPage {
            address,
            bad_bytes: 1,
            first_bad_offset: 0,
        };
        let mut report = ScanReport {
            bad_pages: vec![page(0x1000_0100), page(0x1000_FF00), page(0x1003_0000)],
            ..Default::default()
        };
        report.collect_bad_blocks(0x1000_0000);
        assert_eq!(report.bad_blocks, vec![0x1000_0000, 0x1003_0000]);
        assert!(!report.is_clean());
    }
}
