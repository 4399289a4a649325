//! Flash geometry: unit sizes and fixed-size buffer types
//!
//! The device is organised as pages, sectors and blocks. Sizes are fixed
//! at compile time so that buffer-size mismatches are type errors rather
//! than runtime failures.

/// Size of a page in bytes (atomic erase/write/read unit)
pub const PAGE_SIZE: usize = 256;
/// Size of a sector in bytes
pub const SECTOR_SIZE: usize = 4096;
/// Size of a block in bytes
pub const BLOCK_SIZE: usize = 65536;

/// Number of pages in a sector
pub const PAGES_PER_SECTOR: usize = SECTOR_SIZE / PAGE_SIZE;
/// Number of sectors in a block
pub const SECTORS_PER_BLOCK: usize = BLOCK_SIZE / SECTOR_SIZE;
/// Number of pages in a block
pub const PAGES_PER_BLOCK: usize = BLOCK_SIZE / PAGE_SIZE;

/// The erased value for flash memory (all bits set)
pub const ERASED_BYTE: u8 = 0xFF;

/// One page of data
pub type Page = [u8; PAGE_SIZE];
/// One sector of data
pub type Sector = [u8; SECTOR_SIZE];
/// One block of data
pub type Block = [u8; BLOCK_SIZE];

/// A unit of the flash hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// 256-byte page
    Page,
    /// 4 KiB sector (16 pages)
    Sector,
    /// 64 KiB block (16 sectors)
    Block,
}

impl Unit {
    /// Size of this unit in bytes
    pub const fn size(self) -> u32 {
        match self {
            Self::Page => PAGE_SIZE as u32,
            Self::Sector => SECTOR_SIZE as u32,
            Self::Block => BLOCK_SIZE as u32,
        }
    }
}

impl core::fmt::Display for Unit {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Sector => write!(f, "sector"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// Determine if an erase is required before programming `want` over `have`
///
/// Programming can only clear bits (1 -> 0). If any bit that must be 1 in
/// `want` is currently 0 in `have`, the page has to be erased first.
pub fn need_erase(have: &[u8], want: &[u8]) -> bool {
    debug_assert_eq!(have.len(), want.len());
    have.iter().zip(want.iter()).any(|(h, w)| (h & w) != *w)
}

/// Check whether every byte of `data` is in the erased state
#[inline]
pub fn is_erased(data: &[u8]) -> bool {
    data.iter().all(|&b| b == ERASED_BYTE)
}
