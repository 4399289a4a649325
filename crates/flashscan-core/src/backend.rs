//! Physical backend abstraction
//!
//! The [`FlashBackend`] trait is the substitution point between the
//! handler's hierarchy logic and whatever actually talks to the chip: a
//! bus driver on real hardware, or an in-memory emulator in tests. The
//! handler validates addresses and tracks its status around every call;
//! backends only move bytes.

use crate::error::Result;
use crate::geometry::Page;

/// Page-level access to a NAND flash device
///
/// All three operations work on exactly one page. Addresses are absolute
/// device addresses, already validated against the handler's range.
///
/// # Physical model
///
/// - `erase_page` sets every bit of the page to 1 (`0xFF` bytes).
/// - `program_page` can only clear bits: the stored value becomes
///   `old & data`.
/// - `read_page` returns the stored bytes.
///
/// Implementations block until the device acknowledges completion and
/// report failures with the page address (`EraseFailed`, `WriteFailed`,
/// `ReadFailed`).
pub trait FlashBackend {
    /// Erase the page starting at `addr`
    fn erase_page(&mut self, addr: u32) -> Result<()>;

    /// Program the page starting at `addr` with `data`
    fn program_page(&mut self, addr: u32, data: &Page) -> Result<()>;

    /// Read the page starting at `addr` into `buf`
    fn read_page(&mut self, addr: u32, buf: &mut Page) -> Result<()>;
}

impl<B: FlashBackend + ?Sized> FlashBackend for &mut B {
    fn erase_page(&mut self, addr: u32) -> Result<()> {
        (**self).erase_page(addr)
    }

    fn program_page(&mut self, addr: u32, data: &Page) -> Result<()> {
        (**self).program_page(addr, data)
    }

    fn read_page(&mut self, addr: u32, buf: &mut Page) -> Result<()> {
        (**self).read_page(addr, buf)
    }
}
