//! CRC command implementation

use std::fs;
use std::path::Path;

use flashscan_core::geometry::{ERASED_BYTE, PAGE_SIZE};
use flashscan_core::FlashHandler;
use flashscan_dummy::{DummyConfig, DummyNand};

/// Run the crc command
///
/// The image is loaded at `base`. A partial last page is padded with the
/// erased value.
pub fn run_crc(input: &Path, base: u32) -> Result<(), Box<dyn std::error::Error>> {
    let mut image = fs::read(input)?;
    if image.is_empty() {
        return Err(format!("{} is empty", input.display()).into());
    }
    log::info!("Read {} bytes from {}", image.len(), input.display());

    let padded = image.len().div_ceil(PAGE_SIZE) * PAGE_SIZE;
    image.resize(padded, ERASED_BYTE);

    let end = u32::try_from(padded)
        .ok()
        .and_then(|len| base.checked_add(len))
        .ok_or_else(|| format!("Image does not fit above 0x{:08X}", base))?;

    let config = DummyConfig {
        base_address: base,
        size: padded,
        bad_cells: Vec::new(),
    };
    let mut handler = FlashHandler::new(base, end, DummyNand::with_data(config, &image));

    for addr in (base..end).step_by(PAGE_SIZE) {
        let crc = handler.get_page_crc16(addr)?;
        println!("0x{:08X}: 0x{:04X}", addr, crc);
    }

    Ok(())
}
