//! Scan command implementation

use std::fs;

use flashscan_core::geometry::Unit;
use flashscan_core::FlashHandler;
use flashscan_dummy::{DummyConfig, DummyNand};
use flashscan_search::{BadBlockSearcher, ScanObserver, ScanReport};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::ScanConfig;

/// Progress bar fed by the searcher
struct ProgressObserver {
    pb: ProgressBar,
    bad_pages: usize,
}

impl ProgressObserver {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}")?
                .progress_chars("#>-"),
        );
        pb.set_message("Scanning");
        Ok(Self { pb, bad_pages: 0 })
    }

    fn finish(&self) {
        self.pb
            .finish_with_message(format!("Scan complete, {} bad pages", self.bad_pages));
    }
}

impl ScanObserver for ProgressObserver {
    fn scan_started(&mut self, total_bytes: u64) {
        self.pb.set_length(total_bytes);
    }

    fn unit_finished(&mut self, _addr: u32, unit: Unit, bad_pages: usize) {
        self.bad_pages += bad_pages;
        if bad_pages > 0 {
            self.pb
                .set_message(format!("Scanning, {} bad pages", self.bad_pages));
        }
        self.pb.inc(unit.size() as u64);
    }
}

/// Build the emulated device described by `config`
fn open_device(config: &ScanConfig) -> Result<DummyNand, Box<dyn std::error::Error>> {
    let dummy_config = DummyConfig {
        base_address: config.range.start,
        size: config.size(),
        bad_cells: config.device.bad_cells.clone(),
    };

    match &config.device.image {
        Some(path) => {
            let image = fs::read(path)
                .map_err(|e| format!("Failed to read image {}: {}", path.display(), e))?;
            log::info!("Loaded {} bytes from {}", image.len(), path.display());
            if image.len() > config.size() {
                log::warn!(
                    "Image is larger than the range, {} bytes ignored",
                    image.len() - config.size()
                );
            }
            Ok(DummyNand::with_data(dummy_config, &image))
        }
        None => Ok(DummyNand::new(dummy_config)),
    }
}

/// Run the scan command
///
/// Returns whether the device is clean.
pub fn run_scan(config: &ScanConfig) -> Result<bool, Box<dyn std::error::Error>> {
    config.validate()?;

    let device = open_device(config)?;
    let mut handler = FlashHandler::new(config.range.start, config.range.end, device);

    let mut observer = ProgressObserver::new()?;
    let report = {
        let mut searcher = BadBlockSearcher::new(&mut handler).with_observer(&mut observer);
        searcher.scan();
        searcher.into_report()
    };
    observer.finish();

    let stats = handler.backend().stats();
    log::debug!(
        "Device operations: {} erases, {} programs, {} reads",
        stats.erases,
        stats.programs,
        stats.reads
    );

    print_report(&report);
    Ok(report.is_clean())
}

fn print_report(report: &ScanReport) {
    println!("Pages checked: {}", report.pages_checked);

    if report.is_clean() {
        println!("No bad blocks found");
        return;
    }

    if !report.bad_pages.is_empty() {
        println!("Bad pages:");
        for page in &report.bad_pages {
            println!(
                "  0x{:08X}: {} bad bytes, first at offset {}",
                page.address, page.bad_bytes, page.first_bad_offset
            );
        }
        println!("Bad blocks:");
        for block in &report.bad_blocks {
            println!("  0x{:08X}", block);
        }
    }

    if !report.failures.is_empty() {
        println!("Unchecked units:");
        for failure in &report.failures {
            println!(
                "  {} at 0x{:08X}: {}",
                failure.unit, failure.address, failure.error
            );
        }
    }
}
