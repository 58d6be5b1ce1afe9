//! wflash command

use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use axflasher_core::device::{DeviceBackend, Session};
use axflasher_core::flash::{self, FirmwareVersion, FlashProgress};
use axflasher_core::Result;

/// Spinner-per-phase progress reporter for the flash flow
struct SpinnerProgress {
    current: Option<ProgressBar>,
}

impl SpinnerProgress {
    fn new() -> Self {
        Self { current: None }
    }

    fn start(&mut self, message: String) {
        self.finish();
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current = Some(pb);
    }

    fn finish(&mut self) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
        }
    }
}

impl FlashProgress for SpinnerProgress {
    fn erasing(&mut self) {
        self.start("Erasing flash...".to_string());
    }

    fn version(&mut self, version: &FirmwareVersion) {
        let line = format!("File FW Version: {version}");
        match &self.current {
            Some(pb) => pb.println(line),
            None => println!("{line}"),
        }
    }

    fn writing_loader(&mut self, len: usize) {
        self.start(format!("Writing loader region ({len} bytes)..."));
    }

    fn verifying_loader(&mut self) {
        self.start("Verifying loader region...".to_string());
    }

    fn writing_main(&mut self, len: usize) {
        self.start(format!("Writing main region ({len} bytes)..."));
    }

    fn verifying_main(&mut self) {
        self.start("Verifying main region...".to_string());
    }

    fn rolling_back(&mut self) {
        self.start("Erasing flash after failure...".to_string());
    }
}

pub fn run<B: DeviceBackend>(session: &mut Session<B>, file: &Path) -> Result<()> {
    let mut progress = SpinnerProgress::new();
    let result = flash::flash_firmware(session, file, &mut progress);
    progress.finish();
    if result.is_ok() {
        println!("Flash programming complete");
    }
    result
}
