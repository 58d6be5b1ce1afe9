//! Flash programming flow
//!
//! A firmware update is a linear sequence: reboot into the bootloader,
//! re-discover the device, erase the chip, then write and verify the
//! loader/config region and the main region with full read-back comparison.
//!
//! The loader region is written in its own pass at `loader_offset`, then the
//! image is written once more from offset 0; the second pass re-covers the
//! head of the loader region. Both passes are verified independently, so the
//! staged order is preserved exactly as the hardware expects it.
//!
//! Any failure after the erase triggers a second erase before the error is
//! surfaced: the device is left blank rather than half-flashed.

mod image;

pub use image::{padded, FirmwareImage, FirmwareVersion, ImageHeader, FLASH_PAGE_SIZE};

use std::path::Path;
use std::thread;

use crate::device::{DeviceBackend, Session, BOOTLOADER_SETTLE_DELAY};
use crate::error::{Error, Result};

/// Progress reporting for the flash flow
///
/// All methods default to no-ops; the CLI hooks these to spinners.
pub trait FlashProgress {
    /// The chip erase is starting
    fn erasing(&mut self) {}
    /// The image's embedded version triple, informational only
    fn version(&mut self, _version: &FirmwareVersion) {}
    /// The loader/config region write is starting (`len` bytes)
    fn writing_loader(&mut self, _len: usize) {}
    /// The loader/config region read-back compare is starting
    fn verifying_loader(&mut self) {}
    /// The main region write is starting (`len` bytes)
    fn writing_main(&mut self, _len: usize) {}
    /// The full-image read-back compare is starting
    fn verifying_main(&mut self) {}
    /// A failure occurred and the chip is being erased back to blank
    fn rolling_back(&mut self) {}
}

/// No-op progress for tests and non-interactive callers
impl FlashProgress for () {}

/// Write the firmware image at `path` to the device flash
pub fn flash_firmware<B, P>(
    session: &mut Session<B>,
    path: &Path,
    progress: &mut P,
) -> Result<()>
where
    B: DeviceBackend,
    P: FlashProgress,
{
    session.reboot_to_bootloader()?;
    thread::sleep(BOOTLOADER_SETTLE_DELAY);
    session.discover()?;

    progress.erasing();
    session.erase_flash()?;

    let result = program_image(session, path, progress);
    if result.is_err() {
        progress.rolling_back();
        // Leave the chip blank rather than half-flashed; the original
        // failure is what gets reported
        let _ = session.erase_flash();
    }
    result
}

fn program_image<B, P>(session: &mut Session<B>, path: &Path, progress: &mut P) -> Result<()>
where
    B: DeviceBackend,
    P: FlashProgress,
{
    let image = FirmwareImage::load(path)?;
    let header = image.header()?;
    let version = image.version(&header)?;
    log::info!("File FW Version: {}", version);
    progress.version(&version);

    // Loader/config region, page-padded span
    let loader_span = padded(header.loader_len);
    let loader_data = &image.data()[header.loader_offset..header.loader_offset + loader_span];
    progress.writing_loader(loader_span);
    session.write_flash(header.loader_offset as u32, loader_data)?;

    progress.verifying_loader();
    let mut readback = vec![0u8; loader_span];
    session.read_flash(header.loader_offset as u32, &mut readback)?;
    compare(loader_data, &readback, header.loader_offset)?;

    // Full image from the start; re-covers the head of the loader region
    let main_span = padded(header.main_len);
    progress.writing_main(main_span);
    session.write_flash(0, &image.data()[..main_span])?;

    progress.verifying_main();
    let mut readback = vec![0u8; image.data().len()];
    session.read_flash(0, &mut readback)?;
    let verify_len = header.main_len + header.loader_len;
    compare(&image.data()[..verify_len], &readback[..verify_len], 0)?;

    Ok(())
}

// Byte-compare a read-back span, reporting the first mismatch at its
// absolute flash offset
fn compare(expected: &[u8], found: &[u8], base: usize) -> Result<()> {
    for (i, (e, f)) in expected.iter().zip(found.iter()).enumerate() {
        if e != f {
            return Err(Error::FlashVerify {
                offset: base + i,
                expected: *e,
                found: *f,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compare_reports_absolute_offset() {
        let expected = [0x11, 0x22, 0x33];
        let found = [0x11, 0x2A, 0x33];
        match compare(&expected, &found, 0x2000) {
            Err(Error::FlashVerify {
                offset: 0x2001,
                expected: 0x22,
                found: 0x2A,
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn compare_accepts_identical_spans() {
        let data = [0xA5u8; 64];
        assert!(compare(&data, &data, 0).is_ok());
    }
}
