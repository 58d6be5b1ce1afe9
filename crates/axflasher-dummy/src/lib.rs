//! axflasher-dummy - In-memory device emulator for testing
//!
//! Emulates the AX88179A backend without hardware: a NOR-style flash buffer
//! (writes clear bits, erase sets everything to 0xFF), an OTP-style eFuse
//! array (programming can only set bits), and fault-injection hooks for
//! discovery, status codes, and read-back corruption.
//!
//! The tests in this crate drive the core programming flows end to end
//! against the emulator.

use std::io;

use axflasher_core::device::{DeviceBackend, DRIVER_SIGNATURE};
use axflasher_core::efuse::{Block, EfuseImage, BLOCK_SIZE, NUM_BLOCKS};
use axflasher_core::error::{Error, Result};

/// Configuration for the emulated device
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Interface name the device shows up on
    pub interface: String,
    /// Signature the driver answers to the signature query
    pub signature: String,
    /// Flash size in bytes
    pub flash_size: usize,
    /// Firmware version string the device reports
    pub firmware_version: [u8; 16],
    /// Link-layer address of the interface
    pub mac: [u8; 6],
    /// Enumeration rounds that miss before the signature query matches
    pub scan_failures: u32,
}

impl Default for DummyConfig {
    fn default() -> Self {
        let mut firmware_version = [0u8; 16];
        firmware_version[..5].copy_from_slice(b"1.0.0");
        Self {
            interface: "eth0".to_string(),
            signature: DRIVER_SIGNATURE.to_string(),
            flash_size: 512 * 1024,
            firmware_version,
            mac: [0x00, 0x0E, 0xC6, 0x81, 0x79, 0x0A],
            scan_failures: 0,
        }
    }
}

/// Emulated device backend
pub struct DummyDevice {
    config: DummyConfig,
    flash: Vec<u8>,
    efuse: EfuseImage,
    scan_rounds: u32,
    erase_count: u32,
    program_count: u32,
    reboot_count: u32,
    reset_count: u32,
    corrupt_read_at: Option<usize>,
    write_status: Option<i32>,
}

impl DummyDevice {
    /// Create an emulated device with the given configuration
    ///
    /// The flash starts fully erased and the eFuse array fully empty.
    pub fn new(config: DummyConfig) -> Self {
        let flash = vec![0xFF; config.flash_size];
        Self {
            config,
            flash,
            efuse: EfuseImage::new(),
            scan_rounds: 0,
            erase_count: 0,
            program_count: 0,
            reboot_count: 0,
            reset_count: 0,
            corrupt_read_at: None,
            write_status: None,
        }
    }

    /// Create an emulated device with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Create an emulated device with a pre-programmed eFuse array
    pub fn with_efuse(config: DummyConfig, efuse: EfuseImage) -> Self {
        let mut device = Self::new(config);
        device.efuse = efuse;
        device
    }

    /// The flash contents
    pub fn flash(&self) -> &[u8] {
        &self.flash
    }

    /// The eFuse array
    pub fn efuse(&self) -> &EfuseImage {
        &self.efuse
    }

    /// Enumeration rounds seen so far
    pub fn scan_rounds(&self) -> u32 {
        self.scan_rounds
    }

    /// Erase requests seen so far
    pub fn erase_count(&self) -> u32 {
        self.erase_count
    }

    /// eFuse blocks programmed so far
    pub fn program_count(&self) -> u32 {
        self.program_count
    }

    /// Reboot-to-bootloader requests seen so far
    pub fn reboot_count(&self) -> u32 {
        self.reboot_count
    }

    /// Software-reset requests seen so far
    pub fn reset_count(&self) -> u32 {
        self.reset_count
    }

    /// Flip one bit of every flash read covering `offset`
    pub fn corrupt_reads_at(&mut self, offset: usize) {
        self.corrupt_read_at = Some(offset);
    }

    /// Report `status` for the next flash write request
    pub fn fail_next_write(&mut self, status: i32) {
        self.write_status = Some(status);
    }

    fn check_range(&self, offset: u32, len: usize) -> Result<()> {
        let end = offset as usize + len;
        if end > self.flash.len() {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("flash access {offset:#x}+{len:#x} out of range"),
            )));
        }
        Ok(())
    }
}

impl DeviceBackend for DummyDevice {
    fn candidates(&mut self) -> Result<Vec<String>> {
        self.scan_rounds += 1;
        Ok(vec![self.config.interface.clone()])
    }

    fn query_signature(&mut self, _iface: &str) -> Result<String> {
        if self.scan_rounds > self.config.scan_failures {
            Ok(self.config.signature.clone())
        } else {
            // Some other driver answers until the device shows up
            Ok("dummy net".to_string())
        }
    }

    fn read_firmware_version(&mut self, _iface: &str) -> Result<[u8; 16]> {
        Ok(self.config.firmware_version)
    }

    fn read_flash(&mut self, _iface: &str, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.check_range(offset, buf.len())?;
        let start = offset as usize;
        buf.copy_from_slice(&self.flash[start..start + buf.len()]);
        if let Some(at) = self.corrupt_read_at {
            if at >= start && at < start + buf.len() {
                buf[at - start] ^= 0x01;
            }
        }
        Ok(())
    }

    fn write_flash(&mut self, _iface: &str, offset: u32, data: &[u8]) -> Result<()> {
        if let Some(status) = self.write_status.take() {
            return Err(Error::DeviceStatus {
                op: "FLASH WRITE",
                status,
            });
        }
        self.check_range(offset, data.len())?;
        let start = offset as usize;
        // NOR semantics: programming only clears bits
        for (cell, byte) in self.flash[start..start + data.len()].iter_mut().zip(data) {
            *cell &= byte;
        }
        Ok(())
    }

    fn erase_flash(&mut self, _iface: &str) -> Result<()> {
        self.erase_count += 1;
        self.flash.fill(0xFF);
        log::debug!("dummy: flash erased ({} so far)", self.erase_count);
        Ok(())
    }

    fn reboot_to_bootloader(&mut self, _iface: &str) -> Result<()> {
        self.reboot_count += 1;
        Ok(())
    }

    fn software_reset(&mut self, _iface: &str) -> Result<()> {
        self.reset_count += 1;
        Ok(())
    }

    fn dump_efuse_block(&mut self, _iface: &str, block: u32) -> Result<[u8; 20]> {
        if block as usize >= NUM_BLOCKS {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("eFuse block {block} out of range"),
            )));
        }
        Ok(*self.efuse.block(block as usize).as_bytes())
    }

    fn program_efuse_block(&mut self, _iface: &str, block: u32, data: &[u8; 20]) -> Result<()> {
        if block as usize >= NUM_BLOCKS {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("eFuse block {block} out of range"),
            )));
        }
        self.program_count += 1;
        log::debug!("dummy: programming eFuse block {block}");
        // OTP semantics: programming only sets bits
        let mut merged = [0u8; BLOCK_SIZE];
        let current = self.efuse.block(block as usize).as_bytes();
        for i in 0..BLOCK_SIZE {
            merged[i] = current[i] | data[i];
        }
        self.efuse.set_block(block as usize, Block::from_bytes(merged));
        Ok(())
    }

    fn hardware_address(&mut self, _iface: &str) -> Result<[u8; 6]> {
        Ok(self.config.mac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axflasher_core::device::{Session, SCAN_DEV_MAX_RETRY};
    use axflasher_core::efuse::{self, IdentityBlock, SerialBlock, FIRST_USER_BLOCK};
    use axflasher_core::flash;
    use std::fs;
    use std::path::PathBuf;

    fn identity_block(last_mac_byte: u8) -> Block {
        IdentityBlock {
            vid: 0x0B95,
            pid: 0x1790,
            mac: [0x00, 0x0E, 0xC6, 0x00, 0x00, last_mac_byte],
            bcd_device: 0x0100,
            u1_dev_exit_lat: 0,
            u2_dev_exit_lat: 0,
            ss_max_bus_power: 0x70,
            hs_max_bus_power: 0xFA,
            ip_sleep_polling_count: 0,
            reserved: 0,
        }
        .encode()
    }

    fn serial_block(serial: &[u8]) -> Block {
        let mut fields = SerialBlock {
            serial: [0u8; 18],
            reserved: 0,
        };
        fields.serial[..serial.len()].copy_from_slice(serial);
        fields.encode()
    }

    #[test]
    fn discovery_succeeds_on_the_final_round() {
        let config = DummyConfig {
            scan_failures: SCAN_DEV_MAX_RETRY - 1,
            ..DummyConfig::default()
        };
        let mut session = Session::new(DummyDevice::new(config));
        session.discover().unwrap();
        assert_eq!(session.backend_mut().scan_rounds(), SCAN_DEV_MAX_RETRY);
        assert_eq!(session.interface(), Some("eth0"));
    }

    #[test]
    fn discovery_exhausts_the_retry_budget() {
        let config = DummyConfig {
            scan_failures: SCAN_DEV_MAX_RETRY,
            ..DummyConfig::default()
        };
        let mut session = Session::new(DummyDevice::new(config));
        match session.discover() {
            Err(Error::DeviceNotFound(SCAN_DEV_MAX_RETRY)) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(session.backend_mut().scan_rounds(), SCAN_DEV_MAX_RETRY);
        assert_eq!(session.interface(), None);
    }

    // ------------------------------------------------------------------
    // Flash flow
    // ------------------------------------------------------------------

    const LOADER_OFFSET: usize = 0x2000;
    const LOADER_LEN: usize = 0x100;
    const IMAGE_LEN: usize = 0x3800;

    fn synthetic_image() -> Vec<u8> {
        let mut raw: Vec<u8> = (0..IMAGE_LEN).map(|i| (i * 7 + 3) as u8).collect();
        raw[4..8].copy_from_slice(&(LOADER_OFFSET as u32).to_be_bytes());
        raw[8..12].copy_from_slice(&(LOADER_LEN as u32).to_be_bytes());
        raw[LOADER_OFFSET + 0x1000] = 2;
        raw[LOADER_OFFSET + 0x1001] = 1;
        raw[LOADER_OFFSET + 0x1002] = 7;
        raw
    }

    fn temp_image(name: &str, raw: &[u8]) -> PathBuf {
        let path =
            std::env::temp_dir().join(format!("axflasher-{}-{}.bin", std::process::id(), name));
        fs::write(&path, raw).unwrap();
        path
    }

    #[test]
    fn flash_round_trip_completes() {
        let raw = synthetic_image();
        let path = temp_image("roundtrip", &raw);

        let mut session = Session::new(DummyDevice::new_default());
        session.discover().unwrap();
        flash::flash_firmware(&mut session, &path, &mut ()).unwrap();

        let device = session.backend_mut();
        assert_eq!(device.erase_count(), 1);
        assert_eq!(device.reboot_count(), 1);
        // Both regions hold the image contents: the main span from 0 plus
        // the page-padded loader span at its offset
        let written = LOADER_OFFSET + flash::padded(LOADER_LEN);
        assert_eq!(&device.flash()[..written], &raw[..written]);
        // Untouched flash stays erased
        assert!(device.flash()[written..].iter().all(|&b| b == 0xFF));

        let _ = fs::remove_file(path);
    }

    #[test]
    fn verify_failure_erases_back_to_blank() {
        let raw = synthetic_image();
        let path = temp_image("verifyfail", &raw);

        let mut session = Session::new(DummyDevice::new_default());
        session.discover().unwrap();
        session.backend_mut().corrupt_reads_at(LOADER_OFFSET + 5);

        match flash::flash_firmware(&mut session, &path, &mut ()) {
            Err(Error::FlashVerify { offset, .. }) => assert_eq!(offset, LOADER_OFFSET + 5),
            other => panic!("unexpected result: {other:?}"),
        }
        // Rollback erase on top of the initial one
        assert_eq!(session.backend_mut().erase_count(), 2);

        let _ = fs::remove_file(path);
    }

    #[test]
    fn write_failure_status_is_surfaced() {
        let raw = synthetic_image();
        let path = temp_image("writefail", &raw);

        let mut session = Session::new(DummyDevice::new_default());
        session.discover().unwrap();
        session.backend_mut().fail_next_write(-71);

        match flash::flash_firmware(&mut session, &path, &mut ()) {
            Err(Error::DeviceStatus { status: -71, .. }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(session.backend_mut().erase_count(), 2);

        let _ = fs::remove_file(path);
    }

    // ------------------------------------------------------------------
    // eFuse flow
    // ------------------------------------------------------------------

    fn chip_with_blocks(count: usize) -> EfuseImage {
        let mut chip = EfuseImage::new();
        for i in 0..count {
            chip.set_block(FIRST_USER_BLOCK + i, identity_block(i as u8));
        }
        chip
    }

    #[test]
    fn write_efuse_appends_and_verifies() {
        let chip = chip_with_blocks(2);
        let device = DummyDevice::with_efuse(DummyConfig::default(), chip.clone());
        let mut session = Session::new(device);
        session.discover().unwrap();

        let mut local = EfuseImage::new();
        local.set_block(5, identity_block(0xAA));
        local.set_block(6, serial_block(b"AX0001"));

        let summary = efuse::write_efuse(&mut session, &local, &mut ()).unwrap();
        assert_eq!(summary.first_block, 7);
        assert_eq!(summary.block_count, 2);

        let device = session.backend_mut();
        assert_eq!(device.program_count(), 2);
        // Committed prefix untouched, new blocks appended
        for i in 0..7 {
            assert_eq!(device.efuse().block(i), chip.block(i));
        }
        assert_eq!(device.efuse().block(7), local.block(5));
        assert_eq!(device.efuse().block(8), local.block(6));
    }

    #[test]
    fn write_efuse_rejects_bad_checksum_before_programming() {
        let device = DummyDevice::with_efuse(DummyConfig::default(), chip_with_blocks(2));
        let mut session = Session::new(device);
        session.discover().unwrap();

        // Flip a checksummed byte without recomputing the checksum
        let mut corrupted = *identity_block(0x01).as_bytes();
        corrupted[2] ^= 0x40;
        let mut local = EfuseImage::new();
        local.set_block(5, Block::from_bytes(corrupted));

        match efuse::write_efuse(&mut session, &local, &mut ()) {
            Err(Error::InvalidChecksum { block: 5 }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
        // Nothing was burned
        let device = session.backend_mut();
        assert_eq!(device.program_count(), 0);
        assert_eq!(device.efuse(), &chip_with_blocks(2));
    }

    #[test]
    fn write_efuse_with_no_edits_is_a_noop() {
        let device = DummyDevice::with_efuse(DummyConfig::default(), chip_with_blocks(3));
        let mut session = Session::new(device);
        session.discover().unwrap();

        let summary = efuse::write_efuse(&mut session, &EfuseImage::new(), &mut ()).unwrap();
        assert_eq!(summary.block_count, 0);
        assert_eq!(session.backend_mut().program_count(), 0);
    }
}
