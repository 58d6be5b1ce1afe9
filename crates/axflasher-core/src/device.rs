//! Device backend trait and session handling
//!
//! The AX88179A/AX88772D driver exposes its programming interface as a
//! private request channel bound to a network interface. A [`Session`] owns
//! one backend plus the name of the interface the device was discovered on;
//! every request after discovery targets that interface.
//!
//! Reboot-to-bootloader and software reset make the device re-enumerate under
//! a new identity, so both drop the attachment and force the caller through
//! [`Session::discover`] again before issuing further requests.

use std::io;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Rounds of interface enumeration before discovery gives up
pub const SCAN_DEV_MAX_RETRY: u32 = 5;

/// Delay between discovery rounds
pub const SCAN_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Settle time after rebooting into the bootloader
pub const BOOTLOADER_SETTLE_DELAY: Duration = Duration::from_secs(1);

/// Settle time after a software reset
pub const RESET_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Signature prefix the driver answers to the signature query
pub const DRIVER_SIGNATURE: &str = "ax_usb_nic";

/// Backend request surface of the device driver
///
/// One method per request code the driver understands, plus candidate
/// enumeration for discovery. Every request names the network interface it
/// targets; [`Session`] supplies the interface of the discovered device.
///
/// Requests are blocking round-trips. Implementations distinguish a failed
/// request ([`Error::Transport`]) from a completed request whose status
/// out-parameter is nonzero ([`Error::DeviceStatus`]).
pub trait DeviceBackend {
    /// Enumerate candidate interface names to probe
    fn candidates(&mut self) -> Result<Vec<String>>;

    /// Query the driver signature on one candidate interface
    fn query_signature(&mut self, iface: &str) -> Result<String>;

    /// Read the 16-byte firmware version string
    fn read_firmware_version(&mut self, iface: &str) -> Result<[u8; 16]>;

    /// Read `buf.len()` bytes of flash starting at `offset`
    fn read_flash(&mut self, iface: &str, offset: u32, buf: &mut [u8]) -> Result<()>;

    /// Write `data` to flash starting at `offset`
    fn write_flash(&mut self, iface: &str, offset: u32, data: &[u8]) -> Result<()>;

    /// Erase the whole flash chip
    fn erase_flash(&mut self, iface: &str) -> Result<()>;

    /// Reboot into the bootloader; no response is awaited
    fn reboot_to_bootloader(&mut self, iface: &str) -> Result<()>;

    /// Software-reset the device; no response is awaited
    fn software_reset(&mut self, iface: &str) -> Result<()>;

    /// Dump one 20-byte eFuse block
    fn dump_efuse_block(&mut self, iface: &str, block: u32) -> Result<[u8; 20]>;

    /// Program one 20-byte eFuse block
    fn program_efuse_block(&mut self, iface: &str, block: u32, data: &[u8; 20]) -> Result<()>;

    /// Read the interface's link-layer address from the host stack
    fn hardware_address(&mut self, iface: &str) -> Result<[u8; 6]>;
}

/// A session with exactly one discovered device
///
/// Owns the backend and the attached interface name. Operations that reset
/// the device clear the attachment; requests made while unattached fail
/// instead of silently targeting a stale interface.
pub struct Session<B> {
    backend: B,
    iface: Option<String>,
}

impl<B: DeviceBackend> Session<B> {
    /// Create an unattached session over `backend`
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            iface: None,
        }
    }

    /// Name of the interface the device was discovered on, if attached
    pub fn interface(&self) -> Option<&str> {
        self.iface.as_deref()
    }

    /// Access the underlying backend
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn attached(&self) -> Result<&str> {
        self.iface.as_deref().ok_or_else(|| {
            Error::Transport(io::Error::new(
                io::ErrorKind::NotConnected,
                "no device attached; discovery required",
            ))
        })
    }

    /// Find the device by probing every candidate interface for the driver
    /// signature
    ///
    /// Runs up to [`SCAN_DEV_MAX_RETRY`] enumeration rounds with
    /// [`SCAN_RETRY_DELAY`] between them and attaches to the first interface
    /// whose signature starts with [`DRIVER_SIGNATURE`].
    pub fn discover(&mut self) -> Result<()> {
        for round in 0..SCAN_DEV_MAX_RETRY {
            for iface in self.backend.candidates()? {
                let sig = match self.backend.query_signature(&iface) {
                    Ok(sig) => sig,
                    // Interfaces bound to other drivers reject the query
                    Err(_) => continue,
                };
                if sig.starts_with(DRIVER_SIGNATURE) {
                    log::debug!("found {} on {} (round {})", sig, iface, round + 1);
                    self.iface = Some(iface);
                    return Ok(());
                }
            }
            if round + 1 < SCAN_DEV_MAX_RETRY {
                thread::sleep(SCAN_RETRY_DELAY);
            }
        }
        Err(Error::DeviceNotFound(SCAN_DEV_MAX_RETRY))
    }

    /// Read the firmware version, trimmed of trailing NULs
    pub fn firmware_version(&mut self) -> Result<String> {
        let iface = self.attached()?.to_owned();
        let raw = self.backend.read_firmware_version(&iface)?;
        Ok(String::from_utf8_lossy(&raw)
            .trim_end_matches('\0')
            .to_string())
    }

    /// Read the device MAC address from the host stack
    ///
    /// Re-runs discovery first: the address is read through the interface,
    /// and the interface name may have changed since the last request.
    pub fn mac_address(&mut self) -> Result<[u8; 6]> {
        self.discover()?;
        let iface = self.attached()?.to_owned();
        self.backend.hardware_address(&iface)
    }

    /// Read flash contents into `buf`
    pub fn read_flash(&mut self, offset: u32, buf: &mut [u8]) -> Result<()> {
        let iface = self.attached()?.to_owned();
        self.backend.read_flash(&iface, offset, buf)
    }

    /// Write `data` to flash at `offset`
    pub fn write_flash(&mut self, offset: u32, data: &[u8]) -> Result<()> {
        let iface = self.attached()?.to_owned();
        self.backend.write_flash(&iface, offset, data)
    }

    /// Erase the whole flash chip
    pub fn erase_flash(&mut self) -> Result<()> {
        let iface = self.attached()?.to_owned();
        self.backend.erase_flash(&iface)
    }

    /// Dump one eFuse block
    pub fn dump_efuse_block(&mut self, block: u32) -> Result<[u8; 20]> {
        let iface = self.attached()?.to_owned();
        self.backend.dump_efuse_block(&iface, block)
    }

    /// Program one eFuse block
    pub fn program_efuse_block(&mut self, block: u32, data: &[u8; 20]) -> Result<()> {
        let iface = self.attached()?.to_owned();
        self.backend.program_efuse_block(&iface, block, data)
    }

    /// Reboot the device into its bootloader
    ///
    /// Fire-and-forget: the device re-enumerates under a new identity, so the
    /// attachment is dropped. The caller must wait
    /// [`BOOTLOADER_SETTLE_DELAY`] and re-run [`Session::discover`].
    pub fn reboot_to_bootloader(&mut self) -> Result<()> {
        let iface = self.attached()?.to_owned();
        self.backend.reboot_to_bootloader(&iface)?;
        self.iface = None;
        Ok(())
    }

    /// Software-reset the device and wait out the settle time
    ///
    /// Sleeps the fixed [`RESET_SETTLE_DELAY`] before returning; the caller
    /// still has to re-run [`Session::discover`].
    pub fn software_reset(&mut self) -> Result<()> {
        let iface = self.attached()?.to_owned();
        self.backend.software_reset(&iface)?;
        self.iface = None;
        thread::sleep(RESET_SETTLE_DELAY);
        Ok(())
    }
}
