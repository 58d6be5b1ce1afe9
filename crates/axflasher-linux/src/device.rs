//! Linux backend implementation
//!
//! Implements [`DeviceBackend`] over the driver's private ioctl. Every
//! request fills an [`AxIoctlCommand`], points `ifreq.ifr_data` at it, and
//! issues `ioctl(SIOCDEVPRIVATE)` on the control socket.
//!
//! The request codes and the command struct layout mirror the vendor
//! driver's ioctl header; they are isolated here so a differing driver
//! build is a one-file fix.

use std::io;
use std::os::fd::{AsRawFd, OwnedFd};

use nix::ifaddrs::getifaddrs;
use nix::sys::socket::{socket, AddressFamily, SockFlag, SockType};

use axflasher_core::device::DeviceBackend;
use axflasher_core::error::{Error as CoreError, Result as CoreResult};

use crate::error::{LinuxBackendError, Result};

/// The driver registers its programming interface on the device-private
/// ioctl request code (SIOCDEVPRIVATE)
const AX_PRIVATE: libc::c_ulong = 0x89F0;

/// Size of the signature buffer in the command struct
const SIGNATURE_LEN: usize = 32;

/// Size of the firmware version buffer in the command struct
const VERSION_LEN: usize = 16;

/// Request codes of the driver's private ioctl interface
mod requests {
    pub const SIGNATURE: u16 = 0x00;
    pub const READ_VERSION: u16 = 0x01;
    pub const READ_FLASH: u16 = 0x02;
    pub const WRITE_FLASH: u16 = 0x03;
    pub const ERASE_FLASH: u16 = 0x04;
    pub const REBOOT_TO_BOOTLOADER: u16 = 0x05;
    pub const SOFTWARE_RESET: u16 = 0x06;
    pub const DUMP_EFUSE: u16 = 0x07;
    pub const PROGRAM_EFUSE: u16 = 0x08;
}

/// Flash/eFuse request arguments
///
/// `buf` points into caller memory; the driver reads or fills `length`
/// bytes. For eFuse requests `offset` is the block index and `length` is
/// always 20. `status` is written by the device even when the ioctl itself
/// fails.
#[repr(C)]
#[derive(Clone, Copy)]
struct FlashCommand {
    offset: u32,
    length: u32,
    buf: *mut u8,
    status: i32,
}

#[repr(C)]
#[derive(Clone, Copy)]
union CommandArgs {
    signature: [u8; SIGNATURE_LEN],
    version: [u8; VERSION_LEN],
    flash: FlashCommand,
}

/// The command struct hung off `ifreq.ifr_data`
///
/// Layout must match the driver's `_ax_ioctl_command`.
#[repr(C)]
struct AxIoctlCommand {
    request: u16,
    args: CommandArgs,
}

impl AxIoctlCommand {
    fn new(request: u16) -> Self {
        Self {
            request,
            // Args start zeroed like the memset in the driver's userspace
            // counterpart; all union fields are plain bytes and pointers
            args: unsafe { std::mem::zeroed() },
        }
    }
}

/// Linux backend over the driver's private ioctl interface
pub struct LinuxBackend {
    socket: OwnedFd,
}

impl LinuxBackend {
    /// Create the control socket
    pub fn open() -> Result<Self> {
        let socket = socket(
            AddressFamily::Inet,
            SockType::Datagram,
            SockFlag::empty(),
            None,
        )
        .map_err(LinuxBackendError::Socket)?;
        log::debug!("linux backend: control socket fd {}", socket.as_raw_fd());
        Ok(Self { socket })
    }

    /// Fill an `ifreq` for `iface` and run the private ioctl
    fn private_ioctl(&self, iface: &str, cmd: &mut AxIoctlCommand) -> io::Result<()> {
        let mut ifr = ifreq_for(iface)?;
        ifr.ifr_ifru.ifru_data = cmd as *mut AxIoctlCommand as *mut libc::c_char;

        let ret = unsafe { libc::ioctl(self.socket.as_raw_fd(), AX_PRIVATE, &mut ifr) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Run a flash/eFuse request, surfacing a device-reported status
    /// distinctly from a transport failure
    fn flash_ioctl(
        &self,
        iface: &str,
        cmd: &mut AxIoctlCommand,
        op: &'static str,
    ) -> CoreResult<()> {
        match self.private_ioctl(iface, cmd) {
            Ok(()) => Ok(()),
            Err(errno) => {
                let status = unsafe { cmd.args.flash.status };
                if status != 0 {
                    log::error!("{} status: {}", op, status);
                    Err(CoreError::DeviceStatus { op, status })
                } else {
                    Err(CoreError::Transport(errno))
                }
            }
        }
    }
}

impl DeviceBackend for LinuxBackend {
    fn candidates(&mut self) -> CoreResult<Vec<String>> {
        let addrs = getifaddrs().map_err(|errno| {
            CoreError::Transport(io::Error::from_raw_os_error(errno as i32))
        })?;
        // getifaddrs yields one entry per address family; keep each
        // interface once, in enumeration order
        let mut names: Vec<String> = Vec::new();
        for addr in addrs {
            if !names.contains(&addr.interface_name) {
                names.push(addr.interface_name);
            }
        }
        Ok(names)
    }

    fn query_signature(&mut self, iface: &str) -> CoreResult<String> {
        let mut cmd = AxIoctlCommand::new(requests::SIGNATURE);
        self.private_ioctl(iface, &mut cmd)
            .map_err(CoreError::Transport)?;
        let sig = unsafe { &cmd.args.signature };
        let end = sig.iter().position(|&b| b == 0).unwrap_or(SIGNATURE_LEN);
        Ok(String::from_utf8_lossy(&sig[..end]).into_owned())
    }

    fn read_firmware_version(&mut self, iface: &str) -> CoreResult<[u8; 16]> {
        let mut cmd = AxIoctlCommand::new(requests::READ_VERSION);
        self.private_ioctl(iface, &mut cmd)
            .map_err(CoreError::Transport)?;
        Ok(unsafe { cmd.args.version })
    }

    fn read_flash(&mut self, iface: &str, offset: u32, buf: &mut [u8]) -> CoreResult<()> {
        let mut cmd = AxIoctlCommand::new(requests::READ_FLASH);
        cmd.args.flash = FlashCommand {
            offset,
            length: buf.len() as u32,
            buf: buf.as_mut_ptr(),
            status: 0,
        };
        self.flash_ioctl(iface, &mut cmd, "FLASH READ")
    }

    fn write_flash(&mut self, iface: &str, offset: u32, data: &[u8]) -> CoreResult<()> {
        let mut cmd = AxIoctlCommand::new(requests::WRITE_FLASH);
        cmd.args.flash = FlashCommand {
            offset,
            length: data.len() as u32,
            // The driver only reads from the buffer on a write request
            buf: data.as_ptr() as *mut u8,
            status: 0,
        };
        self.flash_ioctl(iface, &mut cmd, "FLASH WRITE")
    }

    fn erase_flash(&mut self, iface: &str) -> CoreResult<()> {
        let mut cmd = AxIoctlCommand::new(requests::ERASE_FLASH);
        self.flash_ioctl(iface, &mut cmd, "FLASH ERASE")
    }

    fn reboot_to_bootloader(&mut self, iface: &str) -> CoreResult<()> {
        let mut cmd = AxIoctlCommand::new(requests::REBOOT_TO_BOOTLOADER);
        // Fire-and-forget: the device drops off the bus mid-request, so the
        // ioctl result carries no information
        let _ = self.private_ioctl(iface, &mut cmd);
        Ok(())
    }

    fn software_reset(&mut self, iface: &str) -> CoreResult<()> {
        let mut cmd = AxIoctlCommand::new(requests::SOFTWARE_RESET);
        let _ = self.private_ioctl(iface, &mut cmd);
        Ok(())
    }

    fn dump_efuse_block(&mut self, iface: &str, block: u32) -> CoreResult<[u8; 20]> {
        let mut data = [0u8; 20];
        let mut cmd = AxIoctlCommand::new(requests::DUMP_EFUSE);
        cmd.args.flash = FlashCommand {
            offset: block,
            length: data.len() as u32,
            buf: data.as_mut_ptr(),
            status: 0,
        };
        self.flash_ioctl(iface, &mut cmd, "EFUSE DUMP")?;
        Ok(data)
    }

    fn program_efuse_block(&mut self, iface: &str, block: u32, data: &[u8; 20]) -> CoreResult<()> {
        let mut cmd = AxIoctlCommand::new(requests::PROGRAM_EFUSE);
        cmd.args.flash = FlashCommand {
            offset: block,
            length: data.len() as u32,
            buf: data.as_ptr() as *mut u8,
            status: 0,
        };
        self.flash_ioctl(iface, &mut cmd, "EFUSE PROGRAM")
    }

    fn hardware_address(&mut self, iface: &str) -> CoreResult<[u8; 6]> {
        let mut ifr = ifreq_for(iface).map_err(CoreError::Transport)?;
        let ret =
            unsafe { libc::ioctl(self.socket.as_raw_fd(), libc::SIOCGIFHWADDR, &mut ifr) };
        if ret < 0 {
            return Err(CoreError::Transport(io::Error::last_os_error()));
        }
        let sa_data = unsafe { ifr.ifr_ifru.ifru_hwaddr.sa_data };
        let mut mac = [0u8; 6];
        for (dst, src) in mac.iter_mut().zip(sa_data.iter()) {
            *dst = *src as u8;
        }
        Ok(mac)
    }
}

/// Build a zeroed `ifreq` carrying `iface` as its name
fn ifreq_for(iface: &str) -> io::Result<libc::ifreq> {
    let name = iface.as_bytes();
    if name.len() >= libc::IFNAMSIZ {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("interface name too long: {iface}"),
        ));
    }
    let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in ifr.ifr_name.iter_mut().zip(name.iter()) {
        *dst = *src as libc::c_char;
    }
    Ok(ifr)
}
