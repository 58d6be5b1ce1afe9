//! axflasher-linux - Linux driver-ioctl backend
//!
//! This crate reaches the AX88179A/AX88772D device through the private ioctl
//! interface the `ax_usb_nic` network driver registers on its interfaces.
//!
//! # Overview
//!
//! The driver does not expose a character device. Instead, programming
//! requests travel as a command struct hung off an `ifreq` through
//! `ioctl(SIOCDEVPRIVATE)` on an ordinary AF_INET datagram socket, addressed
//! by interface name. Discovery therefore means walking the host's network
//! interfaces and asking each one for the driver signature.
//!
//! # Example
//!
//! ```no_run
//! use axflasher_core::device::Session;
//! use axflasher_linux::LinuxBackend;
//!
//! let backend = LinuxBackend::open()?;
//! let mut session = Session::new(backend);
//! session.discover()?;
//! println!("Firmware Version: {}", session.firmware_version()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - The vendor `ax_usb_nic` driver bound to the device
//! - Privileges to issue private ioctls (usually root)

pub mod device;
pub mod error;

pub use device::LinuxBackend;
pub use error::{LinuxBackendError, Result};
