//! axflasher-core - Core library for AX88179A/AX88772D programming
//!
//! This crate implements the programming protocol for the persistent storage
//! of the AX88179A/AX88772D USB-Ethernet controller: the SPI/NOR flash
//! holding the firmware, and the one-time-programmable eFuse array holding
//! the device identity (MAC address, serial number, USB descriptor fields).
//!
//! All hardware access goes through the [`device::DeviceBackend`] trait, so
//! the same flows work against the real Linux driver backend and the
//! in-memory emulator used in tests.
//!
//! # Example
//!
//! ```ignore
//! use axflasher_core::device::Session;
//!
//! let mut session = Session::new(backend);
//! session.discover()?;
//! println!("Firmware Version: {}", session.firmware_version()?);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod device;
pub mod efuse;
pub mod error;
pub mod flash;

pub use error::{Error, Result};
