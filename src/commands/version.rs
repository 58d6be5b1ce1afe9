//! rversion command

use axflasher_core::device::{DeviceBackend, Session};
use axflasher_core::Result;

pub fn run<B: DeviceBackend>(session: &mut Session<B>) -> Result<()> {
    let version = session.firmware_version()?;
    println!("Firmware Version: {version}");
    Ok(())
}
