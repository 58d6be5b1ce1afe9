//! reload command

use axflasher_core::device::{DeviceBackend, Session};
use axflasher_core::Result;

pub fn run<B: DeviceBackend>(session: &mut Session<B>) -> Result<()> {
    session.discover()?;
    println!("Resetting device, this takes about 10 seconds...");
    session.software_reset()?;
    session.discover()?;
    println!("Device reloaded");
    Ok(())
}
