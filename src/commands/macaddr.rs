//! rmacaddr command

use axflasher_core::device::{DeviceBackend, Session};
use axflasher_core::Result;

pub fn run<B: DeviceBackend>(session: &mut Session<B>) -> Result<()> {
    let mac = session.mac_address()?;
    println!(
        "MAC address: {:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    Ok(())
}
