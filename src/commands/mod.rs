//! CLI command implementations
//!
//! One module per verb. Commands are generic over the device backend so the
//! same code paths run against the Linux driver and the test emulator.

pub mod efuse;
pub mod flash;
pub mod macaddr;
pub mod reload;
pub mod version;
