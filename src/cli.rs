//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "axflasher")]
#[command(author, version)]
#[command(about = "AX88179A/AX88772D flash and eFuse programming tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read the firmware version
    Rversion,

    /// Read the MAC address
    Rmacaddr,

    /// Write a firmware image to flash
    Wflash {
        /// Flash image file path
        file: PathBuf,
    },

    /// Program identity edits into the eFuse array
    Wefuse {
        /// MAC address (XX:XX:XX:XX:XX:XX)
        #[arg(short, long)]
        mac: Option<String>,

        /// Serial number (up to 18 characters)
        #[arg(short, long)]
        serial: Option<String>,

        /// eFuse file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Read the eFuse array into a file
    Refuse {
        /// eFuse file path
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Reset the device and reload its firmware
    Reload,
}
