//! axflasher - AX88179A/AX88772D flash and eFuse programming tool
//!
//! Field-programming utility for the persistent storage of the ASIX
//! USB-Ethernet controller: writes firmware images to the SPI/NOR flash and
//! appends identity blocks (MAC address, serial number) to the
//! one-time-programmable eFuse array.
//!
//! # Architecture
//!
//! The programming protocol lives in `axflasher-core`, behind the
//! `DeviceBackend` trait; `axflasher-linux` reaches the real device through
//! the vendor driver's private ioctl. This binary only maps CLI verbs onto
//! core flows and core errors onto the tool's historical exit codes.

mod cli;
mod commands;

use clap::Parser;
use std::process;

use axflasher_core::device::Session;
use axflasher_core::Error;
use axflasher_linux::LinuxBackend;
use cli::{Cli, Commands};

const BANNER: &str = "AX88179A/AX88772D Linux Flash/eFuse Programming Tool";

/// Exit codes of the historical tool, one per failure kind
mod exit_code {
    pub const INVALID_PARAMETER: i32 = 1;
    pub const TRANSPORT: i32 = 2;
    pub const SCAN: i32 = 3;
    pub const LOAD: i32 = 5;
    pub const FLASH_WRITE: i32 = 6;
    pub const INVALID_VALUE: i32 = 7;
    pub const INVALID_CHECKSUM: i32 = 8;
    pub const NO_FREE_BLOCK: i32 = 9;
    pub const EFUSE_WRITE: i32 = 10;
    pub const GENERAL: i32 = 99;
}

fn exit_code_for(err: &Error) -> i32 {
    match err {
        Error::DeviceNotFound(_) => exit_code::SCAN,
        Error::Transport(_) | Error::DeviceStatus { .. } => exit_code::TRANSPORT,
        Error::Load { .. } => exit_code::LOAD,
        Error::InvalidValue(_) => exit_code::INVALID_VALUE,
        Error::MissingBlock(_) => exit_code::GENERAL,
        Error::InvalidChecksum { .. } => exit_code::INVALID_CHECKSUM,
        Error::FlashVerify { .. } => exit_code::FLASH_WRITE,
        Error::EfuseVerify { .. } => exit_code::EFUSE_WRITE,
        Error::NoFreeSlot | Error::OutOfSpace { .. } => exit_code::NO_FREE_BLOCK,
    }
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version requests land here too; only real parse
            // failures use the invalid-parameter exit code
            let code = if err.use_stderr() {
                exit_code::INVALID_PARAMETER
            } else {
                0
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    println!("{BANNER}");

    let backend = match LinuxBackend::open() {
        Ok(backend) => backend,
        Err(err) => {
            eprintln!("Failed to open device backend: {err}");
            process::exit(exit_code::TRANSPORT);
        }
    };

    let mut session = Session::new(backend);
    if session.discover().is_err() {
        eprintln!("No AX88179A/AX88772D device found");
        process::exit(exit_code::SCAN);
    }

    let result = match cli.command {
        Commands::Rversion => commands::version::run(&mut session),
        Commands::Rmacaddr => commands::macaddr::run(&mut session),
        Commands::Wflash { file } => commands::flash::run(&mut session, &file),
        Commands::Wefuse { mac, serial, file } => {
            commands::efuse::run_write(&mut session, mac.as_deref(), serial.as_deref(), &file)
        }
        Commands::Refuse { file } => commands::efuse::run_read(&mut session, &file),
        Commands::Reload => commands::reload::run(&mut session),
    };

    match result {
        Ok(()) => println!("SUCCESS"),
        Err(err) => {
            eprintln!("{err}");
            println!("FAIL");
            process::exit(exit_code_for(&err));
        }
    }
}
