//! wefuse and refuse commands

use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use axflasher_core::device::{DeviceBackend, Session};
use axflasher_core::efuse::{self, EfuseImage, EfuseProgress};
use axflasher_core::{Error, Result};

/// Progress bar over the per-block dump steps
struct BlockProgress {
    current: Option<ProgressBar>,
}

impl BlockProgress {
    fn new() -> Self {
        Self { current: None }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
        }
    }
}

impl EfuseProgress for BlockProgress {
    fn dump_started(&mut self, total: usize) {
        self.finish();
        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message("eFuse blocks");
        self.current = Some(pb);
    }

    fn block_read(&mut self, index: usize) {
        if let Some(pb) = &self.current {
            pb.set_position(index as u64 + 1);
        }
    }

    fn programming(&mut self, count: usize) {
        self.finish();
        if count > 0 {
            println!("Programming {count} eFuse block(s)...");
        }
    }

    fn verifying(&mut self) {
        self.finish();
        println!("Verifying eFuse contents...");
    }
}

/// Parse a colon-separated MAC address
fn parse_mac(s: &str) -> Result<[u8; 6]> {
    let invalid = || Error::InvalidValue(format!("invalid MAC address: {s}"));
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 6 {
        return Err(invalid());
    }
    let mut mac = [0u8; 6];
    for (byte, part) in mac.iter_mut().zip(&parts) {
        *byte = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
    }
    Ok(mac)
}

pub fn run_write<B: DeviceBackend>(
    session: &mut Session<B>,
    mac: Option<&str>,
    serial: Option<&str>,
    file: &Path,
) -> Result<()> {
    let raw = fs::read(file).map_err(|source| Error::Load {
        path: file.to_owned(),
        source,
    })?;
    let mut local = EfuseImage::decode_from_text(&String::from_utf8_lossy(&raw));

    if let Some(mac) = mac {
        local.set_mac_address(parse_mac(mac)?)?;
    }
    if let Some(serial) = serial {
        local.set_serial_number(serial)?;
    }

    let mut progress = BlockProgress::new();
    let summary = efuse::write_efuse(session, &local, &mut progress);
    progress.finish();
    let summary = summary?;

    if summary.block_count == 0 {
        println!("eFuse already up to date, nothing to program");
    } else {
        println!(
            "Programmed {} eFuse block(s) starting at block {}",
            summary.block_count, summary.first_block
        );
    }
    Ok(())
}

pub fn run_read<B: DeviceBackend>(session: &mut Session<B>, file: &Path) -> Result<()> {
    let mut progress = BlockProgress::new();
    let image = efuse::dump_from_chip(session, &mut progress);
    progress.finish();
    let image = image?;

    fs::write(file, image.encode_to_text()).map_err(|source| Error::Load {
        path: file.to_owned(),
        source,
    })?;
    println!("eFuse contents written to {}", file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_mac_accepts_colon_hex() {
        assert_eq!(
            parse_mac("00:0E:C6:81:79:0A").unwrap(),
            [0x00, 0x0E, 0xC6, 0x81, 0x79, 0x0A]
        );
        assert_eq!(
            parse_mac("aa:bb:cc:dd:ee:ff").unwrap(),
            [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]
        );
    }

    #[test]
    fn parse_mac_rejects_malformed_input() {
        for s in ["", "00:0E:C6:81:79", "00:0E:C6:81:79:0A:FF", "00-0E-C6-81-79-0A", "zz:0E:C6:81:79:0A"] {
            assert!(matches!(parse_mac(s), Err(Error::InvalidValue(_))), "{s}");
        }
    }
}
