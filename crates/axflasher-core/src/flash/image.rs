//! Firmware image loading and header parsing
//!
//! The vendor image is a binary blob with two big-endian u32 header fields:
//! the loader/config region offset at byte 4 and the loader-region length at
//! byte 8. The main firmware region spans `[0, loader_offset)`, so the
//! loader offset doubles as the main-region length.

use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Flash page/sector write granularity in bytes
pub const FLASH_PAGE_SIZE: usize = 256;

/// Byte offset of the version triple inside the loader region
const VERSION_OFFSET: usize = 0x1000;

/// Round `len` up past the next page boundary
///
/// A length already on a boundary still gains a full page; this is the
/// granularity the flash device expects for write lengths.
pub const fn padded(len: usize) -> usize {
    (len + FLASH_PAGE_SIZE) & !(FLASH_PAGE_SIZE - 1)
}

/// Header fields of a firmware image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeader {
    /// Offset of the loader/config region
    pub loader_offset: usize,
    /// Length of the loader/config region
    pub loader_len: usize,
    /// Length of the main firmware region (equal to `loader_offset`)
    pub main_len: usize,
}

/// Firmware version triple embedded in the loader region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareVersion {
    /// Major version
    pub major: u8,
    /// Minor version
    pub minor: u8,
    /// Patch version
    pub patch: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A firmware image loaded into memory
///
/// The buffer is zero-padded past the file length so every page-granular
/// write and read-back span stays in bounds.
pub struct FirmwareImage {
    data: Vec<u8>,
    file_len: usize,
}

impl FirmwareImage {
    /// Load an image from a file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read(path).map_err(|source| Error::Load {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::from_bytes(raw))
    }

    /// Wrap raw image bytes, padding the buffer to page granularity
    pub fn from_bytes(raw: Vec<u8>) -> Self {
        let file_len = raw.len();
        let mut data = raw;
        data.resize(padded(file_len), 0);
        Self { data, file_len }
    }

    /// The padded image buffer
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length of the file the image was loaded from
    pub fn file_len(&self) -> usize {
        self.file_len
    }

    /// Parse and bounds-check the header fields
    pub fn header(&self) -> Result<ImageHeader> {
        if self.file_len < 12 {
            return Err(Error::InvalidValue(format!(
                "image too short for a header: {} bytes",
                self.file_len
            )));
        }
        let loader_offset = be32(&self.data[4..8]) as usize;
        let loader_len = be32(&self.data[8..12]) as usize;

        // The padded loader span must fit the padded buffer, and the
        // unpadded regions must fit the file itself.
        let end = loader_offset
            .checked_add(loader_len)
            .filter(|&end| end <= self.file_len);
        if end.is_none() || loader_offset + padded(loader_len) > self.data.len() {
            return Err(Error::InvalidValue(format!(
                "loader region {loader_offset:#x}+{loader_len:#x} exceeds image of {:#x} bytes",
                self.file_len
            )));
        }

        Ok(ImageHeader {
            loader_offset,
            loader_len,
            main_len: loader_offset,
        })
    }

    /// The version triple at `loader_offset + 0x1000`
    pub fn version(&self, header: &ImageHeader) -> Result<FirmwareVersion> {
        let at = header.loader_offset + VERSION_OFFSET;
        if at + 3 > self.data.len() {
            return Err(Error::InvalidValue(format!(
                "version triple at {at:#x} lies outside the image"
            )));
        }
        Ok(FirmwareVersion {
            major: self.data[at],
            minor: self.data[at + 1],
            patch: self.data[at + 2],
        })
    }
}

// Length/offset header fields are stored big-endian in the file
fn be32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_image(loader_offset: u32, loader_len: u32, total: usize) -> FirmwareImage {
        let mut raw = vec![0u8; total];
        raw[4..8].copy_from_slice(&loader_offset.to_be_bytes());
        raw[8..12].copy_from_slice(&loader_len.to_be_bytes());
        FirmwareImage::from_bytes(raw)
    }

    #[test]
    fn padding_rounds_past_the_next_boundary() {
        assert_eq!(padded(0x2FF0), 0x3000);
        assert_eq!(padded(0x3000), 0x3100);
        assert_eq!(padded(0), 0x100);
        assert_eq!(padded(1), 0x100);
    }

    #[test]
    fn header_fields_are_big_endian() {
        let image = synthetic_image(0x2000, 0x100, 0x3000);
        let header = image.header().unwrap();
        assert_eq!(header.loader_offset, 0x2000);
        assert_eq!(header.loader_len, 0x100);
        assert_eq!(header.main_len, 0x2000);
    }

    #[test]
    fn buffer_is_zero_padded() {
        let image = synthetic_image(0x2000, 0x100, 0x2FF0);
        assert_eq!(image.file_len(), 0x2FF0);
        assert_eq!(image.data().len(), 0x3000);
        assert!(image.data()[0x2FF0..].iter().all(|&b| b == 0));
    }

    #[test]
    fn version_triple_is_read_raw() {
        let mut raw = vec![0u8; 0x4000];
        raw[4..8].copy_from_slice(&0x2000u32.to_be_bytes());
        raw[8..12].copy_from_slice(&0x100u32.to_be_bytes());
        raw[0x3000] = 2;
        raw[0x3001] = 7;
        raw[0x3002] = 1;
        let image = FirmwareImage::from_bytes(raw);
        let version = image.version(&image.header().unwrap()).unwrap();
        assert_eq!(version.to_string(), "v2.7.1");
    }

    #[test]
    fn short_image_is_rejected() {
        let image = FirmwareImage::from_bytes(vec![0u8; 8]);
        assert!(matches!(image.header(), Err(Error::InvalidValue(_))));
    }

    #[test]
    fn out_of_range_loader_region_is_rejected() {
        let image = synthetic_image(0x2000, 0x2000, 0x3000);
        assert!(matches!(image.header(), Err(Error::InvalidValue(_))));
    }
}
