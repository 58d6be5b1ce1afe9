//! Error types for axflasher-core

use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide error type
///
/// Every failure a programming flow can hit maps to exactly one variant, so
/// the CLI can translate variants into the tool's historical exit codes
/// without inspecting message strings.
#[derive(Debug, Error)]
pub enum Error {
    /// No device answered the signature query within the scan retry budget
    #[error("no matching device found after {0} scan attempts")]
    DeviceNotFound(u32),

    /// A backend request itself failed (the driver never answered)
    #[error("backend request failed: {0}")]
    Transport(#[source] std::io::Error),

    /// The backend request completed but the device reported a bad status
    #[error("device reported status {status} for {op}")]
    DeviceStatus {
        /// Request that failed
        op: &'static str,
        /// Device-reported status code
        status: i32,
    },

    /// A local file could not be read or written in full
    #[error("failed to load {}: {source}", .path.display())]
    Load {
        /// File involved
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A user-supplied or image-embedded value is out of range or malformed
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The eFuse file image has no block of the kind an edit needs
    #[error("no type-{0} block found in the eFuse file image")]
    MissingBlock(u8),

    /// An eFuse block in the file image fails its checksum
    #[error("bad checksum on eFuse block {block}")]
    InvalidChecksum {
        /// Block index within the file image
        block: usize,
    },

    /// Flash read-back does not match what was written
    #[error("flash verify failed at offset {offset:#x}: expected {expected:#04x}, found {found:#04x}")]
    FlashVerify {
        /// Absolute flash offset of the first mismatch
        offset: usize,
        /// Byte that was written
        expected: u8,
        /// Byte that was read back
        found: u8,
    },

    /// eFuse re-dump after programming does not match the merged image
    #[error("eFuse verify failed at block {block}")]
    EfuseVerify {
        /// First mismatching block index
        block: usize,
    },

    /// Every user block of the eFuse array is already programmed
    #[error("no empty eFuse block left")]
    NoFreeSlot,

    /// The file image contributes more new blocks than the chip has free
    #[error("eFuse image needs {needed} free blocks, chip has {free}")]
    OutOfSpace {
        /// Blocks the file image wants to append
        needed: usize,
        /// Empty blocks remaining on the chip
        free: usize,
    },
}

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
