//! eFuse array model
//!
//! The device identity lives in a one-time-programmable eFuse array of 32
//! fixed 20-byte blocks. Blocks 0-4 are structural and never touched by this
//! tool. Blocks 5-31 form an append-only log: the first empty block is the
//! high-water mark, and everything below it is already burned and immutable.
//!
//! Because fused bits can never be un-set, edits are appended above the
//! high-water mark by the [`merge`] engine rather than reconciled in place.

mod block;
mod merge;
mod ops;
mod text;

pub use block::{Block, BlockView, IdentityBlock, SerialBlock, BLOCK_SIZE};
pub use block::{TYPE_EMPTY, TYPE_IDENTITY, TYPE_SERIAL};
pub use merge::{merge, MergeOutcome};
pub use ops::{dump_from_chip, program_blocks, write_efuse};
pub use ops::{EfuseProgress, ProgramSummary};
pub use ops::{EFUSE_PROGRAM_SETTLE_DELAY, EFUSE_READ_DELAY};

use crate::error::{Error, Result};

/// Number of blocks in the eFuse array
pub const NUM_BLOCKS: usize = 32;

/// First block index this tool may touch; 0-4 are reserved
pub const FIRST_USER_BLOCK: usize = 5;

/// A full 32-block eFuse array
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EfuseImage {
    blocks: [Block; NUM_BLOCKS],
}

impl Default for EfuseImage {
    fn default() -> Self {
        Self::new()
    }
}

impl EfuseImage {
    /// An all-empty array
    pub fn new() -> Self {
        Self {
            blocks: [Block::default(); NUM_BLOCKS],
        }
    }

    /// Build an array from its 32 blocks
    pub fn from_blocks(blocks: [Block; NUM_BLOCKS]) -> Self {
        Self { blocks }
    }

    /// Borrow a block
    pub fn block(&self, index: usize) -> &Block {
        &self.blocks[index]
    }

    /// Replace a block
    pub fn set_block(&mut self, index: usize, block: Block) {
        self.blocks[index] = block;
    }

    /// All 32 blocks in order
    pub fn blocks(&self) -> &[Block; NUM_BLOCKS] {
        &self.blocks
    }

    /// Index of the first user block carrying `tag`
    pub fn find_first_of_type(&self, tag: u8) -> Option<usize> {
        (FIRST_USER_BLOCK..NUM_BLOCKS).find(|&i| self.blocks[i].type_tag() == tag)
    }

    /// Index of the first empty user block, or `None` when the array is full
    pub fn high_water_mark(&self) -> Option<usize> {
        self.find_first_of_type(TYPE_EMPTY)
    }

    /// Number of consecutive non-empty blocks starting at the first user
    /// block
    ///
    /// This is how many new blocks a locally edited image contributes: edits
    /// are always written starting at index 5 of the working copy, ending at
    /// the first empty block.
    pub fn pending_blocks(&self) -> usize {
        (FIRST_USER_BLOCK..NUM_BLOCKS)
            .take_while(|&i| !self.blocks[i].is_empty())
            .count()
    }

    /// Set the MAC address in the first identity block
    ///
    /// Fails with [`Error::MissingBlock`] when the image has no identity
    /// block to edit. The block checksum is recomputed.
    pub fn set_mac_address(&mut self, mac: [u8; 6]) -> Result<()> {
        let index = self
            .find_first_of_type(TYPE_IDENTITY)
            .ok_or(Error::MissingBlock(TYPE_IDENTITY))?;
        let mut fields = IdentityBlock::from_block(&self.blocks[index]);
        fields.mac = mac;
        self.blocks[index] = fields.encode();
        Ok(())
    }

    /// Set the serial number in the first serial block
    ///
    /// The serial field holds at most 18 bytes; shorter strings are
    /// NUL-padded. The block checksum is recomputed.
    pub fn set_serial_number(&mut self, serial: &str) -> Result<()> {
        if serial.len() > 18 {
            return Err(Error::InvalidValue(format!(
                "serial number longer than 18 bytes: {serial:?}"
            )));
        }
        let index = self
            .find_first_of_type(TYPE_SERIAL)
            .ok_or(Error::MissingBlock(TYPE_SERIAL))?;
        let mut fields = SerialBlock::from_block(&self.blocks[index]);
        fields.serial = [0u8; 18];
        fields.serial[..serial.len()].copy_from_slice(serial.as_bytes());
        self.blocks[index] = fields.encode();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity_block() -> Block {
        IdentityBlock {
            vid: 0x0B95,
            pid: 0x1790,
            mac: [0x00, 0x0E, 0xC6, 0x81, 0x79, 0x01],
            bcd_device: 0x0100,
            u1_dev_exit_lat: 0,
            u2_dev_exit_lat: 0,
            ss_max_bus_power: 0x70,
            hs_max_bus_power: 0xFA,
            ip_sleep_polling_count: 0,
            reserved: 0,
        }
        .encode()
    }

    fn serial_block() -> Block {
        let mut fields = SerialBlock {
            serial: [0u8; 18],
            reserved: 0,
        };
        fields.serial[..6].copy_from_slice(b"AX0001");
        fields.encode()
    }

    #[test]
    fn high_water_mark_of_partial_array() {
        let mut image = EfuseImage::new();
        for i in FIRST_USER_BLOCK..11 {
            image.set_block(i, identity_block());
        }
        assert_eq!(image.high_water_mark(), Some(11));
    }

    #[test]
    fn high_water_mark_of_empty_array() {
        assert_eq!(EfuseImage::new().high_water_mark(), Some(FIRST_USER_BLOCK));
    }

    #[test]
    fn high_water_mark_of_full_array() {
        let mut image = EfuseImage::new();
        for i in FIRST_USER_BLOCK..NUM_BLOCKS {
            image.set_block(i, identity_block());
        }
        assert_eq!(image.high_water_mark(), None);
    }

    #[test]
    fn find_first_of_type_skips_reserved_blocks() {
        let mut image = EfuseImage::new();
        // A stray identity tag in the reserved area must not be found
        image.set_block(2, identity_block());
        image.set_block(6, identity_block());
        assert_eq!(image.find_first_of_type(TYPE_IDENTITY), Some(6));
    }

    #[test]
    fn set_mac_address_updates_block_and_checksum() {
        let mut image = EfuseImage::new();
        image.set_block(5, identity_block());
        image
            .set_mac_address([0x02, 0x11, 0x22, 0x33, 0x44, 0x55])
            .unwrap();
        let block = image.block(5);
        assert!(block.is_valid());
        match block.view() {
            Some(BlockView::Identity(fields)) => {
                assert_eq!(fields.mac, [0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);
                assert_eq!(fields.vid, 0x0B95);
            }
            other => panic!("unexpected view: {other:?}"),
        }
    }

    #[test]
    fn set_mac_address_without_identity_block_fails() {
        let mut image = EfuseImage::new();
        image.set_block(5, serial_block());
        assert!(matches!(
            image.set_mac_address([0; 6]),
            Err(crate::Error::MissingBlock(TYPE_IDENTITY))
        ));
    }

    #[test]
    fn set_serial_number_pads_with_nul() {
        let mut image = EfuseImage::new();
        image.set_block(5, serial_block());
        image.set_serial_number("SN42").unwrap();
        match image.block(5).view() {
            Some(BlockView::Serial(fields)) => {
                assert_eq!(&fields.serial[..4], b"SN42");
                assert!(fields.serial[4..].iter().all(|&b| b == 0));
            }
            other => panic!("unexpected view: {other:?}"),
        }
        assert!(image.block(5).is_valid());
    }

    #[test]
    fn set_serial_number_rejects_long_input() {
        let mut image = EfuseImage::new();
        image.set_block(5, serial_block());
        assert!(matches!(
            image.set_serial_number("0123456789ABCDEFGHI"),
            Err(crate::Error::InvalidValue(_))
        ));
    }
}
