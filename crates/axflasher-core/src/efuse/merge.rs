//! Append-only eFuse merge engine
//!
//! Combines a locally edited image with the current on-chip dump into the
//! array to burn. Committed chip blocks can never be un-set, so the only
//! sound strategy is strict append at the chip's high-water mark; positional
//! reconciliation would corrupt already-fused data.
//!
//! The whole batch is rejected before anything is programmed: capacity and
//! per-block validation both fail the merge, never a partial set.

use super::{EfuseImage, FIRST_USER_BLOCK, NUM_BLOCKS};
use crate::error::{Error, Result};

/// Result of a successful merge
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The chip image with the new blocks appended
    pub image: EfuseImage,
    /// First block index to program
    pub first_block: usize,
    /// Number of blocks to program; 0 means nothing to do
    pub block_count: usize,
}

/// Merge `local` edits onto the `chip` dump
///
/// New blocks are the consecutive non-empty blocks of `local` starting at
/// index 5; they are validated and appended to a copy of `chip` at its
/// high-water mark. `chip` itself is never modified.
pub fn merge(chip: &EfuseImage, local: &EfuseImage) -> Result<MergeOutcome> {
    let mark = chip.high_water_mark().ok_or(Error::NoFreeSlot)?;
    let count = local.pending_blocks();
    if mark + count > NUM_BLOCKS {
        return Err(Error::OutOfSpace {
            needed: count,
            free: NUM_BLOCKS - mark,
        });
    }

    let mut image = chip.clone();
    for i in 0..count {
        let block = *local.block(FIRST_USER_BLOCK + i);
        block.validate(FIRST_USER_BLOCK + i)?;
        image.set_block(mark + i, block);
    }

    Ok(MergeOutcome {
        image,
        first_block: mark,
        block_count: count,
    })
}
