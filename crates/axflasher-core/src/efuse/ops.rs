//! Device-facing eFuse flows
//!
//! Dumping and programming go block-by-block through the backend. The
//! inter-read and post-program delays are protocol timing requirements of
//! the hardware, not tunables.

use std::thread;
use std::time::Duration;

use super::{merge, Block, EfuseImage, NUM_BLOCKS};
use crate::device::{DeviceBackend, Session};
use crate::error::{Error, Result};

/// Delay between per-block eFuse reads
pub const EFUSE_READ_DELAY: Duration = Duration::from_millis(200);

/// Settle time between programming and the verification re-dump
pub const EFUSE_PROGRAM_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Progress reporting for eFuse flows
///
/// All methods default to no-ops; the CLI hooks these to progress bars.
pub trait EfuseProgress {
    /// A dump of `total` blocks is starting
    fn dump_started(&mut self, _total: usize) {}
    /// Block `index` has been read
    fn block_read(&mut self, _index: usize) {}
    /// `count` blocks are about to be programmed
    fn programming(&mut self, _count: usize) {}
    /// The post-program verification re-dump is starting
    fn verifying(&mut self) {}
}

/// No-op progress for tests and non-interactive callers
impl EfuseProgress for () {}

/// What [`write_efuse`] actually burned
#[derive(Debug, Clone, Copy)]
pub struct ProgramSummary {
    /// First block index programmed
    pub first_block: usize,
    /// Number of blocks programmed; 0 means the chip already matched
    pub block_count: usize,
}

/// Dump the full 32-block eFuse array from the chip
///
/// Re-runs discovery first (the interface may have changed since the last
/// request), then reads one block per request with [`EFUSE_READ_DELAY`]
/// between reads.
pub fn dump_from_chip<B, P>(session: &mut Session<B>, progress: &mut P) -> Result<EfuseImage>
where
    B: DeviceBackend,
    P: EfuseProgress,
{
    session.discover()?;
    progress.dump_started(NUM_BLOCKS);
    let mut image = EfuseImage::new();
    for index in 0..NUM_BLOCKS {
        let raw = session.dump_efuse_block(index as u32)?;
        image.set_block(index, Block::from_bytes(raw));
        progress.block_read(index);
        thread::sleep(EFUSE_READ_DELAY);
    }
    Ok(image)
}

/// Program `count` blocks of `image` starting at `first_block`
pub fn program_blocks<B: DeviceBackend>(
    session: &mut Session<B>,
    image: &EfuseImage,
    first_block: usize,
    count: usize,
) -> Result<()> {
    if first_block + count > NUM_BLOCKS {
        return Err(Error::InvalidValue(format!(
            "eFuse program range {first_block}+{count} exceeds {NUM_BLOCKS} blocks"
        )));
    }
    session.discover()?;
    for index in first_block..first_block + count {
        session.program_efuse_block(index as u32, image.block(index).as_bytes())?;
    }
    Ok(())
}

/// Burn the edits of `local` into the chip and verify the result
///
/// Dump, merge, program, settle, re-dump, full-array compare. Validation
/// happens entirely inside the merge, strictly before the first burn
/// request: the medium is irreversible, so there is no rollback path.
pub fn write_efuse<B, P>(
    session: &mut Session<B>,
    local: &EfuseImage,
    progress: &mut P,
) -> Result<ProgramSummary>
where
    B: DeviceBackend,
    P: EfuseProgress,
{
    let chip = dump_from_chip(session, progress)?;
    let outcome = merge(&chip, local)?;

    log::info!(
        "programming {} eFuse block(s) starting at block {}",
        outcome.block_count,
        outcome.first_block
    );
    progress.programming(outcome.block_count);
    program_blocks(session, &outcome.image, outcome.first_block, outcome.block_count)?;

    thread::sleep(EFUSE_PROGRAM_SETTLE_DELAY);
    progress.verifying();
    let readback = dump_from_chip(session, progress)?;
    if readback != outcome.image {
        let block = (0..NUM_BLOCKS)
            .find(|&i| readback.block(i) != outcome.image.block(i))
            .unwrap_or(0);
        return Err(Error::EfuseVerify { block });
    }

    Ok(ProgramSummary {
        first_block: outcome.first_block,
        block_count: outcome.block_count,
    })
}
