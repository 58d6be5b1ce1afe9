//! Text-file codec for eFuse images
//!
//! The on-disk format is one line per 4-byte group, 5 groups per block, 32
//! blocks: four space-separated 2-digit hex bytes, least-significant byte
//! first on the line. The same format is used to dump chip contents for
//! inspection and to load locally edited images.

use super::{Block, EfuseImage, BLOCK_SIZE, NUM_BLOCKS};

impl EfuseImage {
    /// Encode the array into its text form
    pub fn encode_to_text(&self) -> String {
        let mut out = String::with_capacity(NUM_BLOCKS * BLOCK_SIZE / 4 * 12);
        for block in self.blocks() {
            for group in block.as_bytes().chunks_exact(4) {
                out.push_str(&format!(
                    "{:02x} {:02x} {:02x} {:02x}\n",
                    group[3], group[2], group[1], group[0]
                ));
            }
        }
        out
    }

    /// Decode an array from its text form
    ///
    /// Accepts either hex case. Decoding stops at the first missing or
    /// malformed token without signaling an error, so partially specified
    /// files simply leave the remaining blocks empty. Callers that need
    /// strict validation must check the blocks themselves.
    pub fn decode_from_text(text: &str) -> Self {
        let mut data = [0u8; NUM_BLOCKS * BLOCK_SIZE];
        let mut tokens = text.split_ascii_whitespace();
        'groups: for group in data.chunks_exact_mut(4) {
            for j in (0..4).rev() {
                let byte = match tokens.next().map(|t| u8::from_str_radix(t, 16)) {
                    Some(Ok(b)) => b,
                    _ => break 'groups,
                };
                group[j] = byte;
            }
        }

        let mut image = EfuseImage::new();
        for (i, raw) in data.chunks_exact(BLOCK_SIZE).enumerate() {
            let mut bytes = [0u8; BLOCK_SIZE];
            bytes.copy_from_slice(raw);
            image.set_block(i, Block::from_bytes(bytes));
        }
        image
    }
}
