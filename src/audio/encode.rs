use crate::error::{Error, Result};

/// Upper bound on a single block: one second of device audio. A poll can
/// never legitimately return more than the ring buffer holds.
pub const MAX_BLOCK_SAMPLES: usize = 16_000;

/// Encode a block of signed 16-bit samples as little-endian bytes.
///
/// The frame is exactly twice the sample count. Blocks larger than the
/// device buffer are rejected; that indicates a broken device, not audio.
pub fn encode_block(block: &[i16]) -> Result<Vec<u8>> {
    if block.len() > MAX_BLOCK_SAMPLES {
        return Err(Error::InvalidBlockSize(block.len()));
    }
    Ok(block.iter().flat_map(|sample| sample.to_le_bytes()).collect())
}
