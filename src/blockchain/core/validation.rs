use crate::error::ChainError;

use super::chain::{hash_block, Block, GENESIS_PREVIOUS_HASH};

/// Checks index sequence and hash linkage, stopping at the first broken block.
///
/// The reported index is the 1-based position of the offending block.
pub fn verify_links(blocks: &[Block]) -> Result<(), ChainError> {
    for (position, block) in blocks.iter().enumerate() {
        let expected_index = position as u64 + 1;

        if block.index() != expected_index {
            return Err(ChainError::ChainIntegrityViolation {
                index: expected_index,
                reason: format!(
                    "Invalid block index. Expected {}, but got {}.",
                    expected_index,
                    block.index()
                ),
            });
        }

        let expected_previous = match position.checked_sub(1) {
            Some(previous) => hash_block(&blocks[previous]),
            None => GENESIS_PREVIOUS_HASH.to_string(),
        };

        if block.previous_hash() != expected_previous {
            return Err(ChainError::ChainIntegrityViolation {
                index: expected_index,
                reason: format!(
                    "Invalid previous block hash. Expected {}, but got {}.",
                    expected_previous,
                    block.previous_hash()
                ),
            });
        }
    }
    Ok(())
}

/// Index of the first block failing [`verify_links`], if any.
pub fn first_invalid_index(blocks: &[Block]) -> Option<u64> {
    verify_links(blocks).err().and_then(|e| e.block_index())
}
