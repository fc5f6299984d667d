//! Block and chain validation
//!
//! Checks are split in two so callers can tell a block that is broken on
//! its own from one that is merely built on a different tip.

use crate::core::{Block, ProofOfWork, BLOCK_REWARD, POW_PREFIX};
use crate::error::{BlockchainError, Result};

/// Checks that need nothing but the block itself: digest, proof-of-work, reward
pub fn check_intrinsic(candidate: &Block) -> Result<()> {
    let recomputed = candidate.compute_hash();
    if recomputed != candidate.get_hash() {
        return Err(BlockchainError::InvalidBlock(format!(
            "Block {} digest mismatch: carries {}, fields hash to {recomputed}",
            candidate.get_index(),
            candidate.get_hash()
        )));
    }

    if !ProofOfWork::meets_target(candidate.get_hash()) {
        return Err(BlockchainError::InvalidBlock(format!(
            "Block {} hash {} lacks required prefix {POW_PREFIX}",
            candidate.get_index(),
            candidate.get_hash()
        )));
    }

    let reward = candidate.get_coinbase().get_amount();
    if reward != BLOCK_REWARD {
        return Err(BlockchainError::InvalidBlock(format!(
            "Block {} coinbase pays {reward}, expected {BLOCK_REWARD}",
            candidate.get_index()
        )));
    }

    Ok(())
}

/// Checks that `candidate` sits directly on top of `prev`
pub fn check_linkage(prev: &Block, candidate: &Block) -> Result<()> {
    if candidate.get_index() != prev.get_index() + 1 {
        return Err(BlockchainError::InvalidBlock(format!(
            "Block index {} does not follow {}",
            candidate.get_index(),
            prev.get_index()
        )));
    }

    if candidate.get_previous_hash() != prev.get_hash() {
        return Err(BlockchainError::InvalidBlock(format!(
            "Block {} points at {}, predecessor is {}",
            candidate.get_index(),
            candidate.get_previous_hash(),
            prev.get_hash()
        )));
    }

    Ok(())
}

pub fn validate_block(prev: &Block, candidate: &Block) -> Result<()> {
    check_linkage(prev, candidate)?;
    check_intrinsic(candidate)
}

/// Genesis must match the literal exactly; every later pair must validate
pub fn validate_chain(chain: &[Block]) -> Result<()> {
    let genesis = chain
        .first()
        .ok_or_else(|| BlockchainError::InvalidChain("Chain is empty".to_string()))?;

    if !genesis.is_genesis() {
        return Err(BlockchainError::InvalidChain(
            "First block is not the canonical genesis".to_string(),
        ));
    }

    for pair in chain.windows(2) {
        validate_block(&pair[0], &pair[1])
            .map_err(|e| BlockchainError::InvalidChain(e.to_string()))?;
    }

    Ok(())
}
