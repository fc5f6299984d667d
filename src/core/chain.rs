// The canonical chain. It always starts at the genesis literal and is only
// ever extended by one validated block or swapped out as a whole.

use crate::core::validation::{validate_block, validate_chain};
use crate::core::Block;
use crate::error::Result;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ChainStore {
    // Shared with readers as an immutable snapshot; copied on write if a
    // snapshot is still alive when the chain grows
    blocks: Arc<Vec<Block>>,
    // Ids of regular transactions confirmed anywhere in `blocks`
    confirmed: HashSet<String>,
}

impl Default for ChainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainStore {
    pub fn new() -> ChainStore {
        ChainStore {
            blocks: Arc::new(vec![Block::genesis()]),
            confirmed: HashSet::new(),
        }
    }

    pub fn tip(&self) -> &Block {
        // Never empty: construction seeds genesis and replacement validates
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn height(&self) -> u64 {
        self.tip().get_index()
    }

    pub fn blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    /// Immutable view of the chain as it is right now
    pub fn snapshot(&self) -> Arc<Vec<Block>> {
        Arc::clone(&self.blocks)
    }

    pub fn is_confirmed(&self, txid: &str) -> bool {
        self.confirmed.contains(txid)
    }

    pub fn confirmed_ids(&self) -> &HashSet<String> {
        &self.confirmed
    }

    /// Validate `block` against the tip and append it
    pub fn append(&mut self, block: Block) -> Result<()> {
        validate_block(self.tip(), &block)?;

        for tx in block.get_transactions() {
            self.confirmed.insert(tx.get_id().to_string());
        }
        Arc::make_mut(&mut self.blocks).push(block);
        Ok(())
    }

    /// Swap in a whole validated chain, returning the one it displaced
    ///
    /// Length policy is the caller's business; this only guarantees that a
    /// chain which fails validation never becomes canonical.
    pub fn replace(&mut self, chain: Vec<Block>) -> Result<Arc<Vec<Block>>> {
        validate_chain(&chain)?;

        self.confirmed = chain
            .iter()
            .flat_map(|block| block.get_transactions())
            .map(|tx| tx.get_id().to_string())
            .collect();
        Ok(std::mem::replace(&mut self.blocks, Arc::new(chain)))
    }
}
