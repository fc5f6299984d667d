use crate::core::{Block, ChainStore, Transaction};
use crate::error::{BlockchainError, Result};
use crate::mining::CancellationToken;
use crate::storage::MemoryPool;
use log::debug;
use std::collections::HashSet;
use std::sync::Arc;

/// What a whole-chain swap did to local state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSwap {
    pub previous_len: usize,
    pub new_len: usize,
    /// Ids un-confirmed by the swap and put back into the mempool
    pub requeued: Vec<String>,
    /// Pending transactions dropped because the new chain confirms them
    pub confirmed: usize,
}

/// Chain, mempool and in-flight mining tokens, guarded together
///
/// Every tip change goes through [`Ledger::append_block`] or
/// [`Ledger::replace_chain`], which update the mempool and cancel mining in
/// the same critical section. A reader holding the lock therefore always
/// sees a tip and mempool that belong together.
#[derive(Debug, Default)]
pub struct Ledger {
    chain: ChainStore,
    mempool: MemoryPool,
    mining: Vec<CancellationToken>,
}

impl Ledger {
    pub fn new() -> Ledger {
        Ledger::default()
    }

    pub fn chain(&self) -> &ChainStore {
        &self.chain
    }

    pub fn mempool(&self) -> &MemoryPool {
        &self.mempool
    }

    pub fn tip(&self) -> &Block {
        self.chain.tip()
    }

    /// Queue a transaction unless it is already pending or confirmed
    pub fn add_transaction(&mut self, tx: Transaction) -> Result<bool> {
        tx.validate_shape()?;
        if self.chain.is_confirmed(tx.get_id()) {
            return Ok(false);
        }
        Ok(self.mempool.add(tx))
    }

    /// Register a new search against the current tip
    pub fn register_mining(&mut self) -> CancellationToken {
        self.mining.retain(|token| !token.is_cancelled());
        let token = CancellationToken::new();
        self.mining.push(token.clone());
        token
    }

    /// Cancel every registered search; returns how many were live
    pub fn cancel_mining(&mut self) -> usize {
        let live = self
            .mining
            .iter()
            .filter(|token| !token.is_cancelled())
            .count();
        for token in self.mining.drain(..) {
            token.cancel();
        }
        live
    }

    /// Append a block that extends the tip and drop what it confirms
    pub fn append_block(&mut self, block: Block) -> Result<usize> {
        let txids: HashSet<String> = block
            .get_transactions()
            .iter()
            .map(|tx| tx.get_id().to_string())
            .collect();

        self.chain.append(block)?;
        let removed = self.mempool.remove_all(&txids);
        self.cancel_mining();
        Ok(removed)
    }

    /// Swap in `candidate` wholesale and reconcile the mempool
    ///
    /// Transactions confirmed only in the displaced chain are re-queued if
    /// they would pass mempool admission; anything the new chain confirms is
    /// removed.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<ChainSwap> {
        if candidate.len() <= self.chain.len() {
            return Err(BlockchainError::InvalidChain(format!(
                "Replacement of length {} is not longer than local length {}",
                candidate.len(),
                self.chain.len()
            )));
        }

        let previous: Arc<Vec<Block>> = self.chain.replace(candidate)?;

        let mut requeued = vec![];
        for tx in previous.iter().flat_map(|block| block.get_transactions()) {
            if self.chain.is_confirmed(tx.get_id()) {
                continue;
            }
            if let Err(e) = tx.validate_shape() {
                debug!("Not re-queueing orphaned transaction {}: {e}", tx.get_id());
                continue;
            }
            if self.mempool.add(tx.clone()) {
                requeued.push(tx.get_id().to_string());
            }
        }
        let confirmed = self.mempool.remove_all(self.chain.confirmed_ids());
        self.cancel_mining();

        Ok(ChainSwap {
            previous_len: previous.len(),
            new_len: self.chain.len(),
            requeued,
            confirmed,
        })
    }
}
