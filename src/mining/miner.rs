use crate::core::{Block, ProofOfWork, Transaction};
use crate::error::Result;
use crate::mining::CancellationToken;
use log::info;

/// Builds candidate blocks for the local identity and searches for a nonce
#[derive(Debug, Clone)]
pub struct Miner {
    identity: String,
}

impl Miner {
    pub fn new(identity: &str) -> Miner {
        Miner {
            identity: identity.to_string(),
        }
    }

    pub fn get_identity(&self) -> &str {
        self.identity.as_str()
    }

    /// Mine one block over `mempool_snapshot` on top of `tip`
    ///
    /// Returns `Ok(None)` when `token` is cancelled before a nonce is found.
    pub fn mine(
        &self,
        mempool_snapshot: &[Transaction],
        tip: &Block,
        token: &CancellationToken,
    ) -> Result<Option<Block>> {
        let index = tip.get_index() + 1;
        let coinbase = Transaction::new_coinbase(&self.identity, index)?;
        let candidate = Block::new_candidate(tip, mempool_snapshot.to_vec(), coinbase)?;

        info!(
            "Mining block {index} over {} transaction(s) on tip {}",
            mempool_snapshot.len(),
            tip.get_hash()
        );
        Ok(ProofOfWork::new_proof_of_work(candidate).run(token))
    }
}
