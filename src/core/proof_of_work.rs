use crate::core::Block;
use crate::mining::CancellationToken;
use log::{debug, info};

/// Required hex prefix on every non-genesis block digest (static difficulty)
pub const POW_PREFIX: &str = "0000";

pub struct ProofOfWork {
    block: Block,
    header: Vec<u8>,
    prefix: String,
}

impl ProofOfWork {
    pub fn new_proof_of_work(block: Block) -> ProofOfWork {
        let header = block.header_bytes();
        ProofOfWork {
            block,
            header,
            prefix: POW_PREFIX.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_prefix(mut self, prefix: &str) -> ProofOfWork {
        self.prefix = prefix.to_string();
        self
    }

    /// True when the digest carries the required prefix
    pub fn meets_target(hash: &str) -> bool {
        hash.starts_with(POW_PREFIX)
    }

    /// Validate proof-of-work for a sealed block
    pub fn validate(block: &Block) -> bool {
        let hash = block.compute_hash();
        hash == block.get_hash() && Self::meets_target(&hash)
    }

    fn prepare_data(&self, nonce: u64) -> String {
        Block::digest_with_nonce(&self.header, nonce)
    }

    /// Search nonces from zero until the prefix is met
    ///
    /// The token is checked on every attempt; a cancelled search returns
    /// `None` and the partially searched block is dropped.
    pub fn run(self, token: &CancellationToken) -> Option<Block> {
        let mut nonce: u64 = 0;
        loop {
            if token.is_cancelled() {
                debug!(
                    "Proof-of-work for block {} cancelled after {nonce} attempts",
                    self.block.get_index()
                );
                return None;
            }

            let hash = self.prepare_data(nonce);
            if hash.starts_with(self.prefix.as_str()) {
                info!(
                    "Proof-of-work found for block {}: {hash} (nonce {nonce})",
                    self.block.get_index()
                );
                let mut block = self.block;
                block.seal(nonce, hash);
                return Some(block);
            }

            nonce = match nonce.checked_add(1) {
                Some(next) => next,
                None => {
                    debug!("Nonce space exhausted for block {}", self.block.get_index());
                    return None;
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;
    use std::thread;
    use std::time::Duration;

    fn create_candidate() -> Block {
        let coinbase = Transaction::new_coinbase("miner", 1).unwrap();
        Block::new_candidate(&Block::genesis(), vec![], coinbase).unwrap()
    }

    #[test]
    fn test_run_finds_required_prefix() {
        let token = CancellationToken::new();
        let block = ProofOfWork::new_proof_of_work(create_candidate())
            .run(&token)
            .unwrap();

        assert!(block.get_hash().starts_with(POW_PREFIX));
        assert_eq!(block.get_hash(), block.compute_hash());
        assert!(ProofOfWork::validate(&block));
    }

    #[test]
    fn test_validate_rejects_tampered_nonce() {
        let token = CancellationToken::new();
        let mut block = ProofOfWork::new_proof_of_work(create_candidate())
            .run(&token)
            .unwrap();
        block.set_nonce(block.get_nonce().wrapping_add(1));
        assert!(!ProofOfWork::validate(&block));
    }

    #[test]
    fn test_genesis_is_not_proof_of_work_checked() {
        // The genesis literal is anchored by equality, not by its digest prefix
        let genesis = Block::genesis();
        assert_eq!(genesis.get_hash(), genesis.compute_hash());
    }

    #[test]
    fn test_pre_cancelled_search_returns_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(ProofOfWork::new_proof_of_work(create_candidate())
            .run(&token)
            .is_none());
    }

    #[test]
    fn test_search_stops_when_cancelled_mid_flight() {
        let token = CancellationToken::new();
        let search_token = token.clone();
        // An unreachable prefix keeps the search spinning until cancelled
        let handle = thread::spawn(move || {
            ProofOfWork::new_proof_of_work(create_candidate())
                .with_prefix("ffffffffffffffffffffffff")
                .run(&search_token)
        });

        thread::sleep(Duration::from_millis(50));
        token.cancel();
        assert!(handle.join().unwrap().is_none());
    }
}
