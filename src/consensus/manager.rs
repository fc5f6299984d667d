use crate::consensus::SyncTracker;
use crate::core::{check_intrinsic, check_linkage, validate_chain, Block};
use crate::error::{BlockchainError, Result};
use crate::mining::{CancellationToken, MiningJob};
use crate::network::GossipEngine;
use crate::node::{ChainSwap, Ledger, NodeState};
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const PEER_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Result of offering a single block to the local chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockAcceptance {
    /// Extended the tip; `confirmed` pending transactions left the mempool
    Appended { confirmed: usize },
    /// Valid on its own but not built on our tip
    Detached,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    Replaced(ChainSwap),
    /// Candidate was not longer; the local chain stays
    KeptLocal { local_len: usize, candidate_len: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub peers_asked: usize,
    pub responses: usize,
    pub chain_len: usize,
}

/// Longest-valid-chain rules on top of the shared ledger
pub struct ConsensusManager {
    state: Arc<NodeState>,
    sync: SyncTracker,
}

impl ConsensusManager {
    pub fn new(state: Arc<NodeState>) -> ConsensusManager {
        ConsensusManager {
            state,
            sync: SyncTracker::new(),
        }
    }

    pub fn state(&self) -> &Arc<NodeState> {
        &self.state
    }

    /// Offer a block received from the network
    ///
    /// Intrinsic failures are a `ValidationError`. A block that is sound but
    /// does not sit on the tip comes back as `Detached` so the caller can
    /// fetch the sender's chain.
    pub fn accept_block(&self, block: Block) -> Result<BlockAcceptance> {
        check_intrinsic(&block)?;
        let mut ledger = self.state.write_ledger()?;
        self.append_locked(&mut ledger, block)
    }

    /// Offer a block this node mined under `token`
    ///
    /// Goes through the same append path as network blocks. If the tip moved
    /// after the search started the token is already cancelled and the
    /// block is dropped; the check happens under the ledger lock, so a
    /// stale block can never slip in behind a concurrent tip change.
    pub fn accept_mined_block(&self, block: Block, token: &CancellationToken) -> Result<bool> {
        check_intrinsic(&block)?;
        let mut ledger = self.state.write_ledger()?;
        if token.is_cancelled() {
            debug!(
                "Discarding mined block {}: tip moved during the search",
                block.get_index()
            );
            return Ok(false);
        }
        Ok(matches!(
            self.append_locked(&mut ledger, block)?,
            BlockAcceptance::Appended { .. }
        ))
    }

    fn append_locked(&self, ledger: &mut Ledger, block: Block) -> Result<BlockAcceptance> {
        if let Err(e) = check_linkage(ledger.tip(), &block) {
            debug!("Block {} does not extend tip: {e}", block.get_hash());
            return Ok(BlockAcceptance::Detached);
        }

        let index = block.get_index();
        let hash = block.get_hash().to_string();
        let confirmed = ledger.append_block(block)?;
        info!("Appended block {index} ({hash}), {confirmed} pending transaction(s) confirmed");
        self.state.work().notify();
        Ok(BlockAcceptance::Appended { confirmed })
    }

    /// Adopt `candidate` if it is valid and strictly longer than the local chain
    ///
    /// Equal length keeps the incumbent and reports a `ConsensusConflict`
    /// unless the two chains are the same.
    pub fn replace_chain(&self, candidate: Vec<Block>) -> Result<ReplaceOutcome> {
        validate_chain(&candidate)?;

        let hashes: Vec<String> = candidate
            .iter()
            .map(|block| block.get_hash().to_string())
            .collect();

        let mut ledger = self.state.write_ledger()?;
        let local_len = ledger.chain().len();
        let candidate_len = candidate.len();

        if candidate_len == local_len {
            if ledger.tip().get_hash() == candidate[candidate_len - 1].get_hash() {
                return Ok(ReplaceOutcome::KeptLocal {
                    local_len,
                    candidate_len,
                });
            }
            return Err(BlockchainError::ConsensusConflict { length: local_len });
        }
        if candidate_len < local_len {
            return Ok(ReplaceOutcome::KeptLocal {
                local_len,
                candidate_len,
            });
        }

        let swap = ledger.replace_chain(candidate)?;
        drop(ledger);

        for hash in &hashes {
            self.state.seen().mark_block(hash);
        }
        self.state.work().notify();
        info!(
            "Chain replaced: length {} -> {}, {} transaction(s) re-queued, {} confirmed",
            swap.previous_len,
            swap.new_len,
            swap.requeued.len(),
            swap.confirmed
        );
        Ok(ReplaceOutcome::Replaced(swap))
    }

    /// Entry point for FULL_CHAIN responses
    ///
    /// The response is counted only once `replace_chain` has settled, so a
    /// finished startup sync always sees the chain it reports.
    pub fn handle_full_chain(&self, chain: Vec<Block>, from: SocketAddr) -> Result<ReplaceOutcome> {
        debug!("FULL_CHAIN of length {} from {from}", chain.len());
        let outcome = self.replace_chain(chain);
        self.sync.record_response();
        outcome
    }

    /// Snapshot tip and mempool together and register a cancellable search
    pub fn mining_job(&self) -> Result<MiningJob> {
        let mut ledger = self.state.write_ledger()?;
        let token = ledger.register_mining();
        Ok(MiningJob {
            tip: ledger.tip().clone(),
            transactions: ledger.mempool().get_all(),
            token,
        })
    }

    pub fn cancel_mining(&self) -> Result<usize> {
        Ok(self.state.write_ledger()?.cancel_mining())
    }

    /// Pull the network's chain once peers are known
    ///
    /// Waits up to `peer_wait` for the peer directory to fill, asks every
    /// peer for its chain and then waits up to `response_wait` for the
    /// answers. Each answer goes through `replace_chain`, so the longest
    /// valid one wins. With no peers or no answers the local chain stands.
    pub fn sync_on_startup(
        &self,
        engine: &GossipEngine,
        peer_wait: Duration,
        response_wait: Duration,
    ) -> Result<SyncReport> {
        let deadline = Instant::now() + peer_wait;
        let peers = loop {
            let peers = self.state.peers().peers()?;
            if !peers.is_empty() {
                break peers;
            }
            let now = Instant::now();
            if now >= deadline {
                info!("No peers discovered, continuing with the local chain");
                return Ok(SyncReport {
                    peers_asked: 0,
                    responses: 0,
                    chain_len: self.state.chain_len()?,
                });
            }
            thread::sleep(PEER_POLL_INTERVAL.min(deadline - now));
        };

        self.sync.reset();
        for peer in &peers {
            if let Err(e) = engine.request_chain(*peer) {
                warn!("Failed to request chain from {peer}: {e}");
            }
        }

        let responses = self.sync.wait_for(peers.len(), response_wait);
        let report = SyncReport {
            peers_asked: peers.len(),
            responses,
            chain_len: self.state.chain_len()?,
        };
        if responses == 0 {
            info!(
                "Startup sync timed out with no responses from {} peer(s), continuing with the local chain",
                report.peers_asked
            );
        } else {
            info!(
                "Startup sync finished: {responses}/{} response(s), chain length {}",
                report.peers_asked, report.chain_len
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transaction;
    use crate::network::{GossipMessage, MemoryTransport};
    use crate::testnet::{addr, mine_block_on, mine_chain, mine_chain_with, test_engine, test_state};

    fn tx(id: &str) -> Transaction {
        Transaction::from_parts(id, "alice", "bob", 1, 0)
    }

    #[test]
    fn test_accept_block_appends_and_cancels_mining() {
        let state = test_state("127.0.0.1:7001");
        let consensus = ConsensusManager::new(Arc::clone(&state));
        let job = consensus.mining_job().unwrap();

        let block = mine_block_on(&job.tip, vec![], "remote");
        assert_eq!(
            consensus.accept_block(block).unwrap(),
            BlockAcceptance::Appended { confirmed: 0 }
        );
        assert!(job.token.is_cancelled());
    }

    #[test]
    fn test_accept_block_reports_detached() {
        let state = test_state("127.0.0.1:7001");
        let consensus = ConsensusManager::new(state);
        let remote = mine_chain_with(3, "remote", vec![]);
        assert_eq!(
            consensus.accept_block(remote[2].clone()).unwrap(),
            BlockAcceptance::Detached
        );
    }

    #[test]
    fn test_mined_block_dropped_after_tip_moves() {
        let state = test_state("127.0.0.1:7001");
        let consensus = ConsensusManager::new(Arc::clone(&state));
        let job = consensus.mining_job().unwrap();
        let ours = mine_block_on(&job.tip, vec![], "local");
        let theirs = mine_block_on(&job.tip, vec![], "remote");

        consensus.accept_block(theirs.clone()).unwrap();
        assert!(!consensus.accept_mined_block(ours, &job.token).unwrap());
        assert_eq!(state.tip().unwrap(), theirs);
    }

    #[test]
    fn test_replace_chain_policies() {
        let state = test_state("127.0.0.1:7001");
        let consensus = ConsensusManager::new(Arc::clone(&state));
        state.write_ledger().unwrap().add_transaction(tx("t1")).unwrap();

        let longer = mine_chain_with(3, "remote", vec![vec![tx("t1")]]);
        match consensus.replace_chain(longer.clone()).unwrap() {
            ReplaceOutcome::Replaced(swap) => assert_eq!(swap.confirmed, 1),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(state.mempool_snapshot().unwrap().is_empty());
        assert!(state.seen().has_block(longer[2].get_hash()));

        // Same chain again is not a conflict
        assert!(matches!(
            consensus.replace_chain(longer.clone()).unwrap(),
            ReplaceOutcome::KeptLocal { .. }
        ));

        // Competing chain of equal length keeps the incumbent
        let rival = mine_chain_with(3, "rival", vec![]);
        assert_eq!(
            consensus.replace_chain(rival).unwrap_err(),
            BlockchainError::ConsensusConflict { length: 3 }
        );

        let shorter = mine_chain_with(2, "short", vec![]);
        assert_eq!(
            consensus.replace_chain(shorter).unwrap(),
            ReplaceOutcome::KeptLocal {
                local_len: 3,
                candidate_len: 2
            }
        );
        assert_eq!(state.tip().unwrap(), longer[2]);
    }

    #[test]
    fn test_replace_chain_rejects_invalid_candidate() {
        let state = test_state("127.0.0.1:7001");
        let consensus = ConsensusManager::new(Arc::clone(&state));
        let mut broken = mine_chain_with(4, "remote", vec![]);
        broken.swap(1, 2);
        assert!(consensus.replace_chain(broken).unwrap_err().is_validation());
        assert_eq!(state.chain_len().unwrap(), 1);
    }

    /// Answer every REQ_CHAIN recorded on `transport` with the next chain
    fn answer_requests(engine: &GossipEngine, transport: &MemoryTransport, mut chains: Vec<Vec<Block>>) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !chains.is_empty() && Instant::now() < deadline {
            for (to, message) in transport.drain() {
                if matches!(message, GossipMessage::ReqChain) && !chains.is_empty() {
                    let chain = chains.remove(0);
                    let _ = engine.handle(GossipMessage::FullChain { chain }, to);
                }
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_sync_without_peers_keeps_local_chain() {
        let (engine, transport) = test_engine("127.0.0.1:7001");
        let report = engine
            .consensus()
            .sync_on_startup(&engine, Duration::from_millis(50), Duration::from_millis(50))
            .unwrap();
        assert_eq!(
            report,
            SyncReport {
                peers_asked: 0,
                responses: 0,
                chain_len: 1
            }
        );
        assert!(transport.is_empty());
    }

    #[test]
    fn test_sync_times_out_on_silent_peer() {
        let (engine, transport) = test_engine("127.0.0.1:7001");
        engine
            .state()
            .peers()
            .merge(&["127.0.0.1:7002".to_string()])
            .unwrap();

        let started = Instant::now();
        let report = engine
            .consensus()
            .sync_on_startup(&engine, Duration::from_secs(1), Duration::from_millis(100))
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(report.peers_asked, 1);
        assert_eq!(report.responses, 0);
        assert_eq!(report.chain_len, 1);
        let sent = transport.drain();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, addr("127.0.0.1:7002"));
        assert!(matches!(sent[0].1, GossipMessage::ReqChain));
    }

    #[test]
    fn test_sync_adopts_longest_answer() {
        let (engine, transport) = test_engine("127.0.0.1:7001");
        engine
            .state()
            .peers()
            .merge(&["127.0.0.1:7002".to_string(), "127.0.0.1:7003".to_string()])
            .unwrap();
        let longest = mine_chain(4, "far");
        let chains = vec![mine_chain(3, "near"), longest.clone()];

        let report = thread::scope(|scope| {
            scope.spawn(|| answer_requests(&engine, &transport, chains));
            engine
                .consensus()
                .sync_on_startup(&engine, Duration::from_secs(1), Duration::from_secs(10))
                .unwrap()
        });

        assert_eq!(
            report,
            SyncReport {
                peers_asked: 2,
                responses: 2,
                chain_len: 4
            }
        );
        assert_eq!(engine.state().tip().unwrap(), longest[3]);
    }

    #[test]
    fn test_full_chain_counts_response_even_when_rejected() {
        let state = test_state("127.0.0.1:7001");
        let consensus = ConsensusManager::new(Arc::clone(&state));
        let mut broken = mine_chain(3, "remote");
        broken.swap(1, 2);

        assert!(consensus
            .handle_full_chain(broken, addr("127.0.0.1:7002"))
            .is_err());
        assert_eq!(consensus.sync.responses(), 1);
        assert_eq!(state.chain_len().unwrap(), 1);
    }
}
