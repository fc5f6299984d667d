use crate::core::{Block, Transaction};
use crate::error::Result;
use crate::mining::{CancellationToken, Miner};
use crate::network::GossipEngine;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

const IDLE_WAIT: Duration = Duration::from_millis(500);

/// A consistent (tip, mempool) snapshot plus the token that aborts its search
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub tip: Block,
    pub transactions: Vec<Transaction>,
    pub token: CancellationToken,
}

/// Background mining loop
///
/// Sleeps on the node's work signal, mines one block per job and hands the
/// result to the gossip engine, which accepts it locally before
/// broadcasting. A tip change cancels the job; the loop then picks up a
/// fresh job on the new tip.
pub struct MiningWorker {
    engine: Arc<GossipEngine>,
    miner: Miner,
    mine_empty_blocks: bool,
    shutdown: CancellationToken,
}

impl MiningWorker {
    pub fn new(
        engine: Arc<GossipEngine>,
        mine_empty_blocks: bool,
        shutdown: CancellationToken,
    ) -> MiningWorker {
        let miner = Miner::new(engine.state().get_identity());
        MiningWorker {
            engine,
            miner,
            mine_empty_blocks,
            shutdown,
        }
    }

    /// Run a single job to completion or cancellation
    ///
    /// Returns the block only if it was accepted and broadcast.
    pub fn mine_once(&self, allow_empty: bool) -> Result<Option<Block>> {
        let job = self.engine.consensus().mining_job()?;
        if job.transactions.is_empty() && !allow_empty {
            job.token.cancel();
            return Ok(None);
        }

        let block = match self.miner.mine(&job.transactions, &job.tip, &job.token)? {
            Some(block) => block,
            None => {
                debug!(
                    "Mining on tip {} cancelled, restarting on the new tip",
                    job.tip.get_hash()
                );
                return Ok(None);
            }
        };

        if self.engine.submit_mined_block(block.clone(), &job.token)? {
            Ok(Some(block))
        } else {
            Ok(None)
        }
    }

    pub fn run(&self) {
        info!(
            "Mining loop started for {} (empty blocks: {})",
            self.miner.get_identity(),
            self.mine_empty_blocks
        );
        let work = self.engine.state().work();
        while !self.shutdown.is_cancelled() {
            let generation = work.current();
            match self.mine_once(self.mine_empty_blocks) {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => warn!("Mining attempt failed: {e}"),
            }
            work.wait_for_change(generation, IDLE_WAIT);
        }
        info!("Mining loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::GossipMessage;
    use crate::testnet::{addr, mine_block_on, test_engine};
    use std::thread;

    #[test]
    fn test_mine_once_skips_empty_mempool() {
        let (engine, transport) = test_engine("127.0.0.1:7001");
        let worker = MiningWorker::new(Arc::clone(&engine), false, CancellationToken::new());
        assert_eq!(worker.mine_once(false).unwrap(), None);
        assert_eq!(engine.state().chain_len().unwrap(), 1);
        assert!(transport.is_empty());
    }

    #[test]
    fn test_mine_once_appends_and_broadcasts() {
        let (engine, transport) = test_engine("127.0.0.1:7001");
        engine
            .state()
            .peers()
            .merge(&["127.0.0.1:7002".to_string()])
            .unwrap();
        engine
            .submit_transaction(Transaction::from_parts("t1", "alice", "bob", 3, 0))
            .unwrap();
        transport.drain();

        let worker = MiningWorker::new(Arc::clone(&engine), false, CancellationToken::new());
        let block = worker.mine_once(false).unwrap().unwrap();

        assert_eq!(engine.state().tip().unwrap(), block);
        assert!(engine.state().mempool_snapshot().unwrap().is_empty());
        assert_eq!(block.get_coinbase().get_recipient(), "node-127.0.0.1:7001");
        assert!(engine.state().seen().has_block(block.get_hash()));
        assert_eq!(
            transport.drain(),
            vec![(
                addr("127.0.0.1:7002"),
                GossipMessage::block(block, engine.get_gossip_ttl())
            )]
        );
    }

    #[test]
    fn test_stale_search_never_broadcasts() {
        let (engine, transport) = test_engine("127.0.0.1:7001");
        engine
            .state()
            .peers()
            .merge(&["127.0.0.1:7002".to_string()])
            .unwrap();

        let job = engine.consensus().mining_job().unwrap();
        let competitor = mine_block_on(&job.tip, vec![], "remote");
        engine
            .handle(
                GossipMessage::block(competitor.clone(), 0),
                addr("127.0.0.1:7002"),
            )
            .unwrap();
        assert!(job.token.is_cancelled());

        let miner = Miner::new("local");
        assert_eq!(miner.mine(&[], &job.tip, &job.token).unwrap(), None);
        transport.drain();

        // Even a block found just before the cancel is refused
        let late = mine_block_on(&job.tip, vec![], "local");
        assert!(!engine.submit_mined_block(late, &job.token).unwrap());
        assert!(transport.is_empty());
        assert_eq!(engine.state().tip().unwrap(), competitor);
    }

    #[test]
    fn test_run_stops_on_shutdown() {
        let (engine, _transport) = test_engine("127.0.0.1:7001");
        let shutdown = CancellationToken::new();
        let worker = MiningWorker::new(engine, false, shutdown.clone());
        let handle = thread::spawn(move || worker.run());
        shutdown.cancel();
        handle.join().unwrap();
    }
}
