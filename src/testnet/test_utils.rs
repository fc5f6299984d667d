//! Test utilities for chain and gossip testing

use crate::consensus::ConsensusManager;
use crate::core::{Block, Transaction};
use crate::mining::{CancellationToken, Miner};
use crate::network::{GossipEngine, MemoryTransport, Transport};
use crate::node::NodeState;
use crate::storage::DEFAULT_SEEN_CAPACITY;
use std::net::SocketAddr;
use std::sync::Arc;

pub const TEST_GOSSIP_TTL: u32 = 3;

pub fn addr(value: &str) -> SocketAddr {
    value.parse().unwrap()
}

/// Mine one block over `transactions` on top of `tip`
pub fn mine_block_on(tip: &Block, transactions: Vec<Transaction>, miner: &str) -> Block {
    Miner::new(miner)
        .mine(&transactions, tip, &CancellationToken::new())
        .unwrap()
        .unwrap()
}

/// A valid chain of `len` blocks, genesis included, with empty blocks
pub fn mine_chain(len: usize, miner: &str) -> Vec<Block> {
    mine_chain_with(len, miner, vec![])
}

/// A valid chain of `len` blocks where block `i + 1` carries `transactions[i]`
pub fn mine_chain_with(
    len: usize,
    miner: &str,
    transactions: Vec<Vec<Transaction>>,
) -> Vec<Block> {
    let mut transactions = transactions.into_iter();
    let mut chain = vec![Block::genesis()];
    while chain.len() < len {
        let txs = transactions.next().unwrap_or_default();
        let block = mine_block_on(&chain[chain.len() - 1], txs, miner);
        chain.push(block);
    }
    chain
}

pub fn test_state(self_addr: &str) -> Arc<NodeState> {
    Arc::new(NodeState::new(
        &format!("node-{self_addr}"),
        addr(self_addr),
        DEFAULT_SEEN_CAPACITY,
    ))
}

/// A gossip engine whose sends are recorded instead of put on the wire
pub fn test_engine(self_addr: &str) -> (Arc<GossipEngine>, Arc<MemoryTransport>) {
    let state = test_state(self_addr);
    let consensus = Arc::new(ConsensusManager::new(state));
    let transport = Arc::new(MemoryTransport::new());
    let engine = GossipEngine::new(
        consensus,
        Arc::clone(&transport) as Arc<dyn Transport>,
        TEST_GOSSIP_TTL,
    );
    (Arc::new(engine), transport)
}
