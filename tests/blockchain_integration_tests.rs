//! Blockchain integration tests
//!
//! Chain validation and longest-chain reconciliation through the public API.

use gossip_chain::consensus::{ConsensusManager, ReplaceOutcome};
use gossip_chain::core::{validate_chain, Block, ProofOfWork, Transaction, BLOCK_REWARD};
use gossip_chain::mining::{CancellationToken, Miner};
use gossip_chain::node::NodeState;
use gossip_chain::BlockchainError;
use std::sync::Arc;

fn tx(id: &str) -> Transaction {
    Transaction::from_parts(id, "alice", "bob", 10, 1)
}

fn mine_on(tip: &Block, txs: Vec<Transaction>, miner: &str) -> Block {
    Miner::new(miner)
        .mine(&txs, tip, &CancellationToken::new())
        .unwrap()
        .unwrap()
}

/// Chain of `len` blocks; block `i + 1` carries `txs[i]`
fn mine_chain(len: usize, miner: &str, txs: Vec<Vec<Transaction>>) -> Vec<Block> {
    let mut txs = txs.into_iter();
    let mut chain = vec![Block::genesis()];
    while chain.len() < len {
        let block = mine_on(&chain[chain.len() - 1], txs.next().unwrap_or_default(), miner);
        chain.push(block);
    }
    chain
}

fn new_node() -> (Arc<NodeState>, ConsensusManager) {
    let state = Arc::new(NodeState::new(
        "node-a",
        "127.0.0.1:7001".parse().unwrap(),
        1024,
    ));
    let consensus = ConsensusManager::new(Arc::clone(&state));
    (state, consensus)
}

#[test]
fn test_genesis_is_deterministic() {
    let a = Block::genesis();
    let b = Block::genesis();
    assert_eq!(a, b);
    assert_eq!(
        serde_json::to_vec(&a).unwrap(),
        serde_json::to_vec(&b).unwrap()
    );
    assert_eq!(a.get_index(), 0);
    assert_eq!(a.get_previous_hash(), "0".repeat(64));
    assert!(a.get_transactions().is_empty());
    assert_eq!(a.compute_hash(), a.get_hash());
}

#[test]
fn test_mined_chain_is_valid_and_gapless() {
    let chain = mine_chain(4, "miner", vec![vec![tx("t1")], vec![tx("t2"), tx("t3")]]);
    assert!(validate_chain(&chain).is_ok());
    for (i, pair) in chain.windows(2).enumerate() {
        assert_eq!(pair[1].get_index(), i as u64 + 1);
        assert_eq!(pair[1].get_previous_hash(), pair[0].get_hash());
        assert!(ProofOfWork::validate(&pair[1]));
        assert_eq!(pair[1].get_coinbase().get_amount(), BLOCK_REWARD);
    }
}

#[test]
fn test_chain_not_rooted_at_genesis_is_rejected() {
    let mut chain = mine_chain(3, "miner", vec![]);
    chain.remove(0);
    assert!(matches!(
        validate_chain(&chain),
        Err(BlockchainError::InvalidChain(_))
    ));
}

#[test]
fn test_longest_chain_adoption_and_reorg_requeue() {
    let (state, consensus) = new_node();

    // Local chain of length 3 confirms "orphan" and "shared"
    let local = mine_chain(
        3,
        "node-a",
        vec![vec![tx("orphan")], vec![tx("shared")]],
    );
    consensus.replace_chain(local).unwrap();
    assert_eq!(state.chain_len().unwrap(), 3);

    // Pending locally, confirmed by the longer chain
    state
        .write_ledger()
        .unwrap()
        .add_transaction(tx("pending"))
        .unwrap();

    let remote = mine_chain(
        5,
        "node-b",
        vec![vec![tx("shared")], vec![], vec![tx("pending")], vec![]],
    );
    let outcome = consensus.replace_chain(remote.clone()).unwrap();
    let swap = match outcome {
        ReplaceOutcome::Replaced(swap) => swap,
        other => panic!("expected replacement, got {other:?}"),
    };
    assert_eq!(swap.previous_len, 3);
    assert_eq!(swap.new_len, 5);
    assert_eq!(swap.requeued, vec!["orphan".to_string()]);

    assert_eq!(state.chain_snapshot().unwrap().as_ref(), &remote);
    let mempool: Vec<String> = state
        .mempool_snapshot()
        .unwrap()
        .iter()
        .map(|tx| tx.get_id().to_string())
        .collect();
    assert_eq!(mempool, vec!["orphan".to_string()]);
}

#[test]
fn test_equal_length_keeps_incumbent() {
    let (state, consensus) = new_node();
    let incumbent = mine_chain(3, "node-a", vec![]);
    consensus.replace_chain(incumbent.clone()).unwrap();

    let rival = mine_chain(3, "node-b", vec![]);
    assert_eq!(
        consensus.replace_chain(rival),
        Err(BlockchainError::ConsensusConflict { length: 3 })
    );
    assert_eq!(state.chain_snapshot().unwrap().as_ref(), &incumbent);
}

#[test]
fn test_invalid_candidate_leaves_state_untouched() {
    let (state, consensus) = new_node();
    state
        .write_ledger()
        .unwrap()
        .add_transaction(tx("pending"))
        .unwrap();

    let mut forged = mine_chain(4, "node-b", vec![]);
    let foreign_tip = mine_on(&Block::genesis(), vec![], "node-c");
    forged[3] = foreign_tip;

    let err = consensus.replace_chain(forged).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(state.chain_len().unwrap(), 1);
    assert_eq!(state.mempool_snapshot().unwrap().len(), 1);
}

#[test]
fn test_tip_change_cancels_in_flight_mining() {
    let (state, consensus) = new_node();
    let job = consensus.mining_job().unwrap();
    assert!(job.tip.is_genesis());

    let competitor = mine_on(&job.tip, vec![], "node-b");
    consensus.accept_block(competitor.clone()).unwrap();

    assert!(job.token.is_cancelled());
    assert_eq!(
        Miner::new("node-a")
            .mine(&job.transactions, &job.tip, &job.token)
            .unwrap(),
        None
    );
    let stale = mine_on(&job.tip, vec![], "node-a");
    assert!(!consensus.accept_mined_block(stale, &job.token).unwrap());
    assert_eq!(state.tip().unwrap(), competitor);
}
