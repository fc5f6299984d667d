use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::mining::WorkSignal;
use crate::network::PeerDirectory;
use crate::node::Ledger;
use crate::storage::SeenSet;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Everything one node instance knows, shared by its concurrent activities
///
/// The ledger (chain + mempool) sits behind a single coarse lock. The seen
/// set, peer directory and work signal carry their own finer locks because
/// they share no invariant with the chain.
pub struct NodeState {
    identity: String,
    ledger: RwLock<Ledger>,
    seen: SeenSet,
    peers: PeerDirectory,
    work: WorkSignal,
}

impl NodeState {
    pub fn new(identity: &str, self_addr: SocketAddr, seen_capacity: usize) -> NodeState {
        NodeState {
            identity: identity.to_string(),
            ledger: RwLock::new(Ledger::new()),
            seen: SeenSet::new(seen_capacity),
            peers: PeerDirectory::new(self_addr),
            work: WorkSignal::new(),
        }
    }

    pub fn get_identity(&self) -> &str {
        self.identity.as_str()
    }

    pub fn read_ledger(&self) -> Result<RwLockReadGuard<'_, Ledger>> {
        self.ledger
            .read()
            .map_err(|e| BlockchainError::State(format!("Failed to acquire ledger lock: {e}")))
    }

    pub fn write_ledger(&self) -> Result<RwLockWriteGuard<'_, Ledger>> {
        self.ledger
            .write()
            .map_err(|e| BlockchainError::State(format!("Failed to acquire ledger lock: {e}")))
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn peers(&self) -> &PeerDirectory {
        &self.peers
    }

    pub fn work(&self) -> &WorkSignal {
        &self.work
    }

    pub fn chain_snapshot(&self) -> Result<Arc<Vec<Block>>> {
        Ok(self.read_ledger()?.chain().snapshot())
    }

    pub fn mempool_snapshot(&self) -> Result<Vec<Transaction>> {
        Ok(self.read_ledger()?.mempool().get_all())
    }

    pub fn tip(&self) -> Result<Block> {
        Ok(self.read_ledger()?.tip().clone())
    }

    pub fn chain_len(&self) -> Result<usize> {
        Ok(self.read_ledger()?.chain().len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_state_is_genesis_only() {
        let state = NodeState::new("node-a", "127.0.0.1:7001".parse().unwrap(), 16);
        assert_eq!(state.chain_len().unwrap(), 1);
        assert!(state.tip().unwrap().is_genesis());
        assert!(state.mempool_snapshot().unwrap().is_empty());
        assert!(state.peers().is_empty().unwrap());
        assert_eq!(state.get_identity(), "node-a");
    }

    #[test]
    fn test_independent_states_do_not_share_chain() {
        let a = NodeState::new("a", "127.0.0.1:7001".parse().unwrap(), 16);
        let b = NodeState::new("b", "127.0.0.1:7002".parse().unwrap(), 16);
        let tx = Transaction::from_parts("t1", "alice", "bob", 1, 0);
        a.write_ledger().unwrap().add_transaction(tx).unwrap();
        assert_eq!(a.mempool_snapshot().unwrap().len(), 1);
        assert!(b.mempool_snapshot().unwrap().is_empty());
    }
}
