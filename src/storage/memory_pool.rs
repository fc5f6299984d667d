use crate::core::Transaction;
use std::collections::{HashMap, HashSet};

/// Pending transactions, ( K -> txid, V => Transaction )
///
/// Iteration follows insertion order so block construction is stable. The
/// pool has no lock of its own: it lives inside the node ledger next to the
/// chain so both change under one write guard.
#[derive(Debug, Clone, Default)]
pub struct MemoryPool {
    order: Vec<String>,
    entries: HashMap<String, Transaction>,
}

impl MemoryPool {
    pub fn new() -> MemoryPool {
        MemoryPool::default()
    }

    pub fn get(&self, txid: &str) -> Option<Transaction> {
        self.entries.get(txid).cloned()
    }

    /// Insert `tx`; returns false if its id is already pending
    pub fn add(&mut self, tx: Transaction) -> bool {
        if self.entries.contains_key(tx.get_id()) {
            return false;
        }
        self.order.push(tx.get_id().to_string());
        self.entries.insert(tx.get_id().to_string(), tx);
        true
    }

    pub fn contains(&self, txid: &str) -> bool {
        self.entries.contains_key(txid)
    }

    pub fn remove(&mut self, txid: &str) -> Option<Transaction> {
        let removed = self.entries.remove(txid)?;
        self.order.retain(|id| id != txid);
        Some(removed)
    }

    /// Drop every pending transaction whose id is in `txids`
    pub fn remove_all(&mut self, txids: &HashSet<String>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| !txids.contains(id));
        self.order.retain(|id| !txids.contains(id));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insertion-ordered copy of every pending transaction
    pub fn get_all(&self) -> Vec<Transaction> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}
