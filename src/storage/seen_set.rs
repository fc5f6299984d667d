use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// Default number of ids remembered per kind before the oldest are evicted
pub const DEFAULT_SEEN_CAPACITY: usize = 100_000;

#[derive(Debug)]
struct BoundedSet {
    members: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl BoundedSet {
    fn new(capacity: usize) -> BoundedSet {
        BoundedSet {
            members: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    fn insert(&mut self, key: &str) -> bool {
        if !self.members.insert(key.to_string()) {
            return false;
        }
        self.order.push_back(key.to_string());
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }
}

/// Transaction ids and block hashes that were already processed
///
/// Kept apart from the ledger lock: dedup has no invariant tying it to the
/// chain. Each kind is bounded and evicts first-in, first-out; TTL still
/// terminates flooding for anything evicted and re-delivered.
#[derive(Debug)]
pub struct SeenSet {
    transactions: Mutex<BoundedSet>,
    blocks: Mutex<BoundedSet>,
}

impl Default for SeenSet {
    fn default() -> Self {
        Self::new(DEFAULT_SEEN_CAPACITY)
    }
}

impl SeenSet {
    pub fn new(capacity: usize) -> SeenSet {
        SeenSet {
            transactions: Mutex::new(BoundedSet::new(capacity)),
            blocks: Mutex::new(BoundedSet::new(capacity)),
        }
    }

    fn guard(set: &Mutex<BoundedSet>) -> MutexGuard<'_, BoundedSet> {
        match set.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("Seen set lock poisoned, continuing with recovered state");
                poisoned.into_inner()
            }
        }
    }

    pub fn has_transaction(&self, txid: &str) -> bool {
        Self::guard(&self.transactions).members.contains(txid)
    }

    /// Record `txid`; returns true only the first time
    pub fn mark_transaction(&self, txid: &str) -> bool {
        Self::guard(&self.transactions).insert(txid)
    }

    pub fn has_block(&self, hash: &str) -> bool {
        Self::guard(&self.blocks).members.contains(hash)
    }

    /// Record `hash`; returns true only the first time
    pub fn mark_block(&self, hash: &str) -> bool {
        Self::guard(&self.blocks).insert(hash)
    }

    pub fn len(&self) -> usize {
        Self::guard(&self.transactions).members.len() + Self::guard(&self.blocks).members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
