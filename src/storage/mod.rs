//! In-memory node storage
//!
//! The mempool of pending transactions and the dedup set used by gossip.

pub mod memory_pool;
pub mod seen_set;

pub use memory_pool::MemoryPool;
pub use seen_set::{SeenSet, DEFAULT_SEEN_CAPACITY};
