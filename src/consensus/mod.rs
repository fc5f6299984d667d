//! Consensus
//!
//! Longest valid chain wins; ties keep the incumbent. This module owns the
//! rules for accepting single blocks, swapping whole chains and pulling the
//! network's chain at startup.

pub mod manager;
pub mod sync;

pub use manager::{BlockAcceptance, ConsensusManager, ReplaceOutcome, SyncReport};
pub use sync::SyncTracker;
