//! Node state
//!
//! One explicit aggregate per node instance, handed to every concurrent
//! activity through an `Arc`. Several nodes can live in one process.

pub mod ledger;
pub mod state;

pub use ledger::{ChainSwap, Ledger};
pub use state::NodeState;
