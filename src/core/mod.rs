//! Core blockchain functionality
//!
//! Blocks, transactions, the genesis literal, proof-of-work and the
//! validation rules every node applies identically.

pub mod block;
pub mod chain;
pub mod monetary;
pub mod proof_of_work;
pub mod transaction;
pub mod validation;

pub use block::{Block, GENESIS_PREVIOUS_HASH, GENESIS_TIMESTAMP};
pub use chain::ChainStore;
pub use monetary::{BLOCK_REWARD, UNITS_PER_COIN};
pub use proof_of_work::{ProofOfWork, POW_PREFIX};
pub use transaction::{Transaction, COINBASE_SENDER};
pub use validation::{check_intrinsic, check_linkage, validate_block, validate_chain};
