//! # Gossip Chain
//!
//! A small proof-of-work blockchain node that talks to its peers with
//! single UDP datagrams and finds them through a rendezvous registry.
//!
//! ## How the code is organized
//! - `core/`: blocks, transactions, genesis, proof-of-work, validation and the chain store
//! - `storage/`: the mempool and the gossip dedup set
//! - `node/`: the per-node state aggregate and the ledger lock
//! - `network/`: wire messages, transports, peer directory, gossip engine, UDP server
//! - `consensus/`: block acceptance, longest-chain replacement, startup sync
//! - `mining/`: cancellable nonce search and the background mining loop
//! - `rendezvous/`: the discovery registry service
//! - `config/`: layered node configuration
//! - `cli/`: command-line parsing and the interactive console
//!
//! ## Where to start reading
//! 1. `network/gossip.rs` for what happens to each inbound message
//! 2. `consensus/manager.rs` for when the chain changes
//! 3. `node/ledger.rs` for how chain, mempool and mining stay consistent
//! 4. `mining/worker.rs` for how mining reacts to tip changes

pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod error;
pub mod mining;
pub mod network;
pub mod node;
pub mod rendezvous;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub mod testnet;

pub use cli::{Command, Console, Opt};
pub use config::Config;
pub use consensus::{BlockAcceptance, ConsensusManager, ReplaceOutcome, SyncReport};
pub use crate::core::{Block, ProofOfWork, Transaction, BLOCK_REWARD};
pub use error::{BlockchainError, Result};
pub use mining::{CancellationToken, Miner, MiningWorker};
pub use network::{GossipEngine, GossipMessage, MemoryTransport, PeerDirectory, Server, Transport};
pub use node::NodeState;
pub use rendezvous::{Registry, RendezvousServer};
pub use storage::{MemoryPool, SeenSet};
pub use utils::{current_timestamp, sha256_digest};
