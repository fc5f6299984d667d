//! Error handling for the node
//!
//! One error type covers every failure the engine can observe. Steady-state
//! loops log these and keep going; only startup failures end the process.

use std::fmt;

/// Result type alias for node operations
pub type Result<T> = std::result::Result<T, BlockchainError>;

/// Error kinds surfaced by the gossip and consensus engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockchainError {
    /// Malformed or undecodable datagram
    Protocol(String),
    /// Block failed linkage, digest, proof-of-work or reward checks
    InvalidBlock(String),
    /// Candidate chain failed validation as a whole
    InvalidChain(String),
    /// Transaction failed shape validation
    InvalidTransaction(String),
    /// Send/receive failure
    Network(String),
    /// Competing valid chain of equal length; the incumbent is kept
    ConsensusConflict { length: usize },
    /// Configuration errors
    Config(String),
    /// Serialization/deserialization errors
    Serialization(String),
    /// File I/O errors
    Io(String),
    /// Shared node state could not be accessed
    State(String),
}

impl BlockchainError {
    /// True for the validation family (block, chain, transaction)
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BlockchainError::InvalidBlock(_)
                | BlockchainError::InvalidChain(_)
                | BlockchainError::InvalidTransaction(_)
        )
    }
}

impl fmt::Display for BlockchainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockchainError::Protocol(msg) => write!(f, "Protocol error: {msg}"),
            BlockchainError::InvalidBlock(msg) => write!(f, "Invalid block: {msg}"),
            BlockchainError::InvalidChain(msg) => write!(f, "Invalid chain: {msg}"),
            BlockchainError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            BlockchainError::Network(msg) => write!(f, "Network error: {msg}"),
            BlockchainError::ConsensusConflict { length } => write!(
                f,
                "Consensus conflict: competing chain has the same length ({length}), keeping local chain"
            ),
            BlockchainError::Config(msg) => write!(f, "Configuration error: {msg}"),
            BlockchainError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            BlockchainError::Io(msg) => write!(f, "I/O error: {msg}"),
            BlockchainError::State(msg) => write!(f, "Node state error: {msg}"),
        }
    }
}

impl std::error::Error for BlockchainError {}

impl From<std::io::Error> for BlockchainError {
    fn from(err: std::io::Error) -> Self {
        BlockchainError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for BlockchainError {
    fn from(err: serde_json::Error) -> Self {
        BlockchainError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for BlockchainError {
    fn from(err: toml::de::Error) -> Self {
        BlockchainError::Config(err.to_string())
    }
}
