use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use serde::{Deserialize, Serialize};

/// Largest payload a single UDP datagram can carry over IPv4
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Inbound hop counters are clamped to this before forwarding
pub const MAX_GOSSIP_TTL: u32 = 16;

/// Every message a node or the rendezvous service exchanges
///
/// Each datagram is one JSON object whose `type` field selects the variant.
/// Anything that does not parse into one of these shapes is a protocol error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GossipMessage {
    Heartbeat {
        origin: String,
    },
    Peers {
        peers: Vec<String>,
    },
    Tx {
        id: String,
        sender: String,
        recipient: String,
        amount: u64,
        timestamp: i64,
        ttl: u32,
    },
    Block {
        block: Block,
        ttl: u32,
    },
    ReqChain,
    FullChain {
        chain: Vec<Block>,
    },
}

impl GossipMessage {
    pub fn tx(tx: &Transaction, ttl: u32) -> GossipMessage {
        GossipMessage::Tx {
            id: tx.get_id().to_string(),
            sender: tx.get_sender().to_string(),
            recipient: tx.get_recipient().to_string(),
            amount: tx.get_amount(),
            timestamp: tx.get_timestamp(),
            ttl,
        }
    }

    pub fn block(block: Block, ttl: u32) -> GossipMessage {
        GossipMessage::Block { block, ttl }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GossipMessage::Heartbeat { .. } => "HEARTBEAT",
            GossipMessage::Peers { .. } => "PEERS",
            GossipMessage::Tx { .. } => "TX",
            GossipMessage::Block { .. } => "BLOCK",
            GossipMessage::ReqChain => "REQ_CHAIN",
            GossipMessage::FullChain { .. } => "FULL_CHAIN",
        }
    }

    /// Hop counter for the gossiped kinds
    pub fn ttl(&self) -> Option<u32> {
        match self {
            GossipMessage::Tx { ttl, .. } | GossipMessage::Block { ttl, .. } => Some(*ttl),
            _ => None,
        }
    }

    /// Serialize to one datagram payload
    ///
    /// Payloads that would not fit in a single datagram are refused; there
    /// is no fragmentation.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = serde_json::to_vec(self)?;
        if payload.len() > MAX_DATAGRAM_SIZE {
            return Err(BlockchainError::Network(format!(
                "{} message of {} bytes exceeds the {MAX_DATAGRAM_SIZE} byte datagram limit",
                self.kind(),
                payload.len()
            )));
        }
        Ok(payload)
    }

    pub fn decode(payload: &[u8]) -> Result<GossipMessage> {
        serde_json::from_slice(payload)
            .map_err(|e| BlockchainError::Protocol(format!("Undecodable datagram: {e}")))
    }
}
