// Transactions are plain value transfers. There are no signatures and no
// balances: a transaction is accepted into a block on inclusion alone.
// The id is generated once at creation and never recomputed from content.

use crate::core::BLOCK_REWARD;
use crate::error::{BlockchainError, Result};
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved sender name carried by coinbase transactions
pub const COINBASE_SENDER: &str = "COINBASE";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    id: String,        // Stable identifier, content independent
    sender: String,    // Display identity of the payer
    recipient: String, // Display identity of the payee
    amount: u64,       // Base units
    timestamp: i64,    // Creation time in milliseconds
}

impl Transaction {
    // When a client or the console creates a brand new transfer
    pub fn new(sender: &str, recipient: &str, amount: u64) -> Result<Transaction> {
        let tx = Transaction {
            id: Uuid::new_v4().simple().to_string(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            timestamp: current_timestamp()?,
        };
        tx.validate_shape()?;
        Ok(tx)
    }

    // Rebuild a transaction from already known fields (wire input, fixtures)
    pub fn from_parts(
        id: &str,
        sender: &str,
        recipient: &str,
        amount: u64,
        timestamp: i64,
    ) -> Transaction {
        Transaction {
            id: id.to_string(),
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            amount,
            timestamp,
        }
    }

    // The reward a miner pays itself in the block at `index`
    pub fn new_coinbase(recipient: &str, index: u64) -> Result<Transaction> {
        if recipient.is_empty() {
            return Err(BlockchainError::InvalidTransaction(
                "Coinbase recipient must not be empty".to_string(),
            ));
        }

        Ok(Transaction {
            id: format!("coinbase-{index}"),
            sender: COINBASE_SENDER.to_string(),
            recipient: recipient.to_string(),
            amount: BLOCK_REWARD,
            timestamp: current_timestamp()?,
        })
    }

    pub fn get_id(&self) -> &str {
        self.id.as_str()
    }

    pub fn get_sender(&self) -> &str {
        self.sender.as_str()
    }

    pub fn get_recipient(&self) -> &str {
        self.recipient.as_str()
    }

    pub fn get_amount(&self) -> u64 {
        self.amount
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }

    /// Shape check applied before a transaction may enter the mempool
    pub fn validate_shape(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(BlockchainError::InvalidTransaction(
                "Transaction id must not be empty".to_string(),
            ));
        }
        if self.sender.trim().is_empty() || self.recipient.trim().is_empty() {
            return Err(BlockchainError::InvalidTransaction(format!(
                "Transaction {} must name both sender and recipient",
                self.id
            )));
        }
        if self.amount == 0 {
            return Err(BlockchainError::InvalidTransaction(format!(
                "Transaction {} must carry a positive amount",
                self.id
            )));
        }
        if self.is_coinbase() {
            return Err(BlockchainError::InvalidTransaction(format!(
                "Transaction {} uses the reserved coinbase sender",
                self.id
            )));
        }
        Ok(())
    }

    /// Append the canonical digest encoding of this transaction
    pub(crate) fn write_digest_bytes(&self, data_bytes: &mut Vec<u8>) {
        put_str(data_bytes, &self.id);
        put_str(data_bytes, &self.sender);
        put_str(data_bytes, &self.recipient);
        data_bytes.extend(self.amount.to_be_bytes());
        data_bytes.extend(self.timestamp.to_be_bytes());
    }
}

/// Length-prefixed string so adjacent fields can never run together
pub(crate) fn put_str(data_bytes: &mut Vec<u8>, value: &str) {
    data_bytes.extend((value.len() as u32).to_be_bytes());
    data_bytes.extend(value.as_bytes());
}
