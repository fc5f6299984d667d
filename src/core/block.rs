use crate::core::transaction::put_str;
use crate::core::Transaction;
use crate::error::{BlockchainError, Result};
use crate::utils::{current_timestamp, sha256_hex};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Previous-hash placeholder carried by the genesis block
pub const GENESIS_PREVIOUS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

/// 2025-01-01T00:00:00Z in milliseconds
pub const GENESIS_TIMESTAMP: i64 = 1_735_689_600_000;

const GENESIS_NONCE: u64 = 1;

/// The consensus anchor, identical on every node
static GENESIS: Lazy<Block> = Lazy::new(Block::build_genesis);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    index: u64,
    previous_hash: String,
    timestamp: i64,
    transactions: Vec<Transaction>,
    coinbase: Transaction,
    nonce: u64,
    hash: String,
}

impl Block {
    /// Build an unsealed candidate on top of `tip`
    ///
    /// The hash stays empty until a proof-of-work search seals the block.
    pub fn new_candidate(
        tip: &Block,
        transactions: Vec<Transaction>,
        coinbase: Transaction,
    ) -> Result<Block> {
        if !coinbase.is_coinbase() {
            return Err(BlockchainError::InvalidBlock(format!(
                "Coinbase {} is not issued by the coinbase sender",
                coinbase.get_id()
            )));
        }

        Ok(Block {
            index: tip.index + 1,
            previous_hash: tip.hash.clone(),
            timestamp: current_timestamp()?,
            transactions,
            coinbase,
            nonce: 0,
            hash: String::new(),
        })
    }

    /// A copy of the canonical genesis block
    pub fn genesis() -> Block {
        GENESIS.clone()
    }

    pub fn is_genesis(&self) -> bool {
        self == &*GENESIS
    }

    fn build_genesis() -> Block {
        let coinbase = Transaction::from_parts(
            "genesis-coinbase",
            crate::core::COINBASE_SENDER,
            "genesis",
            0,
            GENESIS_TIMESTAMP,
        );
        let mut block = Block {
            index: 0,
            previous_hash: GENESIS_PREVIOUS_HASH.to_string(),
            timestamp: GENESIS_TIMESTAMP,
            transactions: vec![],
            coinbase,
            nonce: GENESIS_NONCE,
            hash: String::new(),
        };
        block.hash = block.compute_hash();
        block
    }

    /// Everything the digest covers except the nonce
    pub(crate) fn header_bytes(&self) -> Vec<u8> {
        let mut data_bytes = vec![];
        data_bytes.extend(self.index.to_be_bytes());
        put_str(&mut data_bytes, &self.previous_hash);
        data_bytes.extend(self.timestamp.to_be_bytes());
        data_bytes.extend((self.transactions.len() as u32).to_be_bytes());
        for transaction in &self.transactions {
            transaction.write_digest_bytes(&mut data_bytes);
        }
        self.coinbase.write_digest_bytes(&mut data_bytes);
        data_bytes
    }

    /// Digest of `header` followed by `nonce`
    pub(crate) fn digest_with_nonce(header: &[u8], nonce: u64) -> String {
        let mut data_bytes = Vec::with_capacity(header.len() + 8);
        data_bytes.extend_from_slice(header);
        data_bytes.extend(nonce.to_be_bytes());
        sha256_hex(&data_bytes)
    }

    /// Recompute the digest over every field except `hash`
    pub fn compute_hash(&self) -> String {
        Self::digest_with_nonce(&self.header_bytes(), self.nonce)
    }

    pub(crate) fn seal(&mut self, nonce: u64, hash: String) {
        self.nonce = nonce;
        self.hash = hash;
    }

    pub fn get_index(&self) -> u64 {
        self.index
    }

    pub fn get_previous_hash(&self) -> &str {
        self.previous_hash.as_str()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_coinbase(&self) -> &Transaction {
        &self.coinbase
    }

    pub fn get_nonce(&self) -> u64 {
        self.nonce
    }

    pub fn get_hash(&self) -> &str {
        self.hash.as_str()
    }

    pub fn contains_transaction(&self, txid: &str) -> bool {
        self.transactions.iter().any(|tx| tx.get_id() == txid)
    }

    #[cfg(test)]
    pub(crate) fn set_nonce(&mut self, nonce: u64) {
        self.nonce = nonce;
    }

    #[cfg(test)]
    pub(crate) fn set_coinbase(&mut self, coinbase: Transaction) {
        self.coinbase = coinbase;
    }

    #[cfg(test)]
    pub(crate) fn set_hash(&mut self, hash: &str) {
        self.hash = hash.to_string();
    }
}
