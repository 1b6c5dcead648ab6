use crate::core::{ProofOfWork, Transaction};
use crate::error::{LedgerError, Result};
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};

/// Coinbase payload of the genesis block.
pub const GENESIS_COINBASE_DATA: &str =
    "The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Block {
    prev_hash: Vec<u8>,
    hash: Vec<u8>,
    timestamp: i64,
    transactions: Vec<Transaction>,
    nonce: i64,
}

impl Block {
    /// Builds a block on `prev_hash` and mines it before returning.
    pub fn new_block(
        transactions: &[Transaction],
        prev_hash: Vec<u8>,
        target_bits: u32,
    ) -> Result<Block> {
        if transactions.is_empty() {
            return Err(LedgerError::InvalidTransaction(
                "Block must contain at least one transaction".to_string(),
            ));
        }

        let mut block = Block {
            prev_hash,
            hash: vec![],
            timestamp: current_timestamp()?,
            transactions: transactions.to_vec(),
            nonce: 0,
        };

        let (nonce, hash) = ProofOfWork::new_proof_of_work(&block, target_bits).run();
        block.nonce = nonce;
        block.hash = hash;
        info!(
            "Proof-of-work completed for block {} (nonce {nonce})",
            HEXLOWER.encode(block.hash.as_slice())
        );

        Ok(block)
    }

    /// Genesis block carrying only `coinbase`, with an empty previous hash.
    pub fn generate_genesis_block(coinbase: &Transaction, target_bits: u32) -> Result<Block> {
        Block::new_block(std::slice::from_ref(coinbase), vec![], target_bits)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize::<Block>(bytes)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_prev_hash(&self) -> &[u8] {
        self.prev_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    /// SHA-256 over the concatenated transaction ids, in block order.
    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut txhashs = vec![];
        for transaction in &self.transactions {
            txhashs.extend(transaction.get_id());
        }

        sha256_digest(txhashs.as_slice())
    }
}
