// The append-only chain: blocks live in one sled tree keyed by their hash,
// and a reserved key in the same tree names the current tip.

use crate::config::Config;
use crate::core::block::GENESIS_COINBASE_DATA;
use crate::core::{Block, PrevTransactions, ProofOfWork, TXInput, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::{open_db, UTXOSet};
use crate::wallet::{address_to_pub_key_hash, Wallet};
use data_encoding::HEXLOWER;
use log::{info, warn};
use sled::transaction::{abort, ConflictableTransactionResult, TransactionalTree};
use sled::{Db, Tree};
use std::collections::HashSet;
use std::path::Path;

const TIP_BLOCK_HASH_KEY: &[u8] = b"l";
const BLOCKS_TREE: &str = "blocks";

pub struct Blockchain {
    tip_hash: Vec<u8>,
    db: Db,
    blocks: Tree,
    config: Config,
}

impl Blockchain {
    /// Opens the store and mines a genesis block paying `genesis_address`,
    /// unless a chain already exists there, in which case its tip is loaded.
    pub fn create_blockchain(genesis_address: &str, config: &Config) -> Result<Blockchain> {
        address_to_pub_key_hash(genesis_address)?;
        let (db, blocks) = Self::open_store(&config.db_path)?;

        let tip_hash = match blocks.get(TIP_BLOCK_HASH_KEY)? {
            Some(tip) => {
                info!(
                    "Chain already exists at {}, keeping tip {}",
                    config.db_path.display(),
                    HEXLOWER.encode(tip.as_ref())
                );
                tip.to_vec()
            }
            None => {
                info!("Creating genesis block for address: {genesis_address}");
                let coinbase_tx = Transaction::new_coinbase_tx(
                    genesis_address,
                    config.subsidy,
                    Some(GENESIS_COINBASE_DATA),
                )?;
                let genesis = Block::generate_genesis_block(&coinbase_tx, config.target_bits)?;
                Self::append_block(&db, &blocks, &genesis, None)?;
                genesis.get_hash().to_vec()
            }
        };

        Ok(Blockchain {
            tip_hash,
            db,
            blocks,
            config: config.clone(),
        })
    }

    /// Opens an existing chain; fails when the store holds none.
    pub fn open(config: &Config) -> Result<Blockchain> {
        let (db, blocks) = Self::open_store(&config.db_path)?;
        let tip_hash = blocks
            .get(TIP_BLOCK_HASH_KEY)?
            .ok_or_else(|| {
                LedgerError::StoreIo(format!(
                    "No existing blockchain found at {}. Create one first.",
                    config.db_path.display()
                ))
            })?
            .to_vec();

        Ok(Blockchain {
            tip_hash,
            db,
            blocks,
            config: config.clone(),
        })
    }

    fn open_store(path: &Path) -> Result<(Db, Tree)> {
        let db = open_db(path)?;
        let blocks = db
            .open_tree(BLOCKS_TREE)
            .map_err(|e| LedgerError::StoreIo(format!("Failed to open blocks tree: {e}")))?;
        Ok((db, blocks))
    }

    // Block write and tip move commit together, and only if the tip is still
    // the one the block was mined on.
    fn append_block(db: &Db, blocks: &Tree, block: &Block, expected_tip: Option<&[u8]>) -> Result<()> {
        let block_hash = block.get_hash();
        let block_data = block.serialize()?;

        blocks.transaction(
            |tx_db: &TransactionalTree| -> ConflictableTransactionResult<(), LedgerError> {
                let current_tip = tx_db.get(TIP_BLOCK_HASH_KEY)?;
                if current_tip.as_deref() != expected_tip {
                    return abort(LedgerError::StoreIo(
                        "Chain tip changed while the block was being mined".to_string(),
                    ));
                }
                tx_db.insert(block_hash, block_data.as_slice())?;
                tx_db.insert(TIP_BLOCK_HASH_KEY, block_hash)?;
                Ok(())
            },
        )?;
        db.flush()?;
        Ok(())
    }

    pub fn get_tip_hash(&self) -> &[u8] {
        self.tip_hash.as_slice()
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    /// Validates `transactions`, mines a block over them on the current tip and appends it.
    pub fn add_block(&mut self, transactions: &[Transaction]) -> Result<Block> {
        self.validate_transactions(transactions)?;

        let tip_hash = self
            .blocks
            .get(TIP_BLOCK_HASH_KEY)?
            .ok_or_else(|| LedgerError::StoreIo("Tip hash not found".to_string()))?
            .to_vec();

        let block = Block::new_block(transactions, tip_hash.clone(), self.config.target_bits)?;
        Self::append_block(&self.db, &self.blocks, &block, Some(tip_hash.as_slice()))?;
        self.tip_hash = block.get_hash().to_vec();

        info!(
            "Appended block {} with {} transactions",
            HEXLOWER.encode(block.get_hash()),
            block.get_transactions().len()
        );
        Ok(block)
    }

    // Unique ids, signatures, ownership, unspent inputs, no double spend
    // within the batch, and no value created out of thin air.
    fn validate_transactions(&self, transactions: &[Transaction]) -> Result<()> {
        let mut known_ids = self.transaction_ids()?;
        for transaction in transactions {
            if !known_ids.insert(transaction.get_id().to_vec()) {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {} already exists",
                    HEXLOWER.encode(transaction.get_id())
                )));
            }
        }

        if transactions.iter().all(Transaction::is_coinbase) {
            return Ok(());
        }

        let utxo_set = UTXOSet::new(self);
        let unspent = utxo_set.find_all_utxo()?;
        let mut spent_in_block: HashSet<(String, usize)> = HashSet::new();

        for transaction in transactions.iter().filter(|tx| !tx.is_coinbase()) {
            let txid_hex = HEXLOWER.encode(transaction.get_id());
            let prev_txs = utxo_set.find_prev_transactions(transaction)?;
            if !transaction.verify(&prev_txs) {
                return Err(LedgerError::SignatureVerification(txid_hex));
            }

            let mut input_value = 0u64;
            for vin in transaction.get_vin() {
                let (prev_txid, idx) = outpoint(vin)?;
                let still_unspent = unspent
                    .get(&prev_txid)
                    .is_some_and(|outs| outs.iter().any(|(i, _)| *i == idx));
                if !still_unspent {
                    return Err(LedgerError::InvalidTransaction(format!(
                        "Input {prev_txid}:{idx} of {txid_hex} is already spent"
                    )));
                }
                if !spent_in_block.insert((prev_txid.clone(), idx)) {
                    return Err(LedgerError::InvalidTransaction(format!(
                        "Input {prev_txid}:{idx} is spent twice in one block"
                    )));
                }
                input_value = input_value
                    .checked_add(referenced_value(&prev_txs, &prev_txid, idx)?)
                    .ok_or_else(|| {
                        LedgerError::InvalidTransaction("Input value overflow".to_string())
                    })?;
            }

            let output_value = transaction.get_output_value()?;
            if output_value > input_value {
                return Err(LedgerError::InvalidTransaction(format!(
                    "Transaction {txid_hex} spends {output_value} but only has {input_value}"
                )));
            }
        }
        Ok(())
    }

    /// Walks from the tip back to genesis, inclusive.
    pub fn iterator(&self) -> BlockchainIterator {
        BlockchainIterator::new(self.tip_hash.clone(), self.blocks.clone())
    }

    pub fn get_block(&self, block_hash: &[u8]) -> Result<Option<Block>> {
        match self.blocks.get(block_hash)? {
            Some(bytes) => Ok(Some(Block::deserialize(bytes.as_ref())?)),
            None => Ok(None),
        }
    }

    /// Hashes of every block from tip to genesis.
    pub fn get_block_hashes(&self) -> Result<Vec<Vec<u8>>> {
        self.iterator()
            .map(|block| block.map(|b| b.get_hash().to_vec()))
            .collect()
    }

    pub fn find_transaction(&self, txid: &[u8]) -> Result<Option<Transaction>> {
        for block in self.iterator() {
            let block = block?;
            if let Some(tx) = block
                .get_transactions()
                .iter()
                .find(|tx| tx.get_id() == txid)
            {
                return Ok(Some(tx.clone()));
            }
        }
        Ok(None)
    }

    fn transaction_ids(&self) -> Result<HashSet<Vec<u8>>> {
        let mut ids = HashSet::new();
        for block in self.iterator() {
            for tx in block?.get_transactions() {
                ids.insert(tx.get_id().to_vec());
            }
        }
        Ok(ids)
    }

    pub fn sign_transaction(&self, tx: &mut Transaction, wallet: &Wallet) -> Result<()> {
        let prev_txs = UTXOSet::new(self).find_prev_transactions(tx)?;
        tx.sign(wallet, &prev_txs)
    }

    pub fn verify_transaction(&self, tx: &Transaction) -> Result<bool> {
        if tx.is_coinbase() {
            return Ok(true);
        }
        let prev_txs = UTXOSet::new(self).find_prev_transactions(tx)?;
        Ok(tx.verify(&prev_txs))
    }

    /// Every block links to the one before it, hashes to its recorded hash,
    /// and still meets the target.
    pub fn validate_chain(&self) -> Result<bool> {
        let mut expected_hash = self.tip_hash.clone();
        for block in self.iterator() {
            let block = block?;
            if block.get_hash() != expected_hash.as_slice() {
                warn!(
                    "Block {} is stored under {}",
                    HEXLOWER.encode(block.get_hash()),
                    HEXLOWER.encode(expected_hash.as_slice())
                );
                return Ok(false);
            }
            let recomputed = ProofOfWork::recompute_hash(&block, self.config.target_bits);
            if recomputed.as_slice() != block.get_hash() {
                warn!(
                    "Block {} contents hash to {}",
                    HEXLOWER.encode(block.get_hash()),
                    HEXLOWER.encode(recomputed.as_slice())
                );
                return Ok(false);
            }
            if !ProofOfWork::validate(&block, self.config.target_bits) {
                warn!(
                    "Block {} fails proof-of-work",
                    HEXLOWER.encode(block.get_hash())
                );
                return Ok(false);
            }
            expected_hash = block.get_prev_hash().to_vec();
        }
        Ok(expected_hash.is_empty())
    }
}

fn outpoint(vin: &TXInput) -> Result<(String, usize)> {
    let idx = vin.vout_index().ok_or_else(|| {
        LedgerError::InvalidTransaction(format!("Negative output index {}", vin.get_vout()))
    })?;
    Ok((HEXLOWER.encode(vin.get_txid()), idx))
}

fn referenced_value(prev_txs: &PrevTransactions, txid_hex: &str, idx: usize) -> Result<u64> {
    prev_txs
        .get(txid_hex)
        .and_then(|tx| tx.get_vout().get(idx))
        .map(|out| out.get_value())
        .ok_or_else(|| {
            LedgerError::InvalidTransaction(format!("Output {txid_hex}:{idx} does not exist"))
        })
}

/// Lazy tip-to-genesis walk over the store. One-shot: create a new one to restart.
///
/// A block that is missing or fails to decode is yielded as an error, after
/// which the iterator is exhausted.
pub struct BlockchainIterator {
    blocks: Tree,
    current_hash: Option<Vec<u8>>,
}

impl BlockchainIterator {
    fn new(tip_hash: Vec<u8>, blocks: Tree) -> BlockchainIterator {
        BlockchainIterator {
            blocks,
            current_hash: Some(tip_hash),
        }
    }

    fn load(&self, hash: &[u8]) -> Result<Block> {
        let data = self.blocks.get(hash)?.ok_or_else(|| {
            LedgerError::StoreIo(format!(
                "Block {} is missing from the store",
                HEXLOWER.encode(hash)
            ))
        })?;
        Block::deserialize(data.as_ref())
    }
}

impl Iterator for BlockchainIterator {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        let current_hash = self.current_hash.take()?;
        let block = match self.load(&current_hash) {
            Ok(block) => block,
            Err(e) => return Some(Err(e)),
        };
        if !block.is_genesis() {
            self.current_hash = Some(block.get_prev_hash().to_vec());
        }
        Some(Ok(block))
    }
}
