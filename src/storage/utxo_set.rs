use crate::core::{Blockchain, PrevTransactions, TXOutput, Transaction};
use crate::error::{LedgerError, Result};
use crate::wallet::address_to_pub_key_hash;
use data_encoding::HEXLOWER;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Unspent outputs of one transaction, as `(output index, output)` pairs.
pub type UnspentOutputs = Vec<(usize, TXOutput)>;

/// Unspent outputs derived by replaying the chain on every query.
pub struct UTXOSet<'a> {
    blockchain: &'a Blockchain,
}

impl<'a> UTXOSet<'a> {
    pub fn new(blockchain: &'a Blockchain) -> UTXOSet<'a> {
        UTXOSet { blockchain }
    }

    pub fn get_blockchain(&self) -> &Blockchain {
        self.blockchain
    }

    /// Every unspent output in the chain, keyed by hex txid.
    ///
    /// An output is spent when any input anywhere in the chain names its
    /// `(txid, index)`, regardless of which block that input sits in.
    pub fn find_all_utxo(&self) -> Result<HashMap<String, UnspentOutputs>> {
        let mut spent_txos: HashSet<(Vec<u8>, usize)> = HashSet::new();
        let mut transactions: Vec<Transaction> = vec![];

        for block in self.blockchain.iterator() {
            let block = block?;
            for tx in block.get_transactions() {
                if !tx.is_coinbase() {
                    for txin in tx.get_vin() {
                        if let Some(idx) = txin.vout_index() {
                            spent_txos.insert((txin.get_txid().to_vec(), idx));
                        }
                    }
                }
                transactions.push(tx.clone());
            }
        }

        let mut utxo: HashMap<String, UnspentOutputs> = HashMap::new();
        for tx in transactions {
            for (idx, out) in tx.get_vout().iter().enumerate() {
                if spent_txos.contains(&(tx.get_id().to_vec(), idx)) {
                    continue;
                }
                utxo.entry(HEXLOWER.encode(tx.get_id()))
                    .or_default()
                    .push((idx, out.clone()));
            }
        }
        Ok(utxo)
    }

    /// Unspent outputs locked to `pub_key_hash`.
    pub fn find_utxo(&self, pub_key_hash: &[u8]) -> Result<Vec<TXOutput>> {
        let mut utxos = vec![];
        for outs in self.find_all_utxo()?.into_values() {
            for (_, out) in outs {
                if out.is_locked_with_key(pub_key_hash) {
                    utxos.push(out);
                }
            }
        }
        Ok(utxos)
    }

    /// Collects outputs of `pub_key_hash` until `amount` is covered.
    ///
    /// Returns the accumulated value and the chosen output indices per hex
    /// txid; the total falls short of `amount` when funds are insufficient.
    pub fn find_spendable_outputs(
        &self,
        pub_key_hash: &[u8],
        amount: u64,
    ) -> Result<(u64, BTreeMap<String, Vec<usize>>)> {
        let mut unspent_outputs: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut accumulated = 0u64;

        let utxo: BTreeMap<String, UnspentOutputs> = self.find_all_utxo()?.into_iter().collect();
        'collect: for (txid_hex, outs) in utxo {
            for (idx, out) in outs {
                if accumulated >= amount {
                    break 'collect;
                }
                if out.is_locked_with_key(pub_key_hash) {
                    accumulated = accumulated.saturating_add(out.get_value());
                    unspent_outputs.entry(txid_hex.clone()).or_default().push(idx);
                }
            }
        }
        Ok((accumulated, unspent_outputs))
    }

    /// Sum of unspent output values owned by `address`.
    pub fn get_balance(&self, address: &str) -> Result<u64> {
        let pub_key_hash = address_to_pub_key_hash(address)?;
        Ok(self
            .find_utxo(pub_key_hash.as_slice())?
            .iter()
            .map(TXOutput::get_value)
            .sum())
    }

    /// Number of transactions that still have at least one unspent output.
    pub fn count_transactions(&self) -> Result<usize> {
        Ok(self.find_all_utxo()?.len())
    }

    /// The transactions `tx`'s inputs reference, keyed by hex txid.
    pub fn find_prev_transactions(&self, tx: &Transaction) -> Result<PrevTransactions> {
        let mut prev_txs = PrevTransactions::new();
        if tx.is_coinbase() {
            return Ok(prev_txs);
        }

        for vin in tx.get_vin() {
            let txid_hex = HEXLOWER.encode(vin.get_txid());
            if prev_txs.contains_key(&txid_hex) {
                continue;
            }
            let prev_tx = self
                .blockchain
                .find_transaction(vin.get_txid())?
                .ok_or_else(|| {
                    LedgerError::InvalidTransaction(format!(
                        "Referenced transaction not found: {txid_hex}"
                    ))
                })?;
            prev_txs.insert(txid_hex, prev_tx);
        }
        Ok(prev_txs)
    }
}
