//! Test utilities for ledger testing

use crate::config::Config;
use crate::core::{Blockchain, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::UTXOSet;
use crate::wallet::{KeyStore, Wallet};
use std::path::Path;
use tempfile::TempDir;

/// Difficulty used by tests; a block is found within a few hundred hashes.
pub const TEST_TARGET_BITS: u32 = 8;
pub const TEST_SUBSIDY: u64 = 10;

/// Create a temporary directory for testing
pub fn create_temp_dir() -> Result<TempDir> {
    tempfile::tempdir().map_err(|e| LedgerError::StoreIo(e.to_string()))
}

/// Config with its store and key file inside `dir` and the test difficulty.
pub fn create_test_config(dir: &Path) -> Config {
    Config {
        target_bits: TEST_TARGET_BITS,
        subsidy: TEST_SUBSIDY,
        ..Config::with_base_dir(dir)
    }
}

/// A fresh chain whose genesis reward goes to the returned wallet.
///
/// Keep the `TempDir` alive for as long as the chain is used.
pub fn create_test_blockchain() -> Result<(Blockchain, TempDir, Wallet)> {
    let temp_dir = create_temp_dir()?;
    let config = create_test_config(temp_dir.path());
    let miner = Wallet::new()?;
    let blockchain = Blockchain::create_blockchain(&miner.get_address(), &config)?;
    Ok((blockchain, temp_dir, miner))
}

/// A key store inside `dir` holding `count` fresh wallets.
pub fn create_test_key_store(dir: &Path, count: usize) -> Result<(KeyStore, Vec<String>)> {
    let mut key_store = KeyStore::load(&create_test_config(dir))?;
    let mut addresses = Vec::with_capacity(count);
    for _ in 0..count {
        addresses.push(key_store.create_wallet()?);
    }
    Ok((key_store, addresses))
}

/// Build, sign and mine a transfer in one step.
pub fn send_and_mine(
    blockchain: &mut Blockchain,
    from: &Wallet,
    to: &str,
    amount: u64,
) -> Result<Transaction> {
    let tx = Transaction::new_utxo_transaction(from, to, amount, &UTXOSet::new(blockchain))?;
    blockchain.add_block(std::slice::from_ref(&tx))?;
    Ok(tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_blockchain() {
        let (blockchain, _dir, miner) = create_test_blockchain().unwrap();
        assert_eq!(blockchain.get_config().target_bits, TEST_TARGET_BITS);
        assert_eq!(
            UTXOSet::new(&blockchain)
                .get_balance(&miner.get_address())
                .unwrap(),
            TEST_SUBSIDY
        );
    }

    #[test]
    fn test_create_test_key_store() {
        let dir = create_temp_dir().unwrap();
        let (key_store, addresses) = create_test_key_store(dir.path(), 3).unwrap();
        assert_eq!(key_store.len(), 3);
        for address in &addresses {
            assert!(key_store.get_wallet(address).is_some());
        }
    }

    #[test]
    fn test_send_and_mine() {
        let (mut blockchain, _dir, miner) = create_test_blockchain().unwrap();
        let recipient = Wallet::new().unwrap().get_address();

        send_and_mine(&mut blockchain, &miner, &recipient, 7).unwrap();

        let utxo_set = UTXOSet::new(&blockchain);
        assert_eq!(utxo_set.get_balance(&recipient).unwrap(), 7);
        assert_eq!(
            utxo_set.get_balance(&miner.get_address()).unwrap(),
            TEST_SUBSIDY - 7
        );
    }
}
