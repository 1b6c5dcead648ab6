use crate::config::Config;
use crate::core::{Block, Blockchain, ProofOfWork, Transaction};
use crate::error::{LedgerError, Result};
use crate::storage::UTXOSet;
use crate::wallet::{address_to_pub_key_hash, convert_address, hash_pub_key, KeyStore};
use data_encoding::HEXLOWER;
use log::info;
use std::io::Write;

/// Creates the chain with the genesis reward paid to `address`.
pub fn create_chain(config: &Config, address: &str) -> Result<Blockchain> {
    let blockchain = Blockchain::create_blockchain(address, config)?;
    info!(
        "Blockchain ready, tip {}",
        HEXLOWER.encode(blockchain.get_tip_hash())
    );
    Ok(blockchain)
}

pub fn new_wallet(config: &Config) -> Result<String> {
    KeyStore::load(config)?.create_wallet()
}

pub fn list_addresses(config: &Config) -> Result<Vec<String>> {
    Ok(KeyStore::load(config)?.get_addresses())
}

pub fn get_balance(config: &Config, address: &str) -> Result<u64> {
    address_to_pub_key_hash(address)?;
    let blockchain = Blockchain::open(config)?;
    UTXOSet::new(&blockchain).get_balance(address)
}

/// Signs a transfer with the sender's stored key and mines it into a new block.
pub fn send(config: &Config, from: &str, to: &str, amount: u64) -> Result<Block> {
    address_to_pub_key_hash(from)?;
    address_to_pub_key_hash(to)?;

    let key_store = KeyStore::load(config)?;
    let wallet = key_store
        .get_wallet(from)
        .ok_or_else(|| LedgerError::WalletNotFound(from.to_string()))?;

    let mut blockchain = Blockchain::open(config)?;
    let transaction =
        Transaction::new_utxo_transaction(wallet, to, amount, &UTXOSet::new(&blockchain))?;
    let block = blockchain.add_block(&[transaction])?;
    info!("Sent {amount} from {from} to {to}");
    Ok(block)
}

/// Writes every block from tip to genesis with its transactions.
pub fn print_chain(config: &Config, out: &mut impl Write) -> Result<()> {
    let blockchain = Blockchain::open(config)?;
    let target_bits = blockchain.get_config().target_bits;

    for block in blockchain.iterator() {
        let block = block?;
        let mut text = String::new();
        text.push_str(&format!(
            "Prev block hash: {}\n",
            HEXLOWER.encode(block.get_prev_hash())
        ));
        text.push_str(&format!(
            "Cur block hash: {}\n",
            HEXLOWER.encode(block.get_hash())
        ));
        text.push_str(&format!("Timestamp: {}\n", block.get_timestamp()));
        text.push_str(&format!(
            "PoW: {}\n",
            ProofOfWork::validate(&block, target_bits)
        ));

        for tx in block.get_transactions() {
            text.push_str(&format!("- Transaction {}\n", HEXLOWER.encode(tx.get_id())));
            if !tx.is_coinbase() {
                for input in tx.get_vin() {
                    let address = convert_address(&hash_pub_key(input.get_pub_key()));
                    text.push_str(&format!(
                        "-- Input txid = {}, vout = {}, from = {address}\n",
                        HEXLOWER.encode(input.get_txid()),
                        input.get_vout(),
                    ));
                }
            }
            for output in tx.get_vout() {
                text.push_str(&format!(
                    "-- Output value = {}, to = {}\n",
                    output.get_value(),
                    convert_address(output.get_pub_key_hash())
                ));
            }
        }
        text.push('\n');

        out.write_all(text.as_bytes())
            .map_err(|e| LedgerError::Output(format!("Failed to write chain: {e}")))?;
    }
    Ok(())
}
