//! # UTXO Ledger
//!
//! A single-node proof-of-work ledger: value lives in unspent transaction
//! outputs, every spend is signed with ECDSA P-256, and blocks are stored in
//! a sled database linked from the newest tip back to genesis.
//!
//! ## Layout
//! - `core/`: blocks, transactions, proof-of-work and the chain store
//! - `storage/`: the UTXO index derived from the chain
//! - `wallet/`: key pairs, addresses and the file-backed key store
//! - `config/`: store locations, difficulty and subsidy
//! - `utils/`: hashing, signing, base58 and bincode helpers
//! - `cli/`: argument parsing and command handlers
//!
//! Start with `cli/handlers.rs` to see how the pieces are wired together,
//! then `core/blockchain.rs` for how blocks are validated and appended.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    Block, Blockchain, BlockchainIterator, ProofOfWork, TXInput, TXOutput, Transaction,
};
pub use error::{LedgerError, Result};
pub use storage::UTXOSet;
pub use utils::{
    base58_decode, base58_encode, current_timestamp, ecdsa_p256_sha256_sign_digest,
    ecdsa_p256_sha256_sign_verify, new_key_pair, ripemd160_digest, sha256_digest,
};
pub use wallet::{
    address_to_pub_key_hash, convert_address, hash_pub_key, validate_address, KeyStore, Wallet,
};
