//! Core ledger functionality
//!
//! Blocks, transactions, the persistent chain and the proof-of-work that
//! seals each block.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use block::{Block, GENESIS_COINBASE_DATA};
pub use blockchain::{Blockchain, BlockchainIterator};
pub use proof_of_work::ProofOfWork;
pub use transaction::{
    signing_digest, PrevTransactions, TXInput, TXOutput, Transaction, COINBASE_VOUT,
};
