//! Storage and derived chain state
//!
//! Shared sled handles for the chain store, and the UTXO index, which is not
//! persisted but recomputed from the block store whenever balances or
//! spendable outputs are needed.

pub mod db;
pub mod utxo_set;

pub use db::open_db;
pub use utxo_set::{UTXOSet, UnspentOutputs};
