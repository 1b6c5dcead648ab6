//! Error handling for the ledger
//!
//! Store and decoding failures are fatal to the operation that hit them.
//! Errors caused by user input are raised before anything is written.

use std::fmt;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Error kinds raised across the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The chain store could not be opened, read or written
    StoreIo(String),
    /// An address failed base58-check decoding
    Checksum(String),
    /// A send asked for more than the sender's unspent outputs hold
    InsufficientFunds { required: u64, available: u64 },
    /// At least one input signature of a transaction did not verify
    SignatureVerification(String),
    /// Encoded bytes could not be produced or decoded
    Serialization(String),
    /// The key store file could not be loaded or persisted
    KeyStoreIo(String),
    /// Structurally invalid transaction
    InvalidTransaction(String),
    /// No key for this address in the key store
    WalletNotFound(String),
    /// Key generation, signing or clock failure
    Crypto(String),
    /// Configuration could not be read or is out of range
    Config(String),
    /// Command output could not be written
    Output(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerError::StoreIo(msg) => write!(f, "Store I/O error: {msg}"),
            LedgerError::Checksum(msg) => write!(f, "Checksum error: {msg}"),
            LedgerError::InsufficientFunds {
                required,
                available,
            } => {
                write!(
                    f,
                    "Insufficient funds: required {required}, available {available}"
                )
            }
            LedgerError::SignatureVerification(txid) => {
                write!(f, "Signature verification failed for transaction {txid}")
            }
            LedgerError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            LedgerError::KeyStoreIo(msg) => write!(f, "Key store I/O error: {msg}"),
            LedgerError::InvalidTransaction(msg) => write!(f, "Invalid transaction: {msg}"),
            LedgerError::WalletNotFound(addr) => write!(f, "No wallet found for address: {addr}"),
            LedgerError::Crypto(msg) => write!(f, "Cryptographic error: {msg}"),
            LedgerError::Config(msg) => write!(f, "Configuration error: {msg}"),
            LedgerError::Output(msg) => write!(f, "Output error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<sled::Error> for LedgerError {
    fn from(err: sled::Error) -> Self {
        LedgerError::StoreIo(err.to_string())
    }
}

impl From<sled::transaction::TransactionError<LedgerError>> for LedgerError {
    fn from(err: sled::transaction::TransactionError<LedgerError>) -> Self {
        match err {
            sled::transaction::TransactionError::Abort(inner) => inner,
            sled::transaction::TransactionError::Storage(e) => LedgerError::StoreIo(e.to_string()),
        }
    }
}

impl From<bincode::error::EncodeError> for LedgerError {
    fn from(err: bincode::error::EncodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<bincode::error::DecodeError> for LedgerError {
    fn from(err: bincode::error::DecodeError) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}
