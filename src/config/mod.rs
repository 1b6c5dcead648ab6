//! Configuration management
//!
//! Store locations, mining difficulty and the coinbase subsidy. A `Config`
//! is built once by the binary and passed to every component that needs it.

pub mod settings;

pub use settings::{
    Config, DEFAULT_DB_PATH, DEFAULT_SUBSIDY, DEFAULT_TARGET_BITS, DEFAULT_WALLET_FILE,
};
