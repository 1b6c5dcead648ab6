//! Wallets and the key store
//!
//! Key generation, address derivation and the file-backed mapping from
//! address to key material.

#[allow(clippy::module_inception)]
pub mod wallet;
pub mod key_store;

pub use key_store::KeyStore;
pub use wallet::{
    address_to_pub_key_hash, convert_address, hash_pub_key, validate_address, Wallet,
    ADDRESS_VERSION, PUB_KEY_HASH_LEN,
};
