//! Utility functions and helpers
//!
//! Hashing, key handling, base58-check encoding and the bincode
//! serialization layer used throughout the ledger.

pub mod crypto;
pub mod serialization;

pub use crypto::{
    base58_decode, base58_encode, base58check_decode, base58check_encode, current_timestamp,
    ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, new_key_pair,
    public_key_from_pkcs8, ripemd160_digest, sha256_digest, CHECKSUM_LEN, PUBLIC_KEY_LEN,
    SIGNATURE_LEN,
};

pub use serialization::{deserialize, serialize};
