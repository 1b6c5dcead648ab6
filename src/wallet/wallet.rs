use crate::error::{LedgerError, Result};
use crate::utils::{
    base58check_decode, base58check_encode, new_key_pair, public_key_from_pkcs8,
    ripemd160_digest, sha256_digest,
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const ADDRESS_VERSION: u8 = 0x00;
pub const PUB_KEY_HASH_LEN: usize = 20;

/// A P-256 private key (PKCS#8) with its `X || Y` public key.
#[derive(
    Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode, Zeroize,
    ZeroizeOnDrop,
)]
pub struct Wallet {
    pkcs8: Vec<u8>,
    public_key: Vec<u8>,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.get_address())
            .finish_non_exhaustive()
    }
}

impl Wallet {
    pub fn new() -> Result<Wallet> {
        let pkcs8 = new_key_pair()?;
        let public_key = public_key_from_pkcs8(pkcs8.as_slice())?;
        Ok(Wallet { pkcs8, public_key })
    }

    pub fn get_address(&self) -> String {
        convert_address(hash_pub_key(self.public_key.as_slice()).as_slice())
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn get_pkcs8(&self) -> &[u8] {
        self.pkcs8.as_slice()
    }
}

/// RIPEMD-160 of SHA-256 of the public key.
pub fn hash_pub_key(pub_key: &[u8]) -> Vec<u8> {
    let pub_key_sha256 = sha256_digest(pub_key);
    ripemd160_digest(pub_key_sha256.as_slice())
}

/// Address text for a public-key hash.
pub fn convert_address(pub_key_hash: &[u8]) -> String {
    base58check_encode(pub_key_hash, ADDRESS_VERSION)
}

/// Public-key hash carried by an address; fails with `Checksum` on corrupted text.
pub fn address_to_pub_key_hash(address: &str) -> Result<Vec<u8>> {
    let (version, pub_key_hash) = base58check_decode(address)?;
    if version != ADDRESS_VERSION {
        return Err(LedgerError::Checksum(format!(
            "Unsupported address version {version:#04x} in {address}"
        )));
    }
    if pub_key_hash.len() != PUB_KEY_HASH_LEN {
        return Err(LedgerError::Checksum(format!(
            "Address {address} does not carry a {PUB_KEY_HASH_LEN}-byte key hash"
        )));
    }
    Ok(pub_key_hash)
}

pub fn validate_address(address: &str) -> bool {
    address_to_pub_key_hash(address).is_ok()
}
