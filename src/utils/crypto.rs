use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, ECDSA_P256_SHA256_FIXED, ECDSA_P256_SHA256_FIXED_SIGNING,
};
use ripemd::{Digest as RipemdDigest, Ripemd160};

use crate::error::{LedgerError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Byte width of one P-256 coordinate or signature scalar.
pub const P256_FIELD_LEN: usize = 32;
/// `X || Y` public key length.
pub const PUBLIC_KEY_LEN: usize = 2 * P256_FIELD_LEN;
/// `r || s` signature length.
pub const SIGNATURE_LEN: usize = 2 * P256_FIELD_LEN;
/// Number of checksum bytes appended by base58-check.
pub const CHECKSUM_LEN: usize = 4;

const SEC1_UNCOMPRESSED_TAG: u8 = 0x04;

/// Current time in whole seconds since the unix epoch.
pub fn current_timestamp() -> Result<i64> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| LedgerError::Crypto(format!("System time error: {e}")))?
        .as_secs();

    i64::try_from(secs).map_err(|_| LedgerError::Crypto("Timestamp overflow".to_string()))
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

pub fn ripemd160_digest(data: &[u8]) -> Vec<u8> {
    let mut hasher = Ripemd160::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

pub fn base58_encode(data: &[u8]) -> String {
    bs58::encode(data).into_string()
}

pub fn base58_decode(data: &str) -> Result<Vec<u8>> {
    bs58::decode(data)
        .into_vec()
        .map_err(|e| LedgerError::Checksum(format!("Invalid base58 encoding: {e}")))
}

fn checksum(payload: &[u8]) -> Vec<u8> {
    let first_sha = sha256_digest(payload);
    let second_sha = sha256_digest(first_sha.as_slice());
    second_sha[..CHECKSUM_LEN].to_vec()
}

/// base58(version || payload || checksum)
pub fn base58check_encode(payload: &[u8], version: u8) -> String {
    let mut data = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    data.push(version);
    data.extend_from_slice(payload);
    let checksum = checksum(data.as_slice());
    data.extend(checksum);
    base58_encode(data.as_slice())
}

/// Inverse of [`base58check_encode`]. Returns `(version, payload)`.
pub fn base58check_decode(encoded: &str) -> Result<(u8, Vec<u8>)> {
    let data = base58_decode(encoded)?;
    if data.len() < 1 + CHECKSUM_LEN {
        return Err(LedgerError::Checksum(format!(
            "Encoded value too short: {encoded}"
        )));
    }

    let (body, actual_checksum) = data.split_at(data.len() - CHECKSUM_LEN);
    if checksum(body) != actual_checksum {
        return Err(LedgerError::Checksum(format!(
            "Checksum mismatch for {encoded}"
        )));
    }
    Ok((body[0], body[1..].to_vec()))
}

/// Generates a P-256 key pair and returns its PKCS#8 document.
pub fn new_key_pair() -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?
        .as_ref()
        .to_vec();
    Ok(pkcs8)
}

/// Public key of a PKCS#8 document as raw `X || Y`.
pub fn public_key_from_pkcs8(pkcs8: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}")))?;
    let point = key_pair.public_key().as_ref();
    match point.split_first() {
        Some((&SEC1_UNCOMPRESSED_TAG, coordinates)) if coordinates.len() == PUBLIC_KEY_LEN => {
            Ok(coordinates.to_vec())
        }
        _ => Err(LedgerError::Crypto(
            "Unexpected public key encoding".to_string(),
        )),
    }
}

/// Signs `digest`, returning the fixed-width `r || s` encoding.
pub fn ecdsa_p256_sha256_sign_digest(pkcs8: &[u8], digest: &[u8]) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8, &rng)
        .map_err(|e| LedgerError::Crypto(format!("Failed to create key pair from PKCS8: {e}")))?;
    let signature = key_pair
        .sign(&rng, digest)
        .map_err(|e| LedgerError::Crypto(format!("Failed to sign digest: {e}")))?
        .as_ref()
        .to_vec();
    if signature.len() != SIGNATURE_LEN {
        return Err(LedgerError::Crypto(format!(
            "Unexpected signature length {}",
            signature.len()
        )));
    }
    Ok(signature)
}

/// Verifies an `r || s` signature over `digest` against an `X || Y` public key.
pub fn ecdsa_p256_sha256_sign_verify(public_key: &[u8], signature: &[u8], digest: &[u8]) -> bool {
    if signature.len() != SIGNATURE_LEN || public_key.len() != PUBLIC_KEY_LEN {
        return false;
    }

    let (x, y) = public_key.split_at(P256_FIELD_LEN);
    let mut point = Vec::with_capacity(1 + PUBLIC_KEY_LEN);
    point.push(SEC1_UNCOMPRESSED_TAG);
    point.extend_from_slice(x);
    point.extend_from_slice(y);

    let (r, s) = signature.split_at(P256_FIELD_LEN);
    let mut fixed = Vec::with_capacity(SIGNATURE_LEN);
    fixed.extend_from_slice(r);
    fixed.extend_from_slice(s);

    let peer_public_key = ring::signature::UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, point);
    peer_public_key.verify(digest, fixed.as_slice()).is_ok()
}
