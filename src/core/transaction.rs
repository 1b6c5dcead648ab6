// Value transfer in the UTXO model: a transaction consumes earlier outputs
// through its inputs and creates new outputs locked to public-key hashes.

use crate::error::{LedgerError, Result};
use crate::storage::UTXOSet;
use crate::utils::{
    deserialize, ecdsa_p256_sha256_sign_digest, ecdsa_p256_sha256_sign_verify, serialize,
    sha256_digest,
};
use crate::wallet::{address_to_pub_key_hash, hash_pub_key, Wallet};
use data_encoding::HEXLOWER;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Output index carried by the single coinbase input.
pub const COINBASE_VOUT: i64 = -1;

/// Prior transactions referenced by inputs, keyed by hex txid.
pub type PrevTransactions = HashMap<String, Transaction>;

// A reference to one earlier output, plus the proof that the spender owns it
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct TXInput {
    txid: Vec<u8>,
    vout: i64,
    signature: Vec<u8>,
    pub_key: Vec<u8>,
}

impl TXInput {
    /// Unsigned input spending output `vout` of transaction `txid`.
    pub fn new(txid: &[u8], vout: usize) -> TXInput {
        TXInput {
            txid: txid.to_vec(),
            vout: vout as i64,
            signature: vec![],
            pub_key: vec![],
        }
    }

    pub fn get_txid(&self) -> &[u8] {
        self.txid.as_slice()
    }

    pub fn get_vout(&self) -> i64 {
        self.vout
    }

    /// Output index as a position, `None` for the coinbase marker.
    pub fn vout_index(&self) -> Option<usize> {
        usize::try_from(self.vout).ok()
    }

    pub fn get_signature(&self) -> &[u8] {
        self.signature.as_slice()
    }

    pub fn get_pub_key(&self) -> &[u8] {
        self.pub_key.as_slice()
    }

    pub fn uses_key(&self, pub_key_hash: &[u8]) -> bool {
        hash_pub_key(self.pub_key.as_slice()).eq(pub_key_hash)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct TXOutput {
    value: u64,
    pub_key_hash: Vec<u8>,
}

impl TXOutput {
    /// Output of `value` locked to `address`.
    pub fn new(value: u64, address: &str) -> Result<TXOutput> {
        let mut output = TXOutput {
            value,
            pub_key_hash: vec![],
        };
        output.lock(address)?;
        Ok(output)
    }

    pub fn get_value(&self) -> u64 {
        self.value
    }

    pub fn get_pub_key_hash(&self) -> &[u8] {
        self.pub_key_hash.as_slice()
    }

    fn lock(&mut self, address: &str) -> Result<()> {
        self.pub_key_hash = address_to_pub_key_hash(address)?;
        Ok(())
    }

    pub fn is_locked_with_key(&self, pub_key_hash: &[u8]) -> bool {
        self.pub_key_hash.eq(pub_key_hash)
    }
}

#[derive(
    Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Transaction {
    id: Vec<u8>,
    vin: Vec<TXInput>,
    vout: Vec<TXOutput>,
}

impl Transaction {
    /// Assembles a transaction and derives its id.
    pub fn new(vin: Vec<TXInput>, vout: Vec<TXOutput>) -> Result<Transaction> {
        let mut tx = Transaction {
            id: vec![],
            vin,
            vout,
        };
        tx.id = tx.hash()?;
        Ok(tx)
    }

    /// Coinbase paying `subsidy` to `to`. Without `data` a random payload keeps ids unique.
    pub fn new_coinbase_tx(to: &str, subsidy: u64, data: Option<&str>) -> Result<Transaction> {
        let txout = TXOutput::new(subsidy, to)?;
        let payload = match data {
            Some(text) => text.as_bytes().to_vec(),
            None => Uuid::new_v4().as_bytes().to_vec(),
        };
        let tx_input = TXInput {
            txid: vec![],
            vout: COINBASE_VOUT,
            signature: payload,
            pub_key: vec![],
        };
        Transaction::new(vec![tx_input], vec![txout])
    }

    /// Builds and signs a transfer of `amount` from `wallet` to `to`.
    ///
    /// Both the recipient address and the sender's funds are checked before
    /// anything is signed, so a rejected send leaves no trace.
    pub fn new_utxo_transaction(
        wallet: &Wallet,
        to: &str,
        amount: u64,
        utxo_set: &UTXOSet,
    ) -> Result<Transaction> {
        if amount == 0 {
            return Err(LedgerError::InvalidTransaction(
                "Amount must be positive".to_string(),
            ));
        }
        let to_pub_key_hash = address_to_pub_key_hash(to)?;
        let from_pub_key_hash = hash_pub_key(wallet.get_public_key());

        let (accumulated, valid_outputs) =
            utxo_set.find_spendable_outputs(from_pub_key_hash.as_slice(), amount)?;
        if accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: accumulated,
            });
        }

        let mut inputs = vec![];
        for (txid_hex, outs) in valid_outputs {
            let txid = HEXLOWER.decode(txid_hex.as_bytes()).map_err(|e| {
                LedgerError::InvalidTransaction(format!("Invalid transaction ID: {e}"))
            })?;
            for out in outs {
                inputs.push(TXInput::new(txid.as_slice(), out));
            }
        }

        let mut outputs = vec![TXOutput {
            value: amount,
            pub_key_hash: to_pub_key_hash,
        }];
        if accumulated > amount {
            outputs.push(TXOutput {
                value: accumulated - amount,
                pub_key_hash: from_pub_key_hash,
            });
        }

        let mut tx = Transaction::new(inputs, outputs)?;
        let prev_txs = utxo_set.find_prev_transactions(&tx)?;
        tx.sign(wallet, &prev_txs)?;
        Ok(tx)
    }

    /// Copy with every input's signature and public key cleared.
    pub fn trimmed_copy(&self) -> Transaction {
        let inputs = self
            .vin
            .iter()
            .map(|input| TXInput {
                txid: input.txid.clone(),
                vout: input.vout,
                signature: vec![],
                pub_key: vec![],
            })
            .collect();
        Transaction {
            id: self.id.clone(),
            vin: inputs,
            vout: self.vout.clone(),
        }
    }

    /// Signs every input with `wallet`, then re-derives the id.
    pub fn sign(&mut self, wallet: &Wallet, prev_txs: &PrevTransactions) -> Result<()> {
        if self.is_coinbase() {
            return Ok(());
        }

        let tx_copy = self.trimmed_copy();
        for idx in 0..self.vin.len() {
            let prev_output = referenced_output(&self.vin[idx], prev_txs)?;
            let digest = signing_digest(&tx_copy, idx, prev_output.get_pub_key_hash())?;
            let signature = ecdsa_p256_sha256_sign_digest(wallet.get_pkcs8(), digest.as_slice())?;

            let vin = &mut self.vin[idx];
            vin.signature = signature;
            vin.pub_key = wallet.get_public_key().to_vec();
        }

        self.id = self.hash()?;
        debug!("Signed transaction {}", HEXLOWER.encode(self.id.as_slice()));
        Ok(())
    }

    /// True only when every input's signature checks out against `prev_txs`.
    pub fn verify(&self, prev_txs: &PrevTransactions) -> bool {
        if self.is_coinbase() {
            return true;
        }

        let tx_copy = self.trimmed_copy();
        for (idx, vin) in self.vin.iter().enumerate() {
            let prev_output = match referenced_output(vin, prev_txs) {
                Ok(output) => output,
                Err(e) => {
                    warn!("Cannot verify input {idx}: {e}");
                    return false;
                }
            };
            if !vin.uses_key(prev_output.get_pub_key_hash()) {
                warn!("Input {idx} public key does not match the output it spends");
                return false;
            }
            let digest = match signing_digest(&tx_copy, idx, prev_output.get_pub_key_hash()) {
                Ok(digest) => digest,
                Err(e) => {
                    warn!("Cannot digest input {idx}: {e}");
                    return false;
                }
            };

            if !ecdsa_p256_sha256_sign_verify(
                vin.pub_key.as_slice(),
                vin.signature.as_slice(),
                digest.as_slice(),
            ) {
                return false;
            }
        }
        true
    }

    pub fn is_coinbase(&self) -> bool {
        self.vin.len() == 1 && self.vin[0].txid.is_empty() && self.vin[0].vout == COINBASE_VOUT
    }

    /// SHA-256 of the encoding with `id` cleared.
    pub fn hash(&self) -> Result<Vec<u8>> {
        let tx_copy = Transaction {
            id: vec![],
            vin: self.vin.clone(),
            vout: self.vout.clone(),
        };
        Ok(sha256_digest(tx_copy.serialize()?.as_slice()))
    }

    pub fn get_id(&self) -> &[u8] {
        self.id.as_slice()
    }

    pub fn get_vin(&self) -> &[TXInput] {
        self.vin.as_slice()
    }

    pub fn get_vout(&self) -> &[TXOutput] {
        self.vout.as_slice()
    }

    pub fn get_output_value(&self) -> Result<u64> {
        self.vout.iter().try_fold(0u64, |total, out| {
            total
                .checked_add(out.value)
                .ok_or_else(|| LedgerError::InvalidTransaction("Output value overflow".to_string()))
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}

/// Digest signed for input `input_index`: the trimmed copy's id with that
/// input's public key replaced by the lock it spends.
pub fn signing_digest(
    trimmed: &Transaction,
    input_index: usize,
    prev_pub_key_hash: &[u8],
) -> Result<Vec<u8>> {
    let mut tx_copy = trimmed.clone();
    let input = tx_copy.vin.get_mut(input_index).ok_or_else(|| {
        LedgerError::InvalidTransaction(format!("No input at index {input_index}"))
    })?;
    input.signature = vec![];
    input.pub_key = prev_pub_key_hash.to_vec();
    tx_copy.hash()
}

fn referenced_output<'a>(vin: &TXInput, prev_txs: &'a PrevTransactions) -> Result<&'a TXOutput> {
    let txid_hex = HEXLOWER.encode(vin.get_txid());
    let prev_tx = prev_txs.get(txid_hex.as_str()).ok_or_else(|| {
        LedgerError::InvalidTransaction(format!("Previous transaction {txid_hex} not found"))
    })?;
    vin.vout_index()
        .and_then(|idx| prev_tx.vout.get(idx))
        .ok_or_else(|| {
            LedgerError::InvalidTransaction(format!(
                "Output {} does not exist in {txid_hex}",
                vin.get_vout()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::TEST_SUBSIDY;

    fn funded(wallet: &Wallet) -> (Transaction, PrevTransactions) {
        let coinbase = Transaction::new_coinbase_tx(&wallet.get_address(), 10, None).unwrap();
        let mut prev_txs = PrevTransactions::new();
        prev_txs.insert(HEXLOWER.encode(coinbase.get_id()), coinbase.clone());
        (coinbase, prev_txs)
    }

    fn spend(coinbase: &Transaction, to: &str, change_to: &str) -> Transaction {
        Transaction::new(
            vec![TXInput::new(coinbase.get_id(), 0)],
            vec![
                TXOutput::new(4, to).unwrap(),
                TXOutput::new(6, change_to).unwrap(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_coinbase_shape() {
        let wallet = Wallet::new().unwrap();
        let tx = Transaction::new_coinbase_tx(&wallet.get_address(), TEST_SUBSIDY, None).unwrap();

        assert!(tx.is_coinbase());
        assert_eq!(tx.get_vin()[0].get_vout(), COINBASE_VOUT);
        assert!(tx.get_vin()[0].get_txid().is_empty());
        assert_eq!(tx.get_vout()[0].get_value(), TEST_SUBSIDY);
        assert!(tx.get_vout()[0].is_locked_with_key(&hash_pub_key(wallet.get_public_key())));
        assert_eq!(tx.get_id(), tx.hash().unwrap().as_slice());
    }

    #[test]
    fn test_coinbase_ids_are_unique_without_data() {
        let address = Wallet::new().unwrap().get_address();
        let a = Transaction::new_coinbase_tx(&address, 10, None).unwrap();
        let b = Transaction::new_coinbase_tx(&address, 10, None).unwrap();
        assert_ne!(a.get_id(), b.get_id());

        let c = Transaction::new_coinbase_tx(&address, 10, Some("genesis")).unwrap();
        let d = Transaction::new_coinbase_tx(&address, 10, Some("genesis")).unwrap();
        assert_eq!(c.get_id(), d.get_id());
    }

    #[test]
    fn test_coinbase_rejects_bad_address() {
        assert!(matches!(
            Transaction::new_coinbase_tx("not-an-address", 10, None),
            Err(LedgerError::Checksum(_))
        ));
    }

    #[test]
    fn test_trimmed_copy_strips_signatures_only() {
        let sender = Wallet::new().unwrap();
        let (coinbase, prev_txs) = funded(&sender);
        let mut tx = spend(&coinbase, &Wallet::new().unwrap().get_address(), &sender.get_address());
        tx.sign(&sender, &prev_txs).unwrap();

        let trimmed = tx.trimmed_copy();
        assert_eq!(trimmed.get_vout(), tx.get_vout());
        for (trimmed_in, original_in) in trimmed.get_vin().iter().zip(tx.get_vin()) {
            assert!(trimmed_in.get_signature().is_empty());
            assert!(trimmed_in.get_pub_key().is_empty());
            assert_eq!(trimmed_in.get_txid(), original_in.get_txid());
            assert_eq!(trimmed_in.get_vout(), original_in.get_vout());
        }
    }

    #[test]
    fn test_signing_digest_is_pure_and_per_input() {
        let trimmed = Transaction::new(
            vec![TXInput::new(&[1u8; 32], 0), TXInput::new(&[2u8; 32], 1)],
            vec![],
        )
        .unwrap();
        let before = trimmed.clone();

        let first = signing_digest(&trimmed, 0, &[9u8; 20]).unwrap();
        let again = signing_digest(&trimmed, 0, &[9u8; 20]).unwrap();
        let second = signing_digest(&trimmed, 1, &[9u8; 20]).unwrap();

        assert_eq!(trimmed, before);
        assert_eq!(first, again);
        assert_ne!(first, second);
        assert!(signing_digest(&trimmed, 2, &[9u8; 20]).is_err());
    }

    #[test]
    fn test_sign_then_verify() {
        let sender = Wallet::new().unwrap();
        let (coinbase, prev_txs) = funded(&sender);
        let mut tx = spend(&coinbase, &Wallet::new().unwrap().get_address(), &sender.get_address());
        let unsigned_id = tx.get_id().to_vec();

        tx.sign(&sender, &prev_txs).unwrap();

        assert_ne!(tx.get_id(), unsigned_id.as_slice());
        assert_eq!(tx.get_id(), tx.hash().unwrap().as_slice());
        assert_eq!(tx.get_vin()[0].get_pub_key(), sender.get_public_key());
        assert!(tx.get_vin()[0].uses_key(&hash_pub_key(sender.get_public_key())));
        assert!(tx.verify(&prev_txs));
    }

    #[test]
    fn test_every_flipped_signature_byte_fails() {
        let sender = Wallet::new().unwrap();
        let (coinbase, prev_txs) = funded(&sender);
        let mut tx = spend(&coinbase, &Wallet::new().unwrap().get_address(), &sender.get_address());
        tx.sign(&sender, &prev_txs).unwrap();

        for byte in 0..tx.vin[0].signature.len() {
            let mut forged = tx.clone();
            forged.vin[0].signature[byte] ^= 0x01;
            assert!(!forged.verify(&prev_txs), "flip at byte {byte} verified");
        }
    }

    #[test]
    fn test_tampered_output_fails() {
        let sender = Wallet::new().unwrap();
        let (coinbase, prev_txs) = funded(&sender);
        let mut tx = spend(&coinbase, &Wallet::new().unwrap().get_address(), &sender.get_address());
        tx.sign(&sender, &prev_txs).unwrap();

        tx.vout[0].value = 10;
        assert!(!tx.verify(&prev_txs));
    }

    #[test]
    fn test_wrong_key_fails() {
        let sender = Wallet::new().unwrap();
        let thief = Wallet::new().unwrap();
        let (coinbase, prev_txs) = funded(&sender);
        let mut tx = spend(&coinbase, &thief.get_address(), &thief.get_address());
        tx.sign(&thief, &prev_txs).unwrap();

        assert!(!tx.get_vin()[0].uses_key(&hash_pub_key(sender.get_public_key())));
        assert!(!tx.verify(&prev_txs));
    }

    #[test]
    fn test_missing_previous_transaction_fails_verify() {
        let sender = Wallet::new().unwrap();
        let (coinbase, prev_txs) = funded(&sender);
        let mut tx = spend(&coinbase, &sender.get_address(), &sender.get_address());
        tx.sign(&sender, &prev_txs).unwrap();

        assert!(!tx.verify(&PrevTransactions::new()));
        assert!(matches!(
            spend(&coinbase, &sender.get_address(), &sender.get_address())
                .sign(&sender, &PrevTransactions::new()),
            Err(LedgerError::InvalidTransaction(_))
        ));
    }

    #[test]
    fn test_multi_input_signatures_are_distinct() {
        let sender = Wallet::new().unwrap();
        let (first, mut prev_txs) = funded(&sender);
        let (second, more) = funded(&sender);
        prev_txs.extend(more);

        let mut tx = Transaction::new(
            vec![
                TXInput::new(first.get_id(), 0),
                TXInput::new(second.get_id(), 0),
            ],
            vec![TXOutput::new(20, &sender.get_address()).unwrap()],
        )
        .unwrap();
        tx.sign(&sender, &prev_txs).unwrap();

        assert_eq!(tx.get_vin().len(), 2);
        assert_ne!(tx.get_vin()[0].get_signature(), tx.get_vin()[1].get_signature());
        assert!(tx.verify(&prev_txs));

        let mut forged = tx.clone();
        forged.vin[1].signature[5] ^= 0x80;
        assert!(!forged.verify(&prev_txs));
    }

    #[test]
    fn test_transaction_roundtrip() {
        let sender = Wallet::new().unwrap();
        let (coinbase, prev_txs) = funded(&sender);
        let mut tx = spend(&coinbase, &sender.get_address(), &sender.get_address());
        tx.sign(&sender, &prev_txs).unwrap();

        let decoded = Transaction::deserialize(&tx.serialize().unwrap()).unwrap();
        assert_eq!(decoded, tx);
        assert!(decoded.verify(&prev_txs));
    }
}
