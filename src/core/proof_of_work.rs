use crate::core::Block;
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::{BigInt, Sign};
use std::ops::ShlAssign;

/// Mining context pairing one block with the target its hash must fall below.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: BigInt,
    target_bits: u32,
}

const MAX_NONCE: i64 = i64::MAX;

impl<'a> ProofOfWork<'a> {
    /// `target = 1 << (256 - target_bits)`
    pub fn new_proof_of_work(block: &'a Block, target_bits: u32) -> ProofOfWork<'a> {
        let mut target = BigInt::from(1);
        target.shl_assign(256 - target_bits.min(256));
        ProofOfWork {
            block,
            target,
            target_bits,
        }
    }

    /// Whether the block's stored nonce still meets `target_bits`.
    pub fn validate(block: &Block, target_bits: u32) -> bool {
        let pow = ProofOfWork::new_proof_of_work(block, target_bits);
        pow.meets_target(Self::recompute_hash(block, target_bits).as_slice())
    }

    /// Hash of the block's current contents at its stored nonce.
    pub fn recompute_hash(block: &Block, target_bits: u32) -> Vec<u8> {
        let pow = ProofOfWork::new_proof_of_work(block, target_bits);
        sha256_digest(pow.prepare_data(block.get_nonce()).as_slice())
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        BigInt::from_bytes_be(Sign::Plus, hash) < self.target
    }

    // prev hash || transactions digest || hex(timestamp) || hex(nonce) || hex(target bits)
    fn prepare_data(&self, nonce: i64) -> Vec<u8> {
        let mut data_bytes = vec![];
        data_bytes.extend(self.block.get_prev_hash());
        data_bytes.extend(self.block.hash_transactions());
        data_bytes.extend(format!("{:x}", self.block.get_timestamp()).as_bytes());
        data_bytes.extend(format!("{nonce:x}").as_bytes());
        data_bytes.extend(format!("{:x}", self.target_bits).as_bytes());
        data_bytes
    }

    /// Counts nonces up from zero until the hash falls below the target.
    pub fn run(&self) -> (i64, Vec<u8>) {
        info!(
            "Mining the block containing {}",
            HEXLOWER.encode(self.block.hash_transactions().as_slice())
        );
        let mut nonce = 0;
        let mut hash = Vec::new();
        while nonce < MAX_NONCE {
            let data = self.prepare_data(nonce);
            hash = sha256_digest(data.as_slice());
            if self.meets_target(hash.as_slice()) {
                break;
            }
            nonce += 1;
        }
        debug!(
            "Found nonce {nonce} for hash {}",
            HEXLOWER.encode(hash.as_slice())
        );
        (nonce, hash)
    }
}
