use crate::blockchain::core::validation::{check_difficulty, meets_target};
use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};

pub type Sha256Hash = [u8; 32];

/// Predecessor link of a genesis block.
pub const ZERO_HASH: Sha256Hash = [0u8; 32];

/// How many nonces are tried between polls of the cancellation flag.
const CANCEL_POLL_INTERVAL: u64 = 1024;

/// A unit of the chain. Without `hash` it is only a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: i64,
    pub payload: Vec<u8>,
    pub previous_hash: Sha256Hash,
    pub nonce: Option<u64>,
    pub hash: Option<Sha256Hash>,
}

impl Block {
    /// Create an unsealed template linked to `previous_hash`.
    pub fn new_template(payload: impl Into<Vec<u8>>, previous_hash: Sha256Hash) -> Self {
        Block {
            timestamp: chrono::Utc::now().timestamp(),
            payload: payload.into(),
            previous_hash,
            nonce: None,
            hash: None,
        }
    }

    /// Hasher primed with every preimage field that precedes the nonce.
    fn preimage_prefix(&self) -> Sha256 {
        let mut hasher = Sha256::new();
        hasher.update(self.timestamp.to_be_bytes());
        hasher.update(&self.payload);
        hasher.update(self.previous_hash);
        hasher
    }

    /// Digest of this block's fields with the given nonce.
    pub fn compute_hash(&self, nonce: u64) -> Sha256Hash {
        let mut hasher = self.preimage_prefix();
        hasher.update(nonce.to_be_bytes());
        hasher.finalize().into()
    }

    pub fn is_sealed(&self) -> bool {
        self.hash.is_some() && self.nonce.is_some()
    }

    /// Search `range` for the first nonce whose digest meets `difficulty`.
    ///
    /// On success the block is sealed with that nonce and digest. On failure
    /// the block is left exactly as it was.
    pub fn mine(&mut self, difficulty: u32, range: Range<u64>) -> Result<(), ChainError> {
        self.search(difficulty, range, None)
    }

    /// Like [`Block::mine`], but gives up with [`ChainError::Cancelled`] once
    /// `cancel` is observed set.
    pub fn mine_until(
        &mut self,
        difficulty: u32,
        range: Range<u64>,
        cancel: &AtomicBool,
    ) -> Result<(), ChainError> {
        self.search(difficulty, range, Some(cancel))
    }

    fn search(
        &mut self,
        difficulty: u32,
        range: Range<u64>,
        cancel: Option<&AtomicBool>,
    ) -> Result<(), ChainError> {
        check_difficulty(difficulty)?;

        let prefix = self.preimage_prefix();
        let (start, end) = (range.start, range.end);
        for nonce in range {
            if let Some(flag) = cancel {
                if (nonce - start) % CANCEL_POLL_INTERVAL == 0 && flag.load(Ordering::Relaxed) {
                    return Err(ChainError::Cancelled);
                }
            }

            let mut hasher = prefix.clone();
            hasher.update(nonce.to_be_bytes());
            let hash: Sha256Hash = hasher.finalize().into();
            if meets_target(&hash, difficulty) {
                self.nonce = Some(nonce);
                self.hash = Some(hash);
                return Ok(());
            }
        }

        Err(ChainError::Exhausted { start, end })
    }

    /// Check the stored hash against the block's fields.
    ///
    /// This proves integrity only; whether the hash meets a difficulty target
    /// is decided by whoever accepts the block.
    pub fn verify(&self) -> bool {
        match (self.nonce, self.hash) {
            (Some(nonce), Some(hash)) => self.compute_hash(nonce) == hash,
            _ => false,
        }
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timestamp = chrono::DateTime::from_timestamp(self.timestamp, 0)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| self.timestamp.to_string());
        writeln!(f, "Timestamp     : {}", timestamp)?;
        writeln!(f, "Previous hash : {}", hex::encode(self.previous_hash))?;
        match self.hash {
            Some(hash) => writeln!(f, "Hash          : {}", hex::encode(hash))?,
            None => writeln!(f, "Hash          : <unsealed>")?,
        }
        writeln!(f, "Payload       : {}", String::from_utf8_lossy(&self.payload))?;
        match self.nonce {
            Some(nonce) => write!(f, "Nonce         : {}", nonce),
            None => write!(f, "Nonce         : <unsealed>"),
        }
    }
}
