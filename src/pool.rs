//! Mining pool: hands out disjoint nonce ranges and arbitrates commits.
//!
//! A single lock guards both the nonce cursor and the chain. Only the cheap
//! bookkeeping runs under it; the nonce search itself happens in the caller,
//! outside any lock, so any number of workers can mine in parallel.

use crate::blockchain::{Block, Chain, Sha256Hash};
use crate::config::Config;
use crate::error::ChainError;
use parking_lot::Mutex;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Payload placed in the template handed to `miner_id`.
pub fn describe_payload(miner_id: u64) -> Vec<u8> {
    format!("Send 1 coin to miner {}", miner_id).into_bytes()
}

/// A unit of work: a template bound to the tip at issuance plus the nonce
/// range reserved for it.
#[derive(Debug, Clone)]
pub struct Work {
    pub miner_id: u64,
    pub range: Range<u64>,
    pub difficulty: u32,
    pub template: Block,
}

impl Work {
    pub fn mine(&mut self) -> Result<(), ChainError> {
        self.template.mine(self.difficulty, self.range.clone())
    }

    pub fn mine_until(&mut self, cancel: &AtomicBool) -> Result<(), ChainError> {
        self.template
            .mine_until(self.difficulty, self.range.clone(), cancel)
    }
}

/// Point-in-time counters of pool activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub ranges_issued: u64,
    pub accepted: u64,
    pub stale: u64,
    /// Refused submissions plus work requests that could not be served.
    pub rejected: u64,
}

#[derive(Debug, Default)]
struct Counters {
    ranges_issued: AtomicU64,
    accepted: AtomicU64,
    stale: AtomicU64,
    rejected: AtomicU64,
}

struct PoolState {
    cursor: u64,
    chain: Chain,
}

pub struct MiningPool {
    state: Mutex<PoolState>,
    increment: u64,
    difficulty: u32,
    counters: Counters,
}

impl MiningPool {
    /// Wrap an existing chain. Every range handed out is `increment` nonces wide.
    pub fn new(chain: Chain, increment: u64) -> Result<Self, ChainError> {
        if increment == 0 {
            return Err(ChainError::InvalidConfig(
                "nonce increment must be greater than zero".to_string(),
            ));
        }

        Ok(MiningPool {
            difficulty: chain.difficulty(),
            state: Mutex::new(PoolState { cursor: 0, chain }),
            increment,
            counters: Counters::default(),
        })
    }

    /// Mine a genesis block from `config` and start a pool on top of it.
    pub fn from_config(config: &Config) -> Result<Self, ChainError> {
        let chain = Chain::new(config.genesis.payload.as_bytes(), config.mining.difficulty)?;
        Self::new(chain, config.mining.increment)
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn increment(&self) -> u64 {
        self.increment
    }

    /// Reserve the next nonce range and build a template on the current tip.
    ///
    /// The template may go stale as soon as the lock is released; a worker
    /// that loses the race finds out from [`MiningPool::commit_work`].
    pub fn get_work(&self, miner_id: u64) -> Result<Work, ChainError> {
        let mut state = self.state.lock();

        let start = state.cursor;
        let Some(end) = start.checked_add(self.increment) else {
            drop(state);
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!("Refused work for miner {}: nonce space exhausted", miner_id);
            return Err(ChainError::NonceSpaceExhausted);
        };
        state.cursor = end;
        let template = state.chain.prepare_block(describe_payload(miner_id));
        drop(state);

        self.counters.ranges_issued.fetch_add(1, Ordering::Relaxed);
        debug!("Miner {} assigned nonces {}..{}", miner_id, start, end);

        Ok(Work {
            miner_id,
            range: start..end,
            difficulty: self.difficulty,
            template,
        })
    }

    /// Submit a sealed block. Returns the height it was accepted at.
    ///
    /// Integrity is checked before taking the lock. Errors from the chain are
    /// passed through unchanged; the pool never re-issues work on its own.
    pub fn commit_work(&self, block: Block) -> Result<usize, ChainError> {
        if !block.verify() {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            warn!("Rejected block with invalid proof of work");
            return Err(ChainError::InvalidProof);
        }

        let hash = block.hash;
        let result = {
            let mut state = self.state.lock();
            state.chain.append(block).map(|()| state.chain.len() - 1)
        };

        match &result {
            Ok(height) => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Accepted block {} at height {}",
                    hash.map(hex::encode).unwrap_or_default(),
                    height
                );
            }
            Err(e @ ChainError::LinkMismatch { .. }) => {
                self.counters.stale.fetch_add(1, Ordering::Relaxed);
                debug!("Discarded stale block: {}", e);
            }
            Err(e) => {
                self.counters.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Rejected block: {}", e);
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.state.lock().chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().chain.is_empty()
    }

    pub fn block_at(&self, index: usize) -> Result<Block, ChainError> {
        self.state.lock().chain.block_at(index).cloned()
    }

    pub fn tip_hash(&self) -> Sha256Hash {
        self.state.lock().chain.tip_hash()
    }

    /// Copy of the chain for inspection outside the lock.
    pub fn snapshot(&self) -> Chain {
        self.state.lock().chain.clone()
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        self.state.lock().chain.validate()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            ranges_issued: self.counters.ranges_issued.load(Ordering::Relaxed),
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            stale: self.counters.stale.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
        }
    }
}
