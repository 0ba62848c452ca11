use crate::blockchain::core::block::{Block, Sha256Hash, ZERO_HASH};
use crate::blockchain::core::validation::{check_difficulty, meets_target};
use crate::error::ChainError;
use tracing::{debug, info};

/// An append-only sequence of sealed blocks mined at one fixed difficulty.
#[derive(Debug, Clone)]
pub struct Chain {
    blocks: Vec<Block>,
    difficulty: u32,
}

impl Chain {
    /// Create a chain whose genesis block carries `payload`, mined at `difficulty`.
    pub fn new(payload: impl Into<Vec<u8>>, difficulty: u32) -> Result<Self, ChainError> {
        check_difficulty(difficulty)?;

        let mut chain = Chain {
            blocks: Vec::new(),
            difficulty,
        };
        let mut genesis = chain.prepare_block(payload);
        genesis.mine(difficulty, 0..u64::MAX)?;
        chain.append(genesis)?;

        info!(
            "Genesis block mined at difficulty {} (hash {})",
            difficulty,
            hex::encode(chain.tip_hash())
        );
        Ok(chain)
    }

    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Hash the next block must link to.
    pub fn tip_hash(&self) -> Sha256Hash {
        self.tip().and_then(|b| b.hash).unwrap_or(ZERO_HASH)
    }

    pub fn block_at(&self, index: usize) -> Result<&Block, ChainError> {
        self.blocks.get(index).ok_or(ChainError::IndexOutOfRange {
            index,
            len: self.blocks.len(),
        })
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// Template for the next block, linked to the current tip.
    pub fn prepare_block(&self, payload: impl Into<Vec<u8>>) -> Block {
        Block::new_template(payload, self.tip_hash())
    }

    /// Append `block` if it links to the tip, is intact and meets the difficulty.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        let expected = self.tip_hash();
        if block.previous_hash != expected {
            return Err(ChainError::LinkMismatch {
                expected,
                found: block.previous_hash,
            });
        }

        if !block.verify() {
            return Err(ChainError::InvalidProof);
        }

        // verify() succeeded, so the hash is present.
        let hash = block.hash.ok_or(ChainError::InvalidProof)?;
        if !meets_target(&hash, self.difficulty) {
            return Err(ChainError::InsufficientWork {
                difficulty: self.difficulty,
            });
        }

        debug!(
            "Appending block {} at height {}",
            hex::encode(hash),
            self.blocks.len()
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Re-check linkage, integrity and difficulty of every block, stopping at
    /// the first failure. Use [`Chain::first_corrupt`] to locate a tampered block.
    pub fn validate(&self) -> Result<(), ChainError> {
        let mut expected = ZERO_HASH;
        for block in &self.blocks {
            if block.previous_hash != expected {
                return Err(ChainError::LinkMismatch {
                    expected,
                    found: block.previous_hash,
                });
            }
            if !block.verify() {
                return Err(ChainError::InvalidProof);
            }
            let hash = block.hash.ok_or(ChainError::InvalidProof)?;
            if !meets_target(&hash, self.difficulty) {
                return Err(ChainError::InsufficientWork {
                    difficulty: self.difficulty,
                });
            }
            expected = hash;
        }
        Ok(())
    }

    /// Index of the first block whose stored hash no longer matches its contents.
    pub fn first_corrupt(&self) -> Option<usize> {
        self.blocks.iter().position(|b| !b.verify())
    }

    #[cfg(test)]
    pub(crate) fn corrupt(&mut self, index: usize, payload: &[u8]) -> Result<(), ChainError> {
        let len = self.blocks.len();
        let block = self
            .blocks
            .get_mut(index)
            .ok_or(ChainError::IndexOutOfRange { index, len })?;
        block.payload = payload.to_vec();
        Ok(())
    }
}
