//! Error types for powpool

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    /// The whole assigned nonce range was scanned without meeting the target.
    #[error("No solution in nonce range {start}..{end}")]
    Exhausted { start: u64, end: u64 },
    #[error("Invalid proof of work: block hash does not match its contents")]
    InvalidProof,
    #[error("Insufficient work: block hash does not meet difficulty {difficulty}")]
    InsufficientWork { difficulty: u32 },
    #[error("Block does not link to chain tip (expected {}, found {})", hex::encode(.expected), hex::encode(.found))]
    LinkMismatch { expected: [u8; 32], found: [u8; 32] },
    #[error("Block index {index} out of range (chain length {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Invalid difficulty: {0} (must be at most 256)")]
    InvalidDifficulty(u32),
    #[error("Mining cancelled")]
    Cancelled,
    #[error("Nonce space exhausted")]
    NonceSpaceExhausted,
    #[error("Chain reached {reached} blocks, short of the target {target}")]
    TargetNotReached { reached: usize, target: usize },
    #[error("Miner {0} panicked")]
    WorkerPanicked(u64),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("TOML error: {0}")]
    Toml(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::Toml(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_mismatch_renders_hex() {
        let err = ChainError::LinkMismatch {
            expected: [0u8; 32],
            found: [0xab; 32],
        };
        let msg = err.to_string();
        assert!(msg.contains(&"00".repeat(32)));
        assert!(msg.contains(&"ab".repeat(32)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ChainError = io.into();
        assert!(matches!(err, ChainError::Io(ref m) if m.contains("missing")));
    }
}
