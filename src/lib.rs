//! powpool - a proof-of-work hash chain extended by a pool of racing miners
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Blockchain
//! - [`blockchain`] - Block sealing, chain linkage and the difficulty predicate
//!
//! ## Mining
//! - [`pool`] - Nonce range allocation and commit arbitration
//! - [`miner`] - Worker loop driving the pool
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;

// ============================================================================
// Mining
// ============================================================================
pub mod miner;
pub mod pool;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;

pub use blockchain::{Block, Chain, Sha256Hash, ZERO_HASH};
pub use error::{ChainError, Result};
pub use pool::{MiningPool, PoolStats, Work};
