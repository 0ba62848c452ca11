// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// block sealing, chain linkage and the difficulty predicate.

pub mod core;
pub use self::core::*;
