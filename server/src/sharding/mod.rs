//! Sharding.
//!
//! A [`Router`] maps each request to the [`QueryHandler`](crate::query::QueryHandler)
//! that owns its key, using a pluggable [`ShardingStrategy`]:
//!
//! - [`HashSharding`]: CRC-32 of the key modulo the shard count
//! - [`RangeSharding`]: sorted separators, optionally case-insensitive

mod hash;
mod range;
mod router;

use std::fmt;

pub use hash::HashSharding;
pub use range::RangeSharding;
pub use router::Router;

/// Deterministic key → shard index mapping.
///
/// # Contract
///
/// - `shard_for(key) < shard_count()` for every key.
/// - The result depends only on the key and the strategy's configuration.
pub trait ShardingStrategy: Send + Sync + fmt::Debug {
    fn shard_count(&self) -> usize;

    fn shard_for(&self, key: &str) -> usize;
}
