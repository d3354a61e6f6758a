//! Hash-based sharding.

use crate::config::{ConfigError, PolicyConfig};
use crate::sharding::ShardingStrategy;

/// Shard index = CRC-32 of the key's UTF-8 bytes modulo the shard count.
///
/// Deterministic: the mapping depends only on the key and the shard count.
/// Keys are spread without regard to order, so a cross-shard scan under
/// this strategy only approximates global key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashSharding {
    shard_count: usize,
}

impl HashSharding {
    pub const CLASS: &'static str = "hash";

    /// # Errors
    ///
    /// Returns an error if `shard_count` is zero.
    pub fn new(shard_count: usize) -> Result<Self, ConfigError> {
        if shard_count == 0 {
            return Err(ConfigError::ShardCountMismatch {
                expected: 1,
                actual: 0,
            });
        }
        Ok(Self { shard_count })
    }

    /// One shard: every key maps to index 0.
    #[must_use]
    pub const fn single() -> Self {
        Self { shard_count: 1 }
    }

    /// The hash strategy takes no parameters beyond the shard count.
    pub fn from_config(_config: &PolicyConfig, shard_count: usize) -> Result<Self, ConfigError> {
        Self::new(shard_count)
    }
}

impl ShardingStrategy for HashSharding {
    fn shard_count(&self) -> usize {
        self.shard_count
    }

    fn shard_for(&self, key: &str) -> usize {
        crc32fast::hash(key.as_bytes()) as usize % self.shard_count
    }
}
