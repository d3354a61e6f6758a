//! Range-based sharding.

use std::cmp::Ordering;

use crate::config::{ConfigError, PolicyConfig};
use crate::sharding::ShardingStrategy;

/// Shards defined by `N - 1` sorted separators for `N` shards.
///
/// The shard of a key is the number of separators that compare strictly
/// less than it; the minimum and maximum are implicit, unbounded
/// separators. Comparison is either byte-wise lexicographic or
/// case-insensitive (Unicode lowercase folding).
///
/// # Invariants
///
/// - `separators` is sorted under the configured comparison.
/// - `shard_count() == separators.len() + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSharding {
    separators: Vec<String>,
    case_sensitive: bool,
}

impl RangeSharding {
    pub const CLASS: &'static str = "range";

    /// Create a strategy. Separators are sorted once, here.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ShardCountMismatch`] if `shard_count` is not
    /// `separators.len() + 1`.
    pub fn new(
        mut separators: Vec<String>,
        case_sensitive: bool,
        shard_count: usize,
    ) -> Result<Self, ConfigError> {
        if shard_count != separators.len() + 1 {
            return Err(ConfigError::ShardCountMismatch {
                expected: separators.len() + 1,
                actual: shard_count,
            });
        }
        separators.sort_by(|a, b| compare(a, b, case_sensitive));
        Ok(Self {
            separators,
            case_sensitive,
        })
    }

    /// Build from `rangeSeparators` (comma-separated, required) and
    /// `caseSensitive` (default `true`).
    pub fn from_config(config: &PolicyConfig, shard_count: usize) -> Result<Self, ConfigError> {
        Self::new(
            config.require_list("rangeSeparators")?,
            config.get_or("caseSensitive", true)?,
            shard_count,
        )
    }

    #[must_use]
    pub fn separators(&self) -> &[String] {
        &self.separators
    }
}

impl ShardingStrategy for RangeSharding {
    fn shard_count(&self) -> usize {
        self.separators.len() + 1
    }

    fn shard_for(&self, key: &str) -> usize {
        self.separators
            .partition_point(|separator| compare(separator, key, self.case_sensitive) == Ordering::Less)
    }
}

fn compare(a: &str, b: &str, case_sensitive: bool) -> Ordering {
    if case_sensitive {
        a.cmp(b)
    } else {
        a.chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase))
    }
}
