//! Staleness generators: how long each node takes to observe a write.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, PolicyConfig};
use crate::types::{ClientRequest, NodeId, VisibilityMap};

/// Computes the visibility map of a write.
///
/// # Contract
///
/// - Every node in `nodes` appears in the returned map.
/// - Delays are milliseconds relative to the write timestamp.
pub trait StalenessGenerator: Send + Sync + fmt::Debug {
    fn compute_visibility_map(&self, nodes: &[NodeId], request: &ClientRequest) -> VisibilityMap;
}

/// Fixed delays: `own_reads` for the receiving node, `foreign_reads` for
/// every other node.
///
/// With `own_reads == 0` a node always reads its own latest write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantStaleness {
    pub own_reads: u64,
    pub foreign_reads: u64,
}

impl ConstantStaleness {
    pub const CLASS: &'static str = "constant";

    #[must_use]
    pub const fn new(own_reads: u64, foreign_reads: u64) -> Self {
        Self {
            own_reads,
            foreign_reads,
        }
    }

    /// Build from `ownReads` (default 0) and `foreignReads` (required).
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.get_or("ownReads", 0)?,
            config.require("foreignReads")?,
        ))
    }
}

impl StalenessGenerator for ConstantStaleness {
    fn compute_visibility_map(&self, nodes: &[NodeId], request: &ClientRequest) -> VisibilityMap {
        let receiver = request.received_by();
        nodes
            .iter()
            .map(|node| {
                let delay = if Some(*node) == receiver {
                    self.own_reads
                } else {
                    self.foreign_reads
                };
                (*node, delay)
            })
            .collect()
    }
}

/// `own_reads` for the receiving node; every other node draws its delay
/// uniformly from `[min_foreign_reads, max_foreign_reads]`.
///
/// Seeded, so a run is reproducible as long as writes arrive in the same
/// order.
pub struct UniformStaleness {
    own_reads: u64,
    min_foreign_reads: u64,
    max_foreign_reads: u64,
    rng: Mutex<StdRng>,
}

impl fmt::Debug for UniformStaleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformStaleness")
            .field("own_reads", &self.own_reads)
            .field("min_foreign_reads", &self.min_foreign_reads)
            .field("max_foreign_reads", &self.max_foreign_reads)
            .finish_non_exhaustive()
    }
}

impl UniformStaleness {
    pub const CLASS: &'static str = "uniform";

    /// Create a generator. The bounds are swapped if given in reverse.
    #[must_use]
    pub fn new(own_reads: u64, min_foreign_reads: u64, max_foreign_reads: u64, seed: u64) -> Self {
        Self {
            own_reads,
            min_foreign_reads: min_foreign_reads.min(max_foreign_reads),
            max_foreign_reads: min_foreign_reads.max(max_foreign_reads),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Build from `ownReads` (default 0), `minForeignReads`,
    /// `maxForeignReads` (required) and `seed` (default 0).
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.get_or("ownReads", 0)?,
            config.require("minForeignReads")?,
            config.require("maxForeignReads")?,
            config.get_or("seed", 0)?,
        ))
    }
}

impl StalenessGenerator for UniformStaleness {
    fn compute_visibility_map(&self, nodes: &[NodeId], request: &ClientRequest) -> VisibilityMap {
        let receiver = request.received_by();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        nodes
            .iter()
            .map(|node| {
                let delay = if Some(*node) == receiver {
                    self.own_reads
                } else {
                    rng.random_range(self.min_foreign_reads..=self.max_foreign_reads)
                };
                (*node, delay)
            })
            .collect()
    }
}
