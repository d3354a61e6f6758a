//! Client delay generators: latency applied purely on the client side.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{ConfigError, PolicyConfig};
use crate::types::{ClientRequest, NodeId};

/// Computes extra client-side latency (e.g. network round trip), additive
/// to and independent of any server-side delay.
pub trait ClientDelayGenerator: Send + Sync + fmt::Debug {
    fn compute_delay(&self, nodes: &[NodeId], request: &ClientRequest) -> u64;
}

/// The same delay for every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantClientDelay {
    pub default_delay: u64,
}

impl ConstantClientDelay {
    pub const CLASS: &'static str = "constant";

    #[must_use]
    pub const fn new(default_delay: u64) -> Self {
        Self { default_delay }
    }

    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.require("defaultDelay")?))
    }
}

impl ClientDelayGenerator for ConstantClientDelay {
    fn compute_delay(&self, _nodes: &[NodeId], _request: &ClientRequest) -> u64 {
        self.default_delay
    }
}

/// A delay drawn uniformly from `[min_delay, max_delay]`, seeded.
pub struct UniformClientDelay {
    min_delay: u64,
    max_delay: u64,
    rng: Mutex<StdRng>,
}

impl fmt::Debug for UniformClientDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniformClientDelay")
            .field("min_delay", &self.min_delay)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl UniformClientDelay {
    pub const CLASS: &'static str = "uniform";

    #[must_use]
    pub fn new(min_delay: u64, max_delay: u64, seed: u64) -> Self {
        Self {
            min_delay: min_delay.min(max_delay),
            max_delay: min_delay.max(max_delay),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(
            config.require("minDelay")?,
            config.require("maxDelay")?,
            config.get_or("seed", 0)?,
        ))
    }
}

impl ClientDelayGenerator for UniformClientDelay {
    fn compute_delay(&self, _nodes: &[NodeId], _request: &ClientRequest) -> u64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random_range(self.min_delay..=self.max_delay)
    }
}

/// No client-side delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoClientDelay;

impl NoClientDelay {
    pub const CLASS: &'static str = "none";
}

impl ClientDelayGenerator for NoClientDelay {
    fn compute_delay(&self, _nodes: &[NodeId], _request: &ClientRequest) -> u64 {
        0
    }
}
