//! Policy registry.
//!
//! Maps a configuration discriminator (the `class` entry of a
//! [`PolicyConfig`]) to a constructor function for each pluggable
//! contract. Resolution happens once, at startup; an unknown class is a
//! [`ConfigError`], never a request-time failure.
//!
//! # Built-in classes
//!
//! | contract          | classes                      |
//! |-------------------|------------------------------|
//! | staleness         | `constant`, `uniform`        |
//! | replication delay | `constant`, `none`           |
//! | client delay      | `constant`, `uniform`, `none`|
//! | sharding          | `hash`, `range`              |

use std::collections::HashMap;
use std::sync::Arc;

use crate::anomaly::{
    AnomalyModel, ClientDelayGenerator, ConstantClientDelay, ConstantReplicationDelay,
    ConstantStaleness, NoClientDelay, NoReplicationDelay, ReplicationDelayGenerator,
    StalenessGenerator, UniformClientDelay, UniformStaleness,
};
use crate::config::{ConfigError, PolicyConfig};
use crate::sharding::{HashSharding, RangeSharding, ShardingStrategy};

pub type StalenessConstructor =
    fn(&PolicyConfig) -> Result<Box<dyn StalenessGenerator>, ConfigError>;
pub type ReplicationConstructor =
    fn(&PolicyConfig) -> Result<Box<dyn ReplicationDelayGenerator>, ConfigError>;
pub type ClientDelayConstructor =
    fn(&PolicyConfig) -> Result<Box<dyn ClientDelayGenerator>, ConfigError>;
/// Sharding constructors also receive the configured shard count.
pub type ShardingConstructor =
    fn(&PolicyConfig, usize) -> Result<Arc<dyn ShardingStrategy>, ConfigError>;

const STALENESS: &str = "staleness";
const REPLICATION: &str = "replication delay";
const CLIENT_DELAY: &str = "client delay";
const SHARDING: &str = "sharding";

/// Discriminator → constructor tables for every pluggable contract.
#[derive(Debug, Clone, Default)]
pub struct PolicyRegistry {
    staleness: HashMap<String, StalenessConstructor>,
    replication: HashMap<String, ReplicationConstructor>,
    client_delay: HashMap<String, ClientDelayConstructor>,
    sharding: HashMap<String, ShardingConstructor>,
}

impl PolicyRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry holding every built-in class.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_staleness(ConstantStaleness::CLASS, |c| {
            Ok(Box::new(ConstantStaleness::from_config(c)?))
        });
        registry.register_staleness(UniformStaleness::CLASS, |c| {
            Ok(Box::new(UniformStaleness::from_config(c)?))
        });

        registry.register_replication(ConstantReplicationDelay::CLASS, |c| {
            Ok(Box::new(ConstantReplicationDelay::from_config(c)?))
        });
        registry.register_replication(NoReplicationDelay::CLASS, |_| Ok(Box::new(NoReplicationDelay)));

        registry.register_client_delay(ConstantClientDelay::CLASS, |c| {
            Ok(Box::new(ConstantClientDelay::from_config(c)?))
        });
        registry.register_client_delay(UniformClientDelay::CLASS, |c| {
            Ok(Box::new(UniformClientDelay::from_config(c)?))
        });
        registry.register_client_delay(NoClientDelay::CLASS, |_| Ok(Box::new(NoClientDelay)));

        registry.register_sharding(HashSharding::CLASS, |c, n| {
            Ok(Arc::new(HashSharding::from_config(c, n)?))
        });
        registry.register_sharding(RangeSharding::CLASS, |c, n| {
            Ok(Arc::new(RangeSharding::from_config(c, n)?))
        });

        registry
    }

    pub fn register_staleness(&mut self, class: &str, constructor: StalenessConstructor) {
        self.staleness.insert(class.to_string(), constructor);
    }

    pub fn register_replication(&mut self, class: &str, constructor: ReplicationConstructor) {
        self.replication.insert(class.to_string(), constructor);
    }

    pub fn register_client_delay(&mut self, class: &str, constructor: ClientDelayConstructor) {
        self.client_delay.insert(class.to_string(), constructor);
    }

    pub fn register_sharding(&mut self, class: &str, constructor: ShardingConstructor) {
        self.sharding.insert(class.to_string(), constructor);
    }

    pub fn staleness(&self, config: &PolicyConfig) -> Result<Box<dyn StalenessGenerator>, ConfigError> {
        resolve(&self.staleness, STALENESS, config)?(config)
    }

    pub fn replication(
        &self,
        config: &PolicyConfig,
    ) -> Result<Box<dyn ReplicationDelayGenerator>, ConfigError> {
        resolve(&self.replication, REPLICATION, config)?(config)
    }

    pub fn client_delay(
        &self,
        config: &PolicyConfig,
    ) -> Result<Box<dyn ClientDelayGenerator>, ConfigError> {
        resolve(&self.client_delay, CLIENT_DELAY, config)?(config)
    }

    pub fn sharding(
        &self,
        config: &PolicyConfig,
        shard_count: usize,
    ) -> Result<Arc<dyn ShardingStrategy>, ConfigError> {
        resolve(&self.sharding, SHARDING, config)?(config, shard_count)
    }

    /// Build the full anomaly model from its three policy maps.
    pub fn anomaly_model(
        &self,
        staleness: &PolicyConfig,
        replication: &PolicyConfig,
        client_delay: &PolicyConfig,
    ) -> Result<AnomalyModel, ConfigError> {
        Ok(AnomalyModel::new(
            self.staleness(staleness)?,
            self.replication(replication)?,
            self.client_delay(client_delay)?,
        ))
    }
}

fn resolve<C: Copy>(
    table: &HashMap<String, C>,
    policy: &str,
    config: &PolicyConfig,
) -> Result<C, ConfigError> {
    let class = config.class(policy)?;
    table
        .get(class)
        .copied()
        .ok_or_else(|| ConfigError::UnknownClass {
            policy: policy.to_string(),
            class: class.to_string(),
        })
}
