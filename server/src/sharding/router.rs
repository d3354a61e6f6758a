//! Request routing across shards.

use std::sync::Arc;

use crate::config::ConfigError;
use crate::query::QueryHandler;
use crate::sharding::{HashSharding, ShardingStrategy};
use crate::types::{ClientRequest, Operation, Outcome, RequestError, ServerResponse};

/// Routes requests to the shard owning their key.
///
/// - Point operations go to exactly one shard.
/// - A scan starts at the shard owning its start key and continues through
///   the following shards, in ascending order, until the record count is
///   met or the shards run out. Results are concatenated in shard order.
/// - A cleanup goes to every shard.
///
/// # Invariants
///
/// - `strategy.shard_count() == shards.len()`
#[derive(Debug, Clone)]
pub struct Router {
    strategy: Arc<dyn ShardingStrategy>,
    shards: Vec<Arc<QueryHandler>>,
}

impl Router {
    /// # Errors
    ///
    /// Returns [`ConfigError::ShardCountMismatch`] if the strategy and the
    /// shard list disagree.
    pub fn new(
        strategy: Arc<dyn ShardingStrategy>,
        shards: Vec<Arc<QueryHandler>>,
    ) -> Result<Self, ConfigError> {
        if strategy.shard_count() != shards.len() {
            return Err(ConfigError::ShardCountMismatch {
                expected: strategy.shard_count(),
                actual: shards.len(),
            });
        }
        Ok(Self { strategy, shards })
    }

    /// Callers guarantee the shard count matches the strategy.
    pub(crate) fn from_parts(
        strategy: Arc<dyn ShardingStrategy>,
        shards: Vec<Arc<QueryHandler>>,
    ) -> Self {
        debug_assert_eq!(strategy.shard_count(), shards.len());
        Self { strategy, shards }
    }

    /// A router over one unsharded handler.
    #[must_use]
    pub fn single(handler: Arc<QueryHandler>) -> Self {
        Self {
            strategy: Arc::new(HashSharding::single()),
            shards: vec![handler],
        }
    }

    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The shard index owning `key`.
    #[must_use]
    pub fn shard_for(&self, key: &str) -> usize {
        self.strategy.shard_for(key)
    }

    #[must_use]
    pub fn shard(&self, index: usize) -> Option<&Arc<QueryHandler>> {
        self.shards.get(index)
    }

    /// Execute a request on the shard(s) it concerns.
    pub fn handle(&self, request: ClientRequest) -> ServerResponse {
        match request.operation() {
            Operation::Scan { record_count, .. } => {
                let record_count = *record_count;
                self.scan(&request, record_count)
            }
            Operation::Cleanup { .. } => self.broadcast(&request),
            _ => {
                let shard = self.shard_for(request.key());
                tracing::debug!(request = %request.id(), key = request.key(), shard, "routed request");
                match self.shards.get(shard) {
                    Some(handler) => handler.handle(request),
                    None => self.misrouted(&request, shard),
                }
            }
        }
    }

    fn scan(&self, request: &ClientRequest, record_count: usize) -> ServerResponse {
        let first = self.shard_for(request.key());
        if first >= self.shards.len() {
            return self.misrouted(request, first);
        }
        let mut remaining = record_count;
        let mut versions = Vec::new();
        let mut wait_timeout_ms = 0;

        for (index, shard) in self.shards.iter().enumerate().skip(first) {
            // The owning shard is always asked, so validation and client
            // delay apply even to an empty scan.
            if index != first && remaining == 0 {
                break;
            }
            let response = shard.handle(request.rescoped_scan(remaining));
            wait_timeout_ms = wait_timeout_ms.max(response.wait_timeout_ms);
            match response.outcome {
                Outcome::Scanned { versions: found } => {
                    remaining = remaining.saturating_sub(found.len());
                    versions.extend(found);
                }
                _ => return ServerResponse::new(request.id(), response.outcome, wait_timeout_ms),
            }
        }

        tracing::debug!(
            request = %request.id(),
            first_shard = first,
            returned = versions.len(),
            requested = record_count,
            "aggregated scan"
        );
        ServerResponse::new(request.id(), Outcome::Scanned { versions }, wait_timeout_ms)
    }

    fn broadcast(&self, request: &ClientRequest) -> ServerResponse {
        let mut wait_timeout_ms = 0;
        for shard in &self.shards {
            let response = shard.handle(request.clone());
            wait_timeout_ms = wait_timeout_ms.max(response.wait_timeout_ms);
            if response.outcome.is_failure() {
                return ServerResponse::new(request.id(), response.outcome, wait_timeout_ms);
            }
        }
        ServerResponse::new(request.id(), Outcome::Ok, wait_timeout_ms)
    }

    /// The strategy named a shard outside `0..shard_count`.
    fn misrouted(&self, request: &ClientRequest, shard: usize) -> ServerResponse {
        tracing::error!(
            request = %request.id(),
            key = request.key(),
            shard,
            shard_count = self.shards.len(),
            "sharding strategy returned an out-of-range shard"
        );
        ServerResponse::failure(
            request.id(),
            RequestError::Internal {
                description: format!(
                    "key '{}' mapped to shard {shard} of {}",
                    request.key(),
                    self.shards.len()
                ),
            },
        )
    }
}
