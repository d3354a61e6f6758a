//! Query handler implementation.
//!
//! The `QueryHandler` executes one request against a shard's version store
//! on behalf of one node. It is the only component allowed to mutate the
//! store, and it owns the processing order of every request:
//!
//! 1. Validate (nothing is stamped or committed on failure)
//! 2. Stamp `received_at = now()` and `received_by = this node`
//! 3. For writes: ask the anomaly model for the visibility map and the
//!    replication delay, commit at `received_at`, then optionally sleep for
//!    the replication delay
//! 4. Attach the client delay as the response's advisory `wait_timeout_ms`

use std::sync::Arc;

use crate::anomaly::AnomalyModel;
use crate::measurements::{LatencyRecorder, NoopRecorder};
use crate::storage::{StoreError, TimeSource, VersionStore};
use crate::types::{
    ClientRequest, NodeId, Operation, Outcome, RequestError, ServerResponse, Version,
    VisibilityMap,
};

/// Executes requests for one node of one shard.
///
/// # Thread Safety
///
/// `handle` takes `&self` and may be called from any number of threads at
/// once. The store serializes commits per key; the model, time source and
/// recorder are shared read-only.
#[derive(Debug)]
pub struct QueryHandler {
    node: NodeId,
    /// Every node of the shard, this one included.
    nodes: Vec<NodeId>,
    store: Arc<VersionStore>,
    model: Arc<AnomalyModel>,
    time: Arc<dyn TimeSource>,
    recorder: Arc<dyn LatencyRecorder>,
    block_on_replication: bool,
}

impl QueryHandler {
    /// Create a handler for `node`.
    ///
    /// `nodes` lists every node of the shard; `node` is added if missing.
    /// Writes block for their replication delay and no latency is recorded
    /// until configured otherwise.
    #[must_use]
    pub fn new(
        node: NodeId,
        mut nodes: Vec<NodeId>,
        store: Arc<VersionStore>,
        model: Arc<AnomalyModel>,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        if !nodes.contains(&node) {
            nodes.push(node);
        }
        Self {
            node,
            nodes,
            store,
            model,
            time,
            recorder: Arc::new(NoopRecorder),
            block_on_replication: true,
        }
    }

    /// Report per-request latency to `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn LatencyRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Whether writes sleep for the replication delay before returning.
    #[must_use]
    pub const fn with_blocking(mut self, block_on_replication: bool) -> Self {
        self.block_on_replication = block_on_replication;
        self
    }

    #[must_use]
    pub const fn node(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    #[must_use]
    pub const fn store(&self) -> &Arc<VersionStore> {
        &self.store
    }

    /// Execute one request.
    ///
    /// Never panics on bad input: validation failures, duplicate
    /// timestamps and misses all come back as a response.
    pub fn handle(&self, mut request: ClientRequest) -> ServerResponse {
        let operation = request.operation().name();
        if let Err(reason) = request.validate() {
            tracing::debug!(request = %request.id(), %reason, "rejected invalid request");
            return ServerResponse::failure(request.id(), reason.into());
        }

        let received_at = self.time.now_ms();
        request.stamp(received_at, self.node);
        tracing::debug!(
            request = %request.id(),
            operation,
            table = request.table(),
            key = request.key(),
            node = %self.node,
            received_at,
            "handling request"
        );

        let outcome = match request.operation() {
            Operation::Insert { values } => self.write(&request, |visibility| {
                self.store.commit(
                    request.table(),
                    request.key(),
                    values.clone(),
                    self.node,
                    received_at,
                    visibility,
                )
            }),
            Operation::Update { values } => self.write(&request, |visibility| {
                self.store.commit_update(
                    request.table(),
                    request.key(),
                    values.clone(),
                    self.node,
                    received_at,
                    visibility,
                )
            }),
            Operation::Delete => self.write(&request, |visibility| {
                self.store.delete(
                    request.table(),
                    request.key(),
                    self.node,
                    received_at,
                    visibility,
                )
            }),
            Operation::Read { fields } => self
                .store
                .read_visible(
                    request.table(),
                    request.key(),
                    received_at,
                    self.node,
                    fields.as_ref(),
                )
                .map_or(Outcome::NotFound, |version| Outcome::Found { version }),
            Operation::Scan {
                record_count,
                fields,
            } => Outcome::Scanned {
                versions: self
                    .store
                    .scan_visible(
                        request.table(),
                        request.key(),
                        received_at,
                        self.node,
                        *record_count,
                        fields.clone(),
                    )
                    .collect(),
            },
            Operation::Cleanup { .. } => {
                let table = Some(request.table()).filter(|t| !t.is_empty());
                let dropped = self.store.cleanup(table);
                tracing::info!(table = table.unwrap_or("*"), dropped, node = %self.node, "cleaned up");
                Outcome::Ok
            }
        };

        let wait_timeout_ms = self.model.client_delay(&self.nodes, &request);
        self.recorder
            .record(operation, self.time.now_ms().saturating_sub(received_at));
        ServerResponse::new(request.id(), outcome, wait_timeout_ms)
    }

    fn write(
        &self,
        request: &ClientRequest,
        commit: impl FnOnce(VisibilityMap) -> Result<Version, StoreError>,
    ) -> Outcome {
        let delays = self.model.write_delays(&self.nodes, request);
        match commit(delays.visibility) {
            Ok(version) => {
                if self.block_on_replication && delays.replication_delay_ms > 0 {
                    self.time.sleep_ms(delays.replication_delay_ms);
                }
                Outcome::Committed {
                    timestamp: version.timestamp,
                    writer: version.writer,
                }
            }
            Err(e) => Outcome::Failed {
                failure: RequestError::from(e),
            },
        }
    }
}
