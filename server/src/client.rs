//! In-process client.
//!
//! The engine only *advises* a client delay through
//! [`ServerResponse::wait_timeout_ms`]; enforcing it is the caller's job.
//! [`SimulatedClient`] does that by sleeping on its time source after each
//! response, so workloads driven through it observe client latency the way
//! a remote benchmark client would.

use std::sync::Arc;

use crate::sharding::Router;
use crate::storage::TimeSource;
use crate::types::{ClientRequest, ServerResponse};

/// A client bound to one replica view of the cluster.
#[derive(Debug, Clone)]
pub struct SimulatedClient {
    router: Router,
    time: Arc<dyn TimeSource>,
}

impl SimulatedClient {
    #[must_use]
    pub fn new(router: Router, time: Arc<dyn TimeSource>) -> Self {
        Self { router, time }
    }

    /// Send `request` and wait out the advised client delay.
    pub fn execute(&self, request: ClientRequest) -> ServerResponse {
        let response = self.router.handle(request);
        if response.wait_timeout_ms > 0 {
            self.time.sleep_ms(response.wait_timeout_ms);
        }
        response
    }

    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }
}
