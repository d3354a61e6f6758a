//! One client session at the wire boundary.
//!
//! A [`ClientConnection`] decodes JSON frames, hands the resulting requests
//! to its replica's [`Router`], and encodes the responses. It never fails:
//! undecodable frames and export errors come back as failure responses.

use std::sync::Arc;

use crate::measurements::Measurements;
use crate::sharding::Router;
use crate::types::{ClientRequest, Operation, RequestError, ServerResponse};
use crate::wire::{WireRequest, WireResponse};

/// What the socket loop should do after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionReply {
    /// Send this response.
    Respond(WireResponse),
    /// Close the connection without a response.
    EndSession,
}

/// A session attached to one replica view of the cluster.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    router: Router,
    measurements: Arc<Measurements>,
}

impl ClientConnection {
    #[must_use]
    pub const fn new(router: Router, measurements: Arc<Measurements>) -> Self {
        Self {
            router,
            measurements,
        }
    }

    /// Handle one text frame.
    pub fn handle_message(&self, text: &str) -> ConnectionReply {
        let WireRequest { tag, message } = match WireRequest::decode(text) {
            Ok(request) => request,
            Err(failure) => {
                tracing::warn!("failed to decode message: {failure}");
                return ConnectionReply::Respond(WireResponse::rejected(None, failure));
            }
        };
        match message.into_request() {
            Some(request) => ConnectionReply::Respond(WireResponse::new(tag, self.execute(request))),
            None => {
                tracing::debug!("client ended session");
                ConnectionReply::EndSession
            }
        }
    }

    /// Execute an already decoded request.
    pub fn execute(&self, request: ClientRequest) -> ServerResponse {
        let export = match request.operation() {
            Operation::Cleanup { export } => export.clone(),
            _ => return self.router.handle(request),
        };

        if let Some(path) = &export {
            if let Err(e) = self.measurements.export_json(path) {
                tracing::error!(path = %path.display(), "failed to export measurements: {e}");
                return ServerResponse::failure(
                    request.id(),
                    RequestError::Internal {
                        description: format!("failed to export measurements to {}: {e}", path.display()),
                    },
                );
            }
            tracing::info!(path = %path.display(), "exported measurements");
        }
        let response = self.router.handle(request);
        self.measurements.reset();
        response
    }

    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }
}
